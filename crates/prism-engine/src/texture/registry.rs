use super::cube::CubeTexture;
use super::texture2d::Texture2D;

/// Texture dimension, as seen by shaders.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureKind {
    D2,
    Cube,
}

/// A texture owned by the registry.
pub enum TextureResource {
    Texture2D(Texture2D),
    Cube(CubeTexture),
}

impl TextureResource {
    pub fn kind(&self) -> TextureKind {
        match self {
            TextureResource::Texture2D(_) => TextureKind::D2,
            TextureResource::Cube(_) => TextureKind::Cube,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        match self {
            TextureResource::Texture2D(t) => t.view(),
            TextureResource::Cube(t) => t.view(),
        }
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        match self {
            TextureResource::Texture2D(t) => t.sampler(),
            TextureResource::Cube(t) => t.sampler(),
        }
    }

    pub fn dispose(self) {
        match self {
            TextureResource::Texture2D(t) => t.dispose(),
            TextureResource::Cube(t) => t.dispose(),
        }
    }
}

impl From<Texture2D> for TextureResource {
    fn from(t: Texture2D) -> Self {
        TextureResource::Texture2D(t)
    }
}

impl From<CubeTexture> for TextureResource {
    fn from(t: CubeTexture) -> Self {
        TextureResource::Cube(t)
    }
}

/// Non-owning reference to a registry entry.
///
/// Becomes stale once the entry is disposed; lookups then return `None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle {
    index: u32,
    generation: u32,
    kind: TextureKind,
}

impl TextureHandle {
    pub fn kind(&self) -> TextureKind {
        self.kind
    }
}

struct Entry {
    generation: u32,
    resource: Option<TextureResource>,
}

/// Generational arena owning every texture the scene uses.
#[derive(Default)]
pub struct TextureRegistry {
    entries: Vec<Entry>,
    free: Vec<u32>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: impl Into<TextureResource>) -> TextureHandle {
        let resource = resource.into();
        let kind = resource.kind();

        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.resource = Some(resource);
            return TextureHandle {
                index,
                generation: entry.generation,
                kind,
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            resource: Some(resource),
        });
        TextureHandle {
            index,
            generation: 0,
            kind,
        }
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureResource> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.resource.as_ref())
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Releases the texture behind `handle`. Stale handles are ignored.
    pub fn dispose(&mut self, handle: TextureHandle) {
        let Some(entry) = self.entries.get_mut(handle.index as usize) else {
            return;
        };
        if entry.generation != handle.generation {
            return;
        }
        if let Some(resource) = entry.resource.take() {
            resource.dispose();
            entry.generation = entry.generation.wrapping_add(1);
            self.free.push(handle.index);
        }
    }

    /// Releases every live texture. Outstanding handles all go stale.
    pub fn dispose_all(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(resource) = entry.resource.take() {
                resource.dispose();
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.resource.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl TextureHandle {
    pub(crate) fn detached(index: u32, kind: TextureKind) -> Self {
        Self {
            index,
            generation: 0,
            kind,
        }
    }
}
