//! Named uniform slots over a reflected program interface.
//!
//! Numeric uniforms live in a byte block mirroring the `@group(0)` uniform buffer;
//! the program uploads it before drawing whenever it changed. Sampler uniforms own a
//! texture unit holding a [`TextureHandle`]; the program turns units into the
//! `@group(1)` bind group at draw time.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};

use crate::texture::{TextureHandle, TextureKind};

use super::reflect::{Reflection, TextureBinding, UniformBlock, UniformType};

/// A value accepted by [`UniformTable::set`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat4(Mat4),
    Texture(TextureHandle),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::Texture(_) => UniformType::Sampler,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(v: TextureHandle) -> Self {
        UniformValue::Texture(v)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Location {
    Block { offset: usize },
    Texture { binding: u32, kind: TextureKind },
}

#[derive(Debug, Copy, Clone)]
struct Slot {
    ty: UniformType,
    location: Option<Location>,
    unit: Option<usize>,
}

/// One `@group(1)` texture binding with the handle currently bound to it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BoundTexture {
    pub binding: u32,
    pub sampler_binding: Option<u32>,
    pub kind: TextureKind,
    pub handle: Option<TextureHandle>,
}

pub struct UniformTable {
    block_layout: Option<UniformBlock>,
    textures: Vec<TextureBinding>,

    slots: HashMap<String, Slot>,
    block: Vec<u8>,
    block_dirty: bool,
    units: Vec<Option<TextureHandle>>,
}

impl UniformTable {
    pub(crate) fn new(reflection: &Reflection) -> Self {
        let size = reflection.block.as_ref().map_or(0, |b| b.size as usize);
        Self {
            block_layout: reflection.block.clone(),
            textures: reflection.textures.clone(),
            slots: HashMap::new(),
            block: vec![0; size],
            block_dirty: size > 0,
            units: Vec::new(),
        }
    }

    /// Registers a uniform, resolving its location against the program.
    ///
    /// A name the shaders do not declare is kept with no location; later `set`
    /// calls on it do nothing. A sampler needs a texture value and takes the next
    /// free texture unit, or keeps its unit when the name is already registered.
    pub fn add(&mut self, name: &str, ty: UniformType, value: Option<UniformValue>) {
        if ty == UniformType::Sampler {
            let Some(UniformValue::Texture(handle)) = value else {
                log::warn!("sampler uniform `{name}` added without a texture, ignored");
                return;
            };

            let unit = match self.slots.get(name).and_then(|s| s.unit) {
                Some(unit) => unit,
                None => {
                    self.units.push(None);
                    self.units.len() - 1
                }
            };

            let location = self.resolve(name, ty);
            self.slots.insert(
                name.to_string(),
                Slot {
                    ty,
                    location,
                    unit: Some(unit),
                },
            );
            self.set(name, UniformValue::Texture(handle));
            return;
        }

        let location = self.resolve(name, ty);
        self.slots.insert(
            name.to_string(),
            Slot {
                ty,
                location,
                unit: None,
            },
        );
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    /// Bulk [`add`](Self::add).
    pub fn add_all<'a, I>(&mut self, uniforms: I)
    where
        I: IntoIterator<Item = (&'a str, UniformType, Option<UniformValue>)>,
    {
        for (name, ty, value) in uniforms {
            self.add(name, ty, value);
        }
    }

    /// Writes a value. Unregistered and unresolved names are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        let Some(&Slot { ty, location, unit }) = self.slots.get(name) else {
            return;
        };
        let Some(location) = location else {
            return;
        };
        if value.ty() != ty {
            log::warn!("uniform `{name}` is {ty:?}, got a {:?} value; ignored", value.ty());
            return;
        }

        match (location, value) {
            (Location::Texture { kind, .. }, UniformValue::Texture(handle)) => {
                if handle.kind() != kind {
                    log::warn!(
                        "uniform `{name}` samples a {kind:?} texture, got a {:?} one; ignored",
                        handle.kind()
                    );
                    return;
                }
                if let Some(unit) = unit {
                    self.units[unit] = Some(handle);
                }
            }
            (Location::Block { offset }, value) => {
                self.write_block(offset, value);
            }
            (Location::Texture { .. }, _) => {}
        }
    }

    /// Reads a numeric value back from the uniform block.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let slot = self.slots.get(name)?;
        let Some(Location::Block { offset }) = slot.location else {
            return None;
        };
        let bytes = self.block.get(offset..offset + slot.ty.byte_size())?;
        let floats = |n: usize| -> Vec<f32> {
            (0..n)
                .map(|i| bytemuck::pod_read_unaligned::<f32>(&bytes[i * 4..i * 4 + 4]))
                .collect()
        };

        let value = match slot.ty {
            UniformType::Float => UniformValue::Float(bytemuck::pod_read_unaligned(bytes)),
            UniformType::Int => UniformValue::Int(bytemuck::pod_read_unaligned(bytes)),
            UniformType::Vec2 => UniformValue::Vec2(Vec2::from_slice(&floats(2))),
            UniformType::Vec3 => UniformValue::Vec3(Vec3::from_slice(&floats(3))),
            UniformType::Mat4 => UniformValue::Mat4(Mat4::from_cols_slice(&floats(16))),
            UniformType::Sampler => return None,
        };
        Some(value)
    }

    /// `set(name, get(name) + delta)` for float and int uniforms.
    pub fn add_value(&mut self, name: &str, delta: f32) {
        match self.get(name) {
            Some(UniformValue::Float(v)) => self.set(name, v + delta),
            Some(UniformValue::Int(v)) => self.set(name, (f64::from(v) + f64::from(delta)) as i32),
            _ => {}
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Whether `name` resolved to a shader location.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.location.is_some())
    }

    /// Texture unit assigned to a sampler uniform.
    pub fn unit(&self, name: &str) -> Option<usize> {
        self.slots.get(name)?.unit
    }

    /// The uniform block as uploaded to the GPU.
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    /// Returns the block once after each change.
    pub(crate) fn take_dirty_block(&mut self) -> Option<&[u8]> {
        if !self.block_dirty || self.block.is_empty() {
            return None;
        }
        self.block_dirty = false;
        Some(&self.block)
    }

    /// Every texture binding of the program, in binding order.
    pub(crate) fn bound_textures(&self) -> Vec<BoundTexture> {
        self.textures
            .iter()
            .map(|t| {
                let handle = self
                    .slots
                    .get(&t.name)
                    .filter(|s| s.location.is_some())
                    .and_then(|s| s.unit)
                    .and_then(|u| self.units[u]);
                BoundTexture {
                    binding: t.binding,
                    sampler_binding: t.sampler_binding,
                    kind: t.kind,
                    handle,
                }
            })
            .collect()
    }

    fn resolve(&self, name: &str, ty: UniformType) -> Option<Location> {
        if ty == UniformType::Sampler {
            return match self.textures.iter().find(|t| t.name == name) {
                Some(t) => Some(Location::Texture {
                    binding: t.binding,
                    kind: t.kind,
                }),
                None => {
                    log::debug!("sampler uniform `{name}` not declared by the program");
                    None
                }
            };
        }

        let member = self.block_layout.as_ref().and_then(|b| b.member(name));
        match member {
            Some(m) if m.ty == ty => Some(Location::Block {
                offset: m.offset as usize,
            }),
            Some(m) => {
                log::warn!("uniform `{name}` registered as {ty:?} but declared as {:?}", m.ty);
                None
            }
            None => {
                log::debug!("uniform `{name}` not declared by the program");
                None
            }
        }
    }

    fn write_block(&mut self, offset: usize, value: UniformValue) {
        let mat;
        let bytes: &[u8] = match &value {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => {
                mat = v.to_cols_array();
                bytemuck::cast_slice(&mat)
            }
            UniformValue::Texture(_) => return,
        };

        let Some(dst) = self.block.get_mut(offset..offset + bytes.len()) else {
            return;
        };
        if dst != bytes {
            dst.copy_from_slice(bytes);
            self.block_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::reflect::{self, tests::{FS, VS}};

    fn table() -> UniformTable {
        UniformTable::new(&reflect::reflect(VS, FS).unwrap())
    }

    fn tex(index: u32, kind: TextureKind) -> UniformValue {
        UniformValue::Texture(TextureHandle::detached(index, kind))
    }

    // ── numeric ──────────────────────────────────────────────────────────

    #[test]
    fn set_then_get_round_trips_through_block() {
        let mut t = table();
        t.add("uTime", UniformType::Float, Some(0.5f32.into()));
        t.add("cameraPosition", UniformType::Vec3, None);
        t.set("cameraPosition", Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(t.get("uTime"), Some(UniformValue::Float(0.5)));
        assert_eq!(
            t.get("cameraPosition"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
        );

        let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        t.add("viewMatrix", UniformType::Mat4, Some(m.into()));
        assert_eq!(t.get("viewMatrix"), Some(UniformValue::Mat4(m)));
        assert_eq!(&t.block()[64 + 48..64 + 52], bytemuck::bytes_of(&4.0f32));
    }

    #[test]
    fn add_value_accumulates_numeric_only() {
        let mut t = table();
        t.add("uTime", UniformType::Float, Some(1.0f32.into()));
        t.add("uMode", UniformType::Int, Some(2i32.into()));
        t.add_value("uTime", 0.25);
        t.add_value("uMode", 1.0);
        t.add_value("cameraPosition", 1.0);

        assert_eq!(t.get("uTime"), Some(UniformValue::Float(1.25)));
        assert_eq!(t.get("uMode"), Some(UniformValue::Int(3)));
    }

    #[test]
    fn add_value_keeps_large_ints_exact() {
        let mut t = table();
        let big = (1 << 25) + 1;
        t.add("uMode", UniformType::Int, Some(big.into()));
        t.add_value("uMode", 2.0);
        assert_eq!(t.get("uMode"), Some(UniformValue::Int(big + 2)));
    }

    #[test]
    fn unknown_names_are_silent_no_ops() {
        let mut t = table();
        let before = t.block().to_vec();

        t.add("uMissing", UniformType::Float, Some(3.0f32.into()));
        t.set("uMissing", 4.0f32);
        t.set("neverRegistered", 1.0f32);

        assert!(t.contains("uMissing"));
        assert!(!t.is_resolved("uMissing"));
        assert_eq!(t.block(), &before[..]);
        assert_eq!(t.get("uMissing"), None);
    }

    #[test]
    fn declared_type_mismatch_leaves_slot_unresolved() {
        let mut t = table();
        t.add("uTime", UniformType::Vec2, Some(Vec2::ONE.into()));
        assert!(!t.is_resolved("uTime"));
        assert!(t.block().iter().all(|b| *b == 0));
    }

    #[test]
    fn wrong_value_type_is_ignored() {
        let mut t = table();
        t.add("uTime", UniformType::Float, Some(2.0f32.into()));
        t.set("uTime", 7i32);
        assert_eq!(t.get("uTime"), Some(UniformValue::Float(2.0)));
    }

    #[test]
    fn dirty_block_is_reported_once() {
        let mut t = table();
        assert!(t.take_dirty_block().is_some());
        assert!(t.take_dirty_block().is_none());

        t.add("uTime", UniformType::Float, Some(1.0f32.into()));
        assert!(t.take_dirty_block().is_some());

        t.set("uTime", 1.0f32);
        assert!(t.take_dirty_block().is_none());
    }

    // ── samplers ─────────────────────────────────────────────────────────

    #[test]
    fn samplers_get_distinct_increasing_units() {
        let mut t = table();
        t.add("uMatcap", UniformType::Sampler, Some(tex(0, TextureKind::D2)));
        t.add("uEnvMap", UniformType::Sampler, Some(tex(1, TextureKind::Cube)));

        let a = t.unit("uMatcap").unwrap();
        let b = t.unit("uEnvMap").unwrap();
        assert!(b > a);
    }

    #[test]
    fn rebinding_reuses_the_unit() {
        let mut t = table();
        t.add("uMatcap", UniformType::Sampler, Some(tex(0, TextureKind::D2)));
        t.add("uEnvMap", UniformType::Sampler, Some(tex(1, TextureKind::Cube)));
        let unit = t.unit("uMatcap");

        t.add("uMatcap", UniformType::Sampler, Some(tex(5, TextureKind::D2)));
        assert_eq!(t.unit("uMatcap"), unit);

        let bound = t.bound_textures();
        assert_eq!(bound[0].handle, Some(TextureHandle::detached(5, TextureKind::D2)));
        assert_eq!(bound[1].handle, Some(TextureHandle::detached(1, TextureKind::Cube)));
    }

    #[test]
    fn units_are_assigned_even_without_a_location() {
        let mut t = table();
        t.add("uNormalMap", UniformType::Sampler, Some(tex(0, TextureKind::D2)));
        t.add("uMatcap", UniformType::Sampler, Some(tex(1, TextureKind::D2)));

        assert_eq!(t.unit("uNormalMap"), Some(0));
        assert_eq!(t.unit("uMatcap"), Some(1));
    }

    #[test]
    fn texture_kind_must_match_the_shader() {
        let mut t = table();
        t.add("uEnvMap", UniformType::Sampler, Some(tex(0, TextureKind::D2)));
        let env = t.bound_textures().into_iter().find(|b| b.binding == 2).unwrap();
        assert_eq!(env.handle, None);

        t.set("uEnvMap", tex(1, TextureKind::Cube));
        let env = t.bound_textures().into_iter().find(|b| b.binding == 2).unwrap();
        assert_eq!(env.handle, Some(TextureHandle::detached(1, TextureKind::Cube)));
    }

    #[test]
    fn sampler_without_texture_is_not_registered() {
        let mut t = table();
        t.add("uMatcap", UniformType::Sampler, None);
        assert!(!t.contains("uMatcap"));
    }
}
