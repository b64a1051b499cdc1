use std::collections::BTreeMap;
use std::fmt;

use crate::error::TextureError;
use crate::render::RenderCtx;

use super::decode::DecodedImage;
use super::options::{self, TextureOptions};
use super::texture2d::write_layer;

/// Canonical cube-map face identifiers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CubeFace {
    PX,
    PY,
    PZ,
    NX,
    NY,
    NZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PX,
        CubeFace::PY,
        CubeFace::PZ,
        CubeFace::NX,
        CubeFace::NY,
        CubeFace::NZ,
    ];

    /// Case-exact match against a file stem (`"px"`, `"nz"`, ...).
    pub fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "px" => Some(CubeFace::PX),
            "py" => Some(CubeFace::PY),
            "pz" => Some(CubeFace::PZ),
            "nx" => Some(CubeFace::NX),
            "ny" => Some(CubeFace::NY),
            "nz" => Some(CubeFace::NZ),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            CubeFace::PX => "px",
            CubeFace::PY => "py",
            CubeFace::PZ => "pz",
            CubeFace::NX => "nx",
            CubeFace::NY => "ny",
            CubeFace::NZ => "nz",
        }
    }

    /// Array layer of this face in a wgpu cube texture (+X, -X, +Y, -Y, +Z, -Z).
    pub const fn layer(self) -> u32 {
        match self {
            CubeFace::PX => 0,
            CubeFace::NX => 1,
            CubeFace::PY => 2,
            CubeFace::NY => 3,
            CubeFace::PZ => 4,
            CubeFace::NZ => 5,
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Face assignment for a cube texture. May hold fewer than six faces.
pub type CubeTextureSource = BTreeMap<CubeFace, DecodedImage>;

/// Classifies images into cube faces by their name.
///
/// Images whose name is not a face identifier are dropped. A later image with the
/// same face replaces an earlier one.
pub fn create_source<I>(images: I) -> CubeTextureSource
where
    I: IntoIterator<Item = DecodedImage>,
{
    let mut source = CubeTextureSource::new();
    for image in images {
        match CubeFace::from_stem(image.name()) {
            Some(face) => {
                source.insert(face, image);
            }
            None => log::debug!("`{}` is not a cube face, skipped", image.name()),
        }
    }
    source
}

/// A cube-map texture. Unassigned faces are allocated but never written.
pub struct CubeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    faces: Vec<CubeFace>,
    size: u32,
}

impl CubeTexture {
    pub fn new(
        ctx: &RenderCtx<'_>,
        source: &CubeTextureSource,
        opts: TextureOptions,
    ) -> Result<Self, TextureError> {
        let size = face_size(source)?;

        let resolved = opts.resolve();
        let mip_level_count = resolved.mip_level_count(size, size);

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cube texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (face, image) in source {
            let Some(base) = image.to_rgba_image() else {
                continue;
            };
            for (level, mip) in options::mip_chain(&base, mip_level_count).iter().enumerate() {
                write_layer(ctx.queue, &texture, level as u32, face.layer(), mip);
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cube texture view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = ctx
            .device
            .create_sampler(&resolved.sampler_descriptor("cube texture sampler"));

        let faces: Vec<CubeFace> = source.keys().copied().collect();
        if faces.len() < 6 {
            log::warn!("cube texture has {} of 6 faces: {faces:?}", faces.len());
        }

        Ok(Self {
            texture,
            view,
            sampler,
            faces,
            size,
        })
    }

    /// Faces that were uploaded.
    pub fn faces(&self) -> &[CubeFace] {
        &self.faces
    }

    /// Edge length of every face, in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn dispose(self) {
        self.texture.destroy();
    }
}

/// Common edge length of the assigned faces.
fn face_size(source: &CubeTextureSource) -> Result<u32, TextureError> {
    let mut expected = None;
    for (face, image) in source {
        let (w, h) = (image.width(), image.height());
        if w != h {
            return Err(TextureError::NonSquareFace {
                face: face.as_str(),
                width: w,
                height: h,
            });
        }
        if w == 0 {
            return Err(TextureError::EmptyImage {
                name: image.name().to_string(),
            });
        }
        match expected {
            None => expected = Some(w),
            Some(e) if e != w => {
                return Err(TextureError::FaceSizeMismatch {
                    face: face.as_str(),
                    size: w,
                    expected: e,
                });
            }
            Some(_) => {}
        }
    }
    expected.ok_or(TextureError::EmptyCubeSource)
}
