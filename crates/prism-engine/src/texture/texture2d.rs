use crate::error::TextureError;
use crate::render::RenderCtx;

use super::decode::DecodedImage;
use super::options::{self, TextureOptions};

/// Pixel dimensions of an uploaded image.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
}

/// A 2D texture uploaded once from a decoded image.
pub struct Texture2D {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    name: String,
    size: TextureSize,
}

impl Texture2D {
    pub fn new(
        ctx: &RenderCtx<'_>,
        image: &DecodedImage,
        opts: TextureOptions,
    ) -> Result<Self, TextureError> {
        let (width, height) = (image.width(), image.height());
        let base = image
            .to_rgba_image()
            .filter(|_| width > 0 && height > 0)
            .ok_or_else(|| TextureError::EmptyImage {
                name: image.name().to_string(),
            })?;

        let resolved = opts.resolve();
        let mip_level_count = resolved.mip_level_count(width, height);

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(image.name()),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in options::mip_chain(&base, mip_level_count).iter().enumerate() {
            write_layer(ctx.queue, &texture, level as u32, 0, mip);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = ctx
            .device
            .create_sampler(&resolved.sampler_descriptor(image.name()));

        log::debug!(
            "texture2d `{}` {width}x{height}, {mip_level_count} mip level(s)",
            image.name()
        );

        Ok(Self {
            texture,
            view,
            sampler,
            name: image.name().to_string(),
            size: TextureSize {
                width,
                height,
                aspect: width as f32 / height as f32,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> TextureSize {
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

/// Uploads one RGBA8 image into `layer` of `texture` at mip `level`.
pub(crate) fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    level: u32,
    layer: u32,
    pixels: &image::RgbaImage,
) {
    let (width, height) = pixels.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
