use crate::texture::TextureKind;

/// 1x1 opaque white textures bound in place of missing or disposed ones.
pub(super) struct FallbackTextures {
    d2: (wgpu::Texture, wgpu::TextureView),
    cube: (wgpu::Texture, wgpu::TextureView),
    sampler: wgpu::Sampler,
}

impl FallbackTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let d2 = white(device, queue, 1, wgpu::TextureViewDimension::D2);
        let cube = white(device, queue, 6, wgpu::TextureViewDimension::Cube);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism fallback sampler"),
            ..Default::default()
        });
        Self { d2, cube, sampler }
    }

    pub fn view(&self, kind: TextureKind) -> &wgpu::TextureView {
        match kind {
            TextureKind::D2 => &self.d2.1,
            TextureKind::Cube => &self.cube.1,
        }
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn destroy(&self) {
        self.d2.0.destroy();
        self.cube.0.destroy();
    }
}

fn white(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layers: u32,
    dimension: wgpu::TextureViewDimension,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("prism fallback texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let texels = vec![255u8; 4 * layers as usize];
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(dimension),
        ..Default::default()
    });
    (texture, view)
}
