/// Edge addressing mode for texture coordinates outside `[0, 1]`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Wrap {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

impl Wrap {
    pub fn to_wgpu(self) -> wgpu::AddressMode {
        match self {
            Wrap::Clamp => wgpu::AddressMode::ClampToEdge,
            Wrap::Repeat => wgpu::AddressMode::Repeat,
            Wrap::Mirror => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Texel filter. The `*Mipmap*` variants are minification-only.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl Filter {
    fn texel(self) -> wgpu::FilterMode {
        match self {
            Filter::Nearest | Filter::NearestMipmapNearest | Filter::NearestMipmapLinear => {
                wgpu::FilterMode::Nearest
            }
            Filter::Linear | Filter::LinearMipmapNearest | Filter::LinearMipmapLinear => {
                wgpu::FilterMode::Linear
            }
        }
    }

    /// `None` when the filter does not sample between mip levels.
    fn mip(self) -> Option<wgpu::MipmapFilterMode> {
        match self {
            Filter::Nearest | Filter::Linear => None,
            Filter::NearestMipmapNearest | Filter::LinearMipmapNearest => {
                Some(wgpu::MipmapFilterMode::Nearest)
            }
            Filter::NearestMipmapLinear | Filter::LinearMipmapLinear => {
                Some(wgpu::MipmapFilterMode::Linear)
            }
        }
    }
}

/// Sampler and upload options. Unset fields take the defaults:
/// clamp-to-edge wrapping, mipmaps on, nearest filtering.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TextureOptions {
    pub wrap_s: Option<Wrap>,
    pub wrap_t: Option<Wrap>,
    pub mipmap: Option<bool>,
    pub min_filter: Option<Filter>,
    pub mag_filter: Option<Filter>,
}

/// Options with every default applied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ResolvedOptions {
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub mipmap: bool,
    pub min_filter: Filter,
    pub mag_filter: Filter,
}

impl TextureOptions {
    pub fn wrap(mut self, s: Wrap, t: Wrap) -> Self {
        self.wrap_s = Some(s);
        self.wrap_t = Some(t);
        self
    }

    pub fn filters(mut self, min: Filter, mag: Filter) -> Self {
        self.min_filter = Some(min);
        self.mag_filter = Some(mag);
        self
    }

    pub fn mipmap(mut self, enabled: bool) -> Self {
        self.mipmap = Some(enabled);
        self
    }

    /// Disabling mipmaps forces nearest filtering in both directions.
    /// A mipmapped min filter is only kept when mip levels are generated.
    pub(crate) fn resolve(self) -> ResolvedOptions {
        let mipmap = self.mipmap.unwrap_or(true);
        let (min_filter, mag_filter) = if mipmap {
            (
                self.min_filter.unwrap_or_default(),
                self.mag_filter.map(|f| Filter::from_texel(f.texel())).unwrap_or_default(),
            )
        } else {
            (Filter::Nearest, Filter::Nearest)
        };

        ResolvedOptions {
            wrap_s: self.wrap_s.unwrap_or_default(),
            wrap_t: self.wrap_t.unwrap_or_default(),
            mipmap,
            min_filter,
            mag_filter,
        }
    }
}

impl Filter {
    fn from_texel(mode: wgpu::FilterMode) -> Self {
        match mode {
            wgpu::FilterMode::Linear => Filter::Linear,
            _ => Filter::Nearest,
        }
    }
}

impl ResolvedOptions {
    /// Number of mip levels for a `width x height` image.
    pub fn mip_level_count(&self, width: u32, height: u32) -> u32 {
        if self.mipmap {
            32 - width.max(height).max(1).leading_zeros()
        } else {
            1
        }
    }

    pub fn sampler_descriptor<'a>(&self, label: &'a str) -> wgpu::SamplerDescriptor<'a> {
        let mut desc = wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: self.wrap_s.to_wgpu(),
            address_mode_v: self.wrap_t.to_wgpu(),
            address_mode_w: self.wrap_t.to_wgpu(),
            mag_filter: self.mag_filter.texel(),
            min_filter: self.min_filter.texel(),
            ..Default::default()
        };
        match self.min_filter.mip() {
            Some(mode) => desc.mipmap_filter = mode,
            None => desc.lod_max_clamp = 0.0,
        }
        desc
    }
}

/// Builds the full mip chain for an RGBA8 image, level 0 first.
pub(crate) fn mip_chain(base: &image::RgbaImage, levels: u32) -> Vec<image::RgbaImage> {
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base.clone());
    for level in 1..levels {
        let w = (base.width() >> level).max(1);
        let h = (base.height() >> level).max(1);
        let prev = &chain[chain.len() - 1];
        chain.push(image::imageops::resize(
            prev,
            w,
            h,
            image::imageops::FilterType::Triangle,
        ));
    }
    chain
}
