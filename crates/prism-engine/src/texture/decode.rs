use std::path::{Path, PathBuf};

use crate::error::ImageLoadError;

/// RGBA8 pixels plus the identifier of the file they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps already-decoded RGBA8 data. `pixels` must hold `width * height * 4` bytes.
    pub fn from_rgba(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageLoadError> {
        let name = name.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ImageLoadError::PixelCount {
                name,
                len: pixels.len(),
                expected,
                width,
                height,
            });
        }
        Ok(Self { name, width, height, pixels })
    }

    /// File identifier: the file name up to its first `.` (`images/px.jpg` -> `px`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// Derives the identifier used for texture names and cube-face matching.
pub fn file_stem(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Decodes one image file.
///
/// The future resolves once decoding finished; a decode failure rejects it.
pub async fn load_image(path: impl AsRef<Path>) -> Result<DecodedImage, ImageLoadError> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|source| ImageLoadError::Decode {
        path: PathBuf::from(path),
        source,
    })?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("decoded {} ({width}x{height})", path.display());

    DecodedImage::from_rgba(file_stem(path), width, height, rgba.into_raw())
}

/// Decodes every path in order. The first failure aborts the whole batch.
pub async fn load_images<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
) -> Result<Vec<DecodedImage>, ImageLoadError> {
    let mut images = Vec::new();
    for path in paths {
        images.push(load_image(path).await?);
    }
    Ok(images)
}
