//! Texture resources and the image-decoding collaborator.
//!
//! Textures are uploaded once from decoded RGBA8 images and then owned by a
//! [`TextureRegistry`]. Everything else refers to them by [`TextureHandle`].

mod cube;
mod decode;
mod options;
mod registry;
mod texture2d;

pub use cube::{create_source, CubeFace, CubeTexture, CubeTextureSource};
pub use decode::{file_stem, load_image, load_images, DecodedImage};
pub use options::{Filter, TextureOptions, Wrap};
pub use registry::{TextureHandle, TextureKind, TextureRegistry, TextureResource};
pub use texture2d::{Texture2D, TextureSize};
