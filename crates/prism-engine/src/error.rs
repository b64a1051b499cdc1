//! Typed failures raised while constructing GPU resources.
//!
//! Every error here is fatal to the object being built; nothing is retried.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Shader pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point name the engine expects in each stage.
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("failed to compile {stage} shader:\n{message}\n--- {stage} source ---\n{source_text}")]
    Compile {
        stage: ShaderStage,
        message: String,
        source_text: String,
    },

    #[error("failed to link program: {0}")]
    Link(String),

    #[error("attribute `{name}` has {len} floats, not a multiple of its stride {stride}")]
    AttributeStride { name: String, len: usize, stride: u32 },

    #[error("attribute `{name}` has unsupported component count {stride} (expected 1..=4)")]
    UnsupportedStride { name: String, stride: u32 },

    #[error("attribute `{name}` holds {count} vertices but `{first}` holds {expected}")]
    VertexCountMismatch {
        name: String,
        count: u32,
        first: String,
        expected: u32,
    },

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: u32 },

    #[error("update of attribute `{name}` with {len} floats exceeds its buffer of {capacity}")]
    AttributeOverflow {
        name: String,
        len: usize,
        capacity: usize,
    },
}

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("image `{name}` has no pixels")]
    EmptyImage { name: String },

    #[error("cube texture source has no faces")]
    EmptyCubeSource,

    #[error("cube face `{face}` is {width}x{height}; faces must be square")]
    NonSquareFace {
        face: &'static str,
        width: u32,
        height: u32,
    },

    #[error("cube face `{face}` is {size} px wide but the first face is {expected} px")]
    FaceSizeMismatch {
        face: &'static str,
        size: u32,
        expected: u32,
    },
}

#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("failed to decode image {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image `{name}` has {len} bytes, expected {expected} for {width}x{height} RGBA8")]
    PixelCount {
        name: String,
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}
