//! GPU rendering subsystem.
//!
//! A [`Program`] owns a linked WGSL vertex/fragment pair, its vertex buffers and a
//! [`UniformTable`]. Meshes wrap a program and choose the draw call.
//!
//! Binding convention:
//! - `@group(0) @binding(0)`: uniform struct with every numeric uniform
//! - `@group(1)`: textures, each with an optional `<name>Sampler`

mod ctx;
mod fallback;
mod mesh;
mod plane;
mod program;
mod reflect;
mod uniform;

pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::Mesh;
pub use plane::{Plane, PlaneParams};
pub use program::{AttributeData, DrawCall, Program, ProgramDesc};
pub use reflect::UniformType;
pub use uniform::{UniformTable, UniformValue};
