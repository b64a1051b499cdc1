//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) and its depth attachment
//! - holding the clear state and acquiring frames for rendering

mod clear;
mod frame;
mod gpu;
mod init;
mod surface;

pub use clear::ClearColor;
pub use frame::{GpuFrame, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::{DepthTarget, SurfaceSize};
