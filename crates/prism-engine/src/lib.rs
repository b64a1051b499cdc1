//! Prism engine crate.
//!
//! A small wgpu renderer: one GPU context per window, shader programs with
//! reflected uniform tables, 2D and cube textures, and an orbit camera.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod math;
pub mod error;
pub mod events;
pub mod camera;
pub mod render;
pub mod texture;
