//! Perspective/orthographic camera and the orbit controller that drives it.

mod controls;
mod state;

pub use controls::{ControlsConfig, Damping, InputModality, OrbitControls};
pub use state::{Camera, Projection};
