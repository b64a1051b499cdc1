use anyhow::Result;
use winit::event::WindowEvent;

use crate::device::{Gpu, SurfaceSize};

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
///
/// Call order: `init` once after the GPU context exists, then any number of
/// `on_resize` / `on_window_event` / `on_frame`, then `dispose` once before the
/// GPU context is dropped.
pub trait App {
    /// Creates GPU resources. An error aborts the runtime.
    fn init(&mut self, gpu: &mut Gpu<'_>, window: &WindowCtx<'_>) -> Result<()>;

    /// Called after the surface was reconfigured. `size` is in physical pixels.
    fn on_resize(&mut self, size: SurfaceSize, window: &WindowCtx<'_>) {
        let _ = (size, window);
    }

    /// Called for every raw window event, before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Releases GPU resources.
    fn dispose(&mut self) {}
}
