use winit::dpi::PhysicalPosition;
use winit::event::{self as we, ElementState, MouseScrollDelta, WindowEvent};
use winit::window::Window;

use crate::input::{
    InputEvent, InputState, MouseButton, MouseButtonState, MouseWheelDelta, PointerButtonEvent,
    PointerMoveEvent, TouchEvent, TouchPhase,
};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Positions are converted to logical pixels. Returns `None` for events the
/// input subsystem does not represent.
pub fn translate_window_event(
    window: &Window,
    state: &InputState,
    event: &WindowEvent,
) -> Option<InputEvent> {
    let logical = |p: PhysicalPosition<f64>| {
        let l = p.to_logical::<f64>(window.scale_factor());
        (l.x as f32, l.y as f32)
    };

    let ev = match event {
        WindowEvent::Focused(f) => InputEvent::Focused(*f),

        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = logical(*position);
            InputEvent::PointerMoved(PointerMoveEvent { x, y })
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            // Button events carry no position; use the tracked one.
            let (x, y) = state.pointer_pos.unwrap_or((0.0, 0.0));
            InputEvent::PointerButton(PointerButtonEvent {
                button: (*button).into(),
                state: (*st).into(),
                x,
                y,
            })
        }

        WindowEvent::MouseWheel { delta, .. } => InputEvent::MouseWheel(match delta {
            MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
            MouseScrollDelta::PixelDelta(p) => {
                let (x, y) = logical(*p);
                MouseWheelDelta::Pixel { x, y }
            }
        }),

        WindowEvent::Touch(t) => {
            let (x, y) = logical(t.location);
            InputEvent::Touch(TouchEvent {
                id: t.id,
                phase: t.phase.into(),
                x,
                y,
            })
        }

        _ => return None,
    };
    Some(ev)
}

impl From<we::MouseButton> for MouseButton {
    fn from(b: we::MouseButton) -> Self {
        match b {
            we::MouseButton::Left => MouseButton::Left,
            we::MouseButton::Right => MouseButton::Right,
            we::MouseButton::Middle => MouseButton::Middle,
            we::MouseButton::Back => MouseButton::Back,
            we::MouseButton::Forward => MouseButton::Forward,
            we::MouseButton::Other(v) => MouseButton::Other(v),
        }
    }
}

impl From<ElementState> for MouseButtonState {
    fn from(s: ElementState) -> Self {
        match s {
            ElementState::Pressed => MouseButtonState::Pressed,
            ElementState::Released => MouseButtonState::Released,
        }
    }
}

impl From<we::TouchPhase> for TouchPhase {
    fn from(p: we::TouchPhase) -> Self {
        match p {
            we::TouchPhase::Started => TouchPhase::Started,
            we::TouchPhase::Moved => TouchPhase::Moved,
            we::TouchPhase::Ended => TouchPhase::Ended,
            we::TouchPhase::Cancelled => TouchPhase::Cancelled,
        }
    }
}
