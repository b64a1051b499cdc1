use std::collections::{BTreeMap, HashSet};

use super::types::{InputEvent, MouseButton, MouseButtonState, TouchPhase};

/// Current input state for a single window.
///
/// Event order matters: the runtime applies every translated event here before
/// queuing it for the frame.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,

    /// Pointer position in logical pixels; `None` once the pointer left the window.
    pub pointer_pos: Option<(f32, f32)>,

    pub buttons_down: HashSet<MouseButton>,

    /// Active touch contacts by id, in logical pixels.
    pub touches: BTreeMap<u64, (f32, f32)>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases arrive nowhere once focus is gone.
                    self.buttons_down.clear();
                    self.touches.clear();
                }
            }

            InputEvent::PointerMoved(p) => self.pointer_pos = Some((p.x, p.y)),

            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::PointerButton(b) => {
                self.pointer_pos = Some((b.x, b.y));
                match b.state {
                    MouseButtonState::Pressed => {
                        self.buttons_down.insert(b.button);
                    }
                    MouseButtonState::Released => {
                        self.buttons_down.remove(&b.button);
                    }
                }
            }

            InputEvent::Touch(t) => match t.phase {
                TouchPhase::Started | TouchPhase::Moved => {
                    self.touches.insert(t.id, (t.x, t.y));
                }
                TouchPhase::Ended | TouchPhase::Cancelled => {
                    self.touches.remove(&t.id);
                }
            },

            InputEvent::MouseWheel(_) => {}
        }
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{PointerButtonEvent, TouchEvent};

    fn press(button: MouseButton, state: MouseButtonState) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button,
            state,
            x: 10.0,
            y: 20.0,
        })
    }

    #[test]
    fn buttons_follow_press_and_release() {
        let mut state = InputState::default();

        state.apply_event(&press(MouseButton::Left, MouseButtonState::Pressed));
        assert!(state.button_down(MouseButton::Left));
        assert_eq!(state.pointer_pos, Some((10.0, 20.0)));

        state.apply_event(&press(MouseButton::Left, MouseButtonState::Released));
        assert!(!state.button_down(MouseButton::Left));

        state.apply_event(&InputEvent::PointerLeft);
        assert_eq!(state.pointer_pos, None);
    }

    #[test]
    fn focus_loss_releases_buttons_and_touches() {
        let mut state = InputState::default();

        state.apply_event(&press(MouseButton::Right, MouseButtonState::Pressed));
        state.apply_event(&InputEvent::Touch(TouchEvent {
            id: 3,
            phase: TouchPhase::Started,
            x: 1.0,
            y: 2.0,
        }));
        assert_eq!(state.touches.len(), 1);

        state.apply_event(&InputEvent::Focused(false));
        assert!(state.buttons_down.is_empty());
        assert!(state.touches.is_empty());
    }
}
