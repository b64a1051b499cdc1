//! Pointer, wheel and touch dispatch for camera controls.
//!
//! The dispatcher turns engine [`InputEvent`]s into [`ControlEvent`]s while it is
//! attached and enabled. Touch contacts are tracked by id so every touch event
//! carries the full list of active contacts, oldest first.

use glam::Vec2;

use crate::input::{InputEvent, MouseButton, MouseButtonState, MouseWheelDelta, TouchPhase};

/// Lines are converted to pixels with this factor before the sign flip.
const LINE_HEIGHT_PX: f32 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    PointerDown { button: MouseButton, position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp,
    /// DOM sign convention: positive scrolls down (zoom out).
    Wheel { delta: f32 },
    TouchStart { touches: Vec<Vec2> },
    TouchMove { touches: Vec<Vec2> },
    TouchEnd { touches: Vec<Vec2> },
}

#[derive(Debug)]
pub struct EventDispatcher {
    attached: bool,
    enabled: bool,
    contacts: Vec<(u64, Vec2)>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Creates an attached, enabled dispatcher.
    pub fn new() -> Self {
        Self {
            attached: true,
            enabled: true,
            contacts: Vec::new(),
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Stops all dispatch and forgets tracked contacts.
    pub fn detach(&mut self) {
        self.attached = false;
        self.contacts.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Active touch contacts, oldest first.
    pub fn touches(&self) -> Vec<Vec2> {
        self.contacts.iter().map(|(_, p)| *p).collect()
    }

    pub fn dispatch(&mut self, event: &InputEvent) -> Option<ControlEvent> {
        if !self.attached {
            return None;
        }

        // Contacts are tracked while disabled so re-enabling mid-gesture sees them.
        let out = match event {
            InputEvent::PointerButton(ev) => Some(match ev.state {
                MouseButtonState::Pressed => ControlEvent::PointerDown {
                    button: ev.button,
                    position: Vec2::new(ev.x, ev.y),
                },
                MouseButtonState::Released => ControlEvent::PointerUp,
            }),
            InputEvent::PointerMoved(ev) => Some(ControlEvent::PointerMove {
                position: Vec2::new(ev.x, ev.y),
            }),
            InputEvent::PointerLeft => Some(ControlEvent::PointerUp),
            InputEvent::Focused(false) => Some(ControlEvent::PointerUp),
            InputEvent::Focused(true) => None,
            InputEvent::MouseWheel(delta) => Some(ControlEvent::Wheel {
                delta: wheel_delta(*delta),
            }),
            InputEvent::Touch(ev) => {
                let position = Vec2::new(ev.x, ev.y);
                match ev.phase {
                    TouchPhase::Started => {
                        self.contacts.retain(|(id, _)| *id != ev.id);
                        self.contacts.push((ev.id, position));
                        Some(ControlEvent::TouchStart {
                            touches: self.touches(),
                        })
                    }
                    TouchPhase::Moved => {
                        let contact = self.contacts.iter_mut().find(|(id, _)| *id == ev.id)?;
                        contact.1 = position;
                        Some(ControlEvent::TouchMove {
                            touches: self.touches(),
                        })
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.contacts.retain(|(id, _)| *id != ev.id);
                        Some(ControlEvent::TouchEnd {
                            touches: self.touches(),
                        })
                    }
                }
            }
        };

        if self.enabled { out } else { None }
    }
}

/// Vertical wheel delta in DOM convention (pixels, positive = scroll down).
fn wheel_delta(delta: MouseWheelDelta) -> f32 {
    match delta {
        MouseWheelDelta::Line { y, .. } => -y * LINE_HEIGHT_PX,
        MouseWheelDelta::Pixel { y, .. } => -y,
    }
}
