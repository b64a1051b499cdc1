use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};

use crate::events::{ControlEvent, EventDispatcher};
use crate::input::{InputEvent, MouseButton};
use crate::math::{clamp, lerp};

use super::state::Camera;

/// How `current` follows `target`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Damping {
    /// Every `update` moves `current` toward `target` by this fraction, in `(0, 1]`.
    Continuous(f32),
    /// `update` only applies a single full step after input arrived.
    Manual,
}

impl Damping {
    /// `None` for a continuous factor outside `(0, 1]`, which would never converge
    /// or overshoot.
    fn checked(self) -> Option<Self> {
        match self {
            Damping::Continuous(f) if !(f > 0.0 && f <= 1.0) => None,
            d => Some(d),
        }
    }
}

/// Input modality used to pick the zoom step.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum InputModality {
    #[default]
    Pointer,
    Touch,
}

impl InputModality {
    /// Fraction of the current zoom applied per wheel/pinch event.
    pub fn zoom_step(self) -> f32 {
        match self {
            InputModality::Pointer => 0.1,
            InputModality::Touch => 0.03,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlsConfig {
    pub damping: Damping,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping: Damping::Manual,
            zoom_min: 0.5,
            zoom_max: 2.0,
            zoom_step: InputModality::Pointer.zoom_step(),
        }
    }
}

impl ControlsConfig {
    pub fn for_modality(modality: InputModality) -> Self {
        Self {
            zoom_step: modality.zoom_step(),
            ..Self::default()
        }
    }
}

/// Orbit camera controller.
///
/// Rotation is stored as fractions of a full turn: `x` is yaw about world up,
/// `y` is pitch and is kept within `[-0.25, 0.25]`. Input only moves the targets;
/// [`update`](Self::update) advances the current values and rewrites the camera.
#[derive(Debug)]
pub struct OrbitControls {
    events: EventDispatcher,
    damping: Damping,

    rotate_current: Vec2,
    rotate_target: Vec2,

    zoom_current: f32,
    zoom_target: f32,
    zoom_min: f32,
    zoom_max: f32,
    zoom_step: f32,

    key: Option<MouseButton>,
    prev: Vec2,
    prev_touch_distance: f32,

    /// Logical size of the surface the pointer moves over.
    surface: Vec2,
    pending_snap: bool,
}

impl OrbitControls {
    /// An out-of-range continuous damping factor falls back to [`Damping::Manual`].
    pub fn new(config: ControlsConfig) -> Self {
        let damping = config.damping.checked().unwrap_or_else(|| {
            log::warn!("damping {:?} outside (0, 1], using Manual", config.damping);
            Damping::Manual
        });
        Self {
            events: EventDispatcher::new(),
            damping,
            rotate_current: Vec2::ZERO,
            rotate_target: Vec2::ZERO,
            zoom_current: 1.0,
            zoom_target: 1.0,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            zoom_step: config.zoom_step,
            key: None,
            prev: Vec2::ZERO,
            prev_touch_distance: 0.0,
            surface: Vec2::ZERO,
            pending_snap: false,
        }
    }

    /// Sets the logical surface size used to normalize drags.
    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        self.surface = Vec2::new(width, height);
    }

    pub fn damping(&self) -> Damping {
        self.damping
    }

    /// Changing the damping re-enables input. An out-of-range continuous factor
    /// is rejected and the current damping kept.
    pub fn set_damping(&mut self, damping: Damping) {
        self.events.set_enabled(true);
        match damping.checked() {
            Some(d) => self.damping = d,
            None => log::warn!("damping {damping:?} outside (0, 1], keeping {:?}", self.damping),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.events.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.events.is_enabled()
    }

    pub fn set_zoom_range(&mut self, min: f32, max: f32) {
        self.zoom_min = min.min(max);
        self.zoom_max = max.max(min);
        self.zoom_target = clamp(self.zoom_target, self.zoom_min, self.zoom_max);
    }

    pub fn set_zoom_step(&mut self, step: f32) {
        self.zoom_step = step;
    }

    pub fn rotation_target(&self) -> Vec2 {
        self.rotate_target
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotate_current
    }

    pub fn zoom_target(&self) -> f32 {
        self.zoom_target
    }

    pub fn zoom(&self) -> f32 {
        self.zoom_current
    }

    /// Feeds a raw input event through the dispatcher.
    pub fn handle_input(&mut self, event: &InputEvent) {
        if let Some(ev) = self.events.dispatch(event) {
            self.handle(&ev);
        }
    }

    pub fn handle(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::PointerDown { button, position } => {
                self.key = Some(*button);
                self.prev = *position;
            }
            ControlEvent::PointerMove { position } => self.on_move(*position),
            ControlEvent::PointerUp => self.key = None,
            ControlEvent::Wheel { delta } => self.on_zoom(*delta),
            ControlEvent::TouchStart { touches } => match touches.as_slice() {
                [p] => {
                    self.key = Some(MouseButton::Left);
                    self.prev = *p;
                }
                [a, b] => self.prev_touch_distance = a.distance(*b),
                _ => {}
            },
            ControlEvent::TouchMove { touches } => match touches.as_slice() {
                [p] => self.on_move(*p),
                [a, b] => {
                    let distance = a.distance(*b);
                    self.on_zoom(self.prev_touch_distance - distance);
                    self.prev_touch_distance = distance;
                }
                _ => {}
            },
            ControlEvent::TouchEnd { .. } => self.key = None,
        }
    }

    /// Drag to `position`. Only the primary button rotates.
    fn on_move(&mut self, position: Vec2) {
        if !self.key.is_some_and(MouseButton::is_primary) {
            return;
        }

        let side = self.surface.x.min(self.surface.y);
        if side > 0.0 {
            let s = 1.0 / side;
            let d = position - self.prev;
            self.rotate_target -= d * s;
            self.rotate_target.y = clamp(self.rotate_target.y % 1.0, -0.25, 0.25);
            self.request_snap();
        }
        self.prev = position;
    }

    /// Negative `delta` zooms in, positive zooms out. Zero is ignored.
    fn on_zoom(&mut self, delta: f32) {
        if delta == 0.0 || delta.is_nan() {
            return;
        }
        let d = self.zoom_target * self.zoom_step;
        if delta < 0.0 {
            self.zoom_target -= d;
        } else {
            self.zoom_target += d;
        }
        self.zoom_target = clamp(self.zoom_target, self.zoom_min, self.zoom_max);
        self.request_snap();
    }

    fn request_snap(&mut self) {
        if self.damping == Damping::Manual {
            self.pending_snap = true;
        }
    }

    /// Advances current toward target and rewrites the camera position, up and view.
    ///
    /// With [`Damping::Manual`] this is a no-op unless input arrived since the last
    /// call, in which case current jumps to target.
    pub fn update(&mut self, camera: &mut Camera) {
        let factor = match self.damping {
            Damping::Continuous(f) => f,
            Damping::Manual => {
                if !std::mem::take(&mut self.pending_snap) {
                    return;
                }
                1.0
            }
        };

        self.rotate_current.x = lerp(self.rotate_current.x, self.rotate_target.x, factor);
        self.rotate_current.y = lerp(self.rotate_current.y, self.rotate_target.y, factor);
        self.zoom_current = lerp(self.zoom_current, self.zoom_target, factor);

        let q = orbit_rotation(self.rotate_current);
        camera.position = q * Vec3::new(0.0, 0.0, camera.distance() * self.zoom_current);
        camera.up = q * Vec3::Y;
        camera.update_view_matrix();
    }

    /// Detaches input; later events are ignored.
    pub fn dispose(&mut self) {
        self.events.detach();
        self.key = None;
    }
}

/// Yaw about world up first, then pitch about the yawed right axis.
fn orbit_rotation(turns: Vec2) -> Quat {
    let yaw = Quat::from_axis_angle(Vec3::Y, turns.x * TAU);
    let right = (yaw * Vec3::X).normalize_or(Vec3::X);
    let pitch = Quat::from_axis_angle(right, turns.y * TAU);
    pitch * yaw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::perspective(45.0, 1.0, 0.01, 10.0, Vec3::new(0.0, 0.0, 2.0))
    }

    fn controls(damping: Damping) -> OrbitControls {
        let mut c = OrbitControls::new(ControlsConfig {
            damping,
            ..ControlsConfig::default()
        });
        c.set_surface_size(500.0, 500.0);
        c
    }

    fn drag(c: &mut OrbitControls, from: Vec2, to: Vec2) {
        c.handle(&ControlEvent::PointerDown {
            button: MouseButton::Left,
            position: from,
        });
        c.handle(&ControlEvent::PointerMove { position: to });
        c.handle(&ControlEvent::PointerUp);
    }

    // ── damping ──────────────────────────────────────────────────────────

    #[test]
    fn update_strictly_reduces_gap() {
        for factor in [0.05, 0.15, 0.5, 1.0] {
            let mut c = controls(Damping::Continuous(factor));
            let mut cam = camera();
            drag(&mut c, Vec2::ZERO, Vec2::new(120.0, -40.0));
            c.handle(&ControlEvent::Wheel { delta: 1.0 });

            let gap = |c: &OrbitControls| {
                ((c.rotation_target() - c.rotation()).length(), (c.zoom_target() - c.zoom()).abs())
            };
            let (r0, z0) = gap(&c);
            c.update(&mut cam);
            let (r1, z1) = gap(&c);
            assert!(r1 < r0, "factor {factor}: {r1} !< {r0}");
            assert!(z1 < z0, "factor {factor}: {z1} !< {z0}");
        }
    }

    #[test]
    fn manual_damping_snaps_once_per_input() {
        let mut c = controls(Damping::Manual);
        let mut cam = camera();

        drag(&mut c, Vec2::ZERO, Vec2::new(50.0, 0.0));
        c.update(&mut cam);
        assert_eq!(c.rotation(), c.rotation_target());
        let pos = cam.position;

        c.update(&mut cam);
        assert_eq!(cam.position, pos);
    }

    #[test]
    fn rest_does_not_drift() {
        let mut c = controls(Damping::Continuous(0.15));
        let mut cam = camera();
        let start = cam.position;

        for _ in 0..100 {
            c.update(&mut cam);
        }
        assert!(cam.position.abs_diff_eq(start, 1e-5));
        assert!(cam.up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn non_positive_damping_is_rejected() {
        let c = controls(Damping::Continuous(0.0));
        assert_eq!(c.damping(), Damping::Manual);

        let mut c = controls(Damping::Continuous(0.3));
        for bad in [0.0, -0.5, 1.5, f32::NAN] {
            c.set_damping(Damping::Continuous(bad));
            assert_eq!(c.damping(), Damping::Continuous(0.3));
        }
        c.set_damping(Damping::Continuous(1.0));
        assert_eq!(c.damping(), Damping::Continuous(1.0));
    }

    // ── rotation ─────────────────────────────────────────────────────────

    #[test]
    fn drag_maps_pixels_to_turns() {
        let mut c = controls(Damping::Continuous(0.15));
        let mut cam = camera();
        drag(&mut c, Vec2::new(100.0, 100.0), Vec2::new(150.0, 100.0));

        assert!((c.rotation_target().x + 0.1).abs() < 1e-6);
        assert_eq!(c.rotation_target().y, 0.0);

        for _ in 0..500 {
            c.update(&mut cam);
        }
        assert!((c.rotation().x + 0.1).abs() < 1e-5);

        // a tenth of a turn about +Y, distance kept
        let expected = Quat::from_axis_angle(Vec3::Y, -0.1 * TAU) * Vec3::new(0.0, 0.0, 2.0);
        assert!(cam.position.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn single_finger_drag_rotates_like_the_mouse() {
        let mut c = controls(Damping::Continuous(0.15));
        let mut cam = camera();
        c.handle(&ControlEvent::TouchStart {
            touches: vec![Vec2::new(100.0, 100.0)],
        });
        c.handle(&ControlEvent::TouchMove {
            touches: vec![Vec2::new(150.0, 100.0)],
        });
        c.handle(&ControlEvent::TouchEnd { touches: vec![] });

        assert!((c.rotation_target().x + 0.1).abs() < 1e-6);
        assert_eq!(c.rotation_target().y, 0.0);

        let mut last_gap = f32::INFINITY;
        for _ in 0..500 {
            c.update(&mut cam);
            let gap = (c.rotation_target().x - c.rotation().x).abs();
            assert!(gap <= last_gap);
            last_gap = gap;
        }
        assert!((c.rotation().x + 0.1).abs() < 1e-5);
    }

    #[test]
    fn second_finger_stops_rotation() {
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::TouchStart {
            touches: vec![Vec2::new(100.0, 100.0)],
        });
        c.handle(&ControlEvent::TouchStart {
            touches: vec![Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0)],
        });
        c.handle(&ControlEvent::TouchMove {
            touches: vec![Vec2::new(140.0, 130.0), Vec2::new(260.0, 100.0)],
        });
        assert_eq!(c.rotation_target(), Vec2::ZERO);

        // without a second start the move is still treated as a pinch
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::TouchStart {
            touches: vec![Vec2::new(100.0, 100.0)],
        });
        c.handle(&ControlEvent::TouchMove {
            touches: vec![Vec2::new(140.0, 130.0), Vec2::new(260.0, 100.0)],
        });
        assert_eq!(c.rotation_target(), Vec2::ZERO);
    }

    #[test]
    fn pitch_stays_within_quarter_turn() {
        let mut c = controls(Damping::Manual);
        for step in [-900.0, 400.0, 1300.0, -2000.0, 77.0] {
            drag(&mut c, Vec2::ZERO, Vec2::new(0.0, step));
            let y = c.rotation_target().y;
            assert!((-0.25..=0.25).contains(&y), "pitch {y}");
        }
    }

    #[test]
    fn only_primary_button_rotates() {
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::PointerDown {
            button: MouseButton::Right,
            position: Vec2::ZERO,
        });
        c.handle(&ControlEvent::PointerMove {
            position: Vec2::new(100.0, 0.0),
        });
        assert_eq!(c.rotation_target(), Vec2::ZERO);
    }

    #[test]
    fn zero_surface_ignores_drag() {
        let mut c = controls(Damping::Manual);
        c.set_surface_size(0.0, 300.0);
        drag(&mut c, Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert_eq!(c.rotation_target(), Vec2::ZERO);
    }

    #[test]
    fn pitch_keeps_camera_off_the_pole() {
        let mut c = controls(Damping::Manual);
        let mut cam = camera();
        drag(&mut c, Vec2::ZERO, Vec2::new(0.0, -125.0));
        c.update(&mut cam);

        assert!((c.rotation().y - 0.25).abs() < 1e-6);
        // a quarter turn about +X; up follows so the view stays defined
        assert!(cam.position.abs_diff_eq(Vec3::new(0.0, -2.0, 0.0), 1e-4));
        assert!(cam.up.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-4));
        assert!(cam.view_matrix().is_finite());
    }

    // ── zoom ─────────────────────────────────────────────────────────────

    #[test]
    fn zoom_stays_within_range() {
        let mut c = controls(Damping::Manual);
        for _ in 0..50 {
            c.handle(&ControlEvent::Wheel { delta: 1.0 });
            assert!(c.zoom_target() <= 2.0);
        }
        assert_eq!(c.zoom_target(), 2.0);
        for _ in 0..50 {
            c.handle(&ControlEvent::Wheel { delta: -1.0 });
            assert!(c.zoom_target() >= 0.5);
        }
        assert_eq!(c.zoom_target(), 0.5);
    }

    #[test]
    fn zoom_step_is_proportional() {
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::Wheel { delta: 3.0 });
        assert!((c.zoom_target() - 1.1).abs() < 1e-6);
        c.handle(&ControlEvent::Wheel { delta: 3.0 });
        assert!((c.zoom_target() - 1.21).abs() < 1e-6);

        let mut t = OrbitControls::new(ControlsConfig::for_modality(InputModality::Touch));
        t.handle(&ControlEvent::Wheel { delta: -1.0 });
        assert!((t.zoom_target() - 0.97).abs() < 1e-6);
    }

    #[test]
    fn pinch_zooms_by_distance_change() {
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::TouchStart {
            touches: vec![Vec2::ZERO, Vec2::new(100.0, 0.0)],
        });
        // fingers spread: distance grows, zoom in
        c.handle(&ControlEvent::TouchMove {
            touches: vec![Vec2::ZERO, Vec2::new(150.0, 0.0)],
        });
        assert!(c.zoom_target() < 1.0);
        assert_eq!(c.rotation_target(), Vec2::ZERO);
    }

    #[test]
    fn zoom_range_reclamps_target() {
        let mut c = controls(Damping::Manual);
        c.handle(&ControlEvent::Wheel { delta: 1.0 });
        c.set_zoom_range(0.25, 1.0);
        assert_eq!(c.zoom_target(), 1.0);
    }

    #[test]
    fn disabled_or_disposed_controls_ignore_input() {
        use crate::input::MouseWheelDelta;

        let mut c = controls(Damping::Manual);
        c.set_enabled(false);
        c.handle_input(&InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: -1.0 }));
        assert_eq!(c.zoom_target(), 1.0);

        c.set_damping(Damping::Continuous(0.2));
        assert!(c.is_enabled());
        c.dispose();
        c.handle_input(&InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: -1.0 }));
        assert_eq!(c.zoom_target(), 1.0);
    }
}
