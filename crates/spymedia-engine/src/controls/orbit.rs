use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::input::{
    InputEvent, MouseButton, MouseButtonState, PointerButtonEvent, PointerMoveEvent, TouchEvent,
    TouchPhase,
};
use crate::scene::PerspectiveCamera;

/// Keeps the polar angle off the poles where `look_at` degenerates.
const POLE_EPSILON: f32 = 1e-6;

/// Movement below this (squared) does not count as a camera change.
const CHANGE_EPSILON: f32 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitConfig {
    pub enable_damping: bool,
    /// Fraction of the pending rotation applied per update when damping.
    pub damping_factor: f32,
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub auto_rotate: bool,
    /// 1.0 is one full turn per minute.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            enable_rotate: true,
            enable_zoom: true,
            enable_pan: true,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Gesture {
    Idle,
    Rotate { last: Vec2 },
    Dolly { last: Vec2 },
    Pan { last: Vec2 },
    TouchRotate { last: Vec2 },
    TouchDolly { distance: f32 },
}

impl Gesture {
    fn is_mouse(self) -> bool {
        matches!(
            self,
            Gesture::Rotate { .. } | Gesture::Dolly { .. } | Gesture::Pan { .. }
        )
    }
}

/// Camera offset from the target in spherical coordinates, Y up.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct Spherical {
    radius: f32,
    /// Azimuth around Y, zero on +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit camera controller: drag to rotate, wheel/pinch to dolly, optional
/// pan, damping and idle auto-rotation.
///
/// Input only accumulates deltas; nothing moves until [`OrbitControls::update`]
/// runs, which the animation driver calls once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: OrbitConfig,
    target: Vec3,
    spherical: Spherical,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    /// Pan drag since the last update, in viewport heights.
    pending_pan: Vec2,
    gesture: Gesture,
    touches: Vec<(u64, Vec2)>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(config: OrbitConfig, camera: &PerspectiveCamera) -> Self {
        Self {
            config,
            target: camera.target,
            spherical: Spherical::from_offset(camera.position - camera.target),
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            pending_pan: Vec2::ZERO,
            gesture: Gesture::Idle,
            touches: Vec::new(),
            disposed: false,
        }
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Azimuth after the last update, in `(-PI, PI]`.
    pub fn azimuth(&self) -> f32 {
        self.spherical.theta
    }

    pub fn polar(&self) -> f32 {
        self.spherical.phi
    }

    pub fn distance(&self) -> f32 {
        self.spherical.radius
    }

    /// True while a pointer or touch gesture is in progress.
    pub fn is_interacting(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Detaches from input. Later events are ignored.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.gesture = Gesture::Idle;
        self.touches.clear();
        self.pending_pan = Vec2::ZERO;
    }

    /// Feeds one input event. Returns whether the event was consumed.
    pub fn handle_event(&mut self, event: &InputEvent, viewport_height: f32) -> bool {
        if self.disposed {
            return false;
        }
        let height = viewport_height.max(1.0);

        match event {
            InputEvent::PointerButton(ev) => self.handle_button(ev),

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.handle_pointer_move(Vec2::new(*x, *y), height)
            }

            InputEvent::MouseWheel { delta, .. } => {
                if !self.config.enable_zoom || self.gesture != Gesture::Idle {
                    return false;
                }
                // Browser convention: negative delta means wheel pushed away.
                let delta_y = -delta.pixels_y();
                if delta_y < 0.0 {
                    self.dolly_in(self.zoom_scale(delta_y));
                } else if delta_y > 0.0 {
                    self.dolly_out(self.zoom_scale(delta_y));
                } else {
                    return false;
                }
                true
            }

            InputEvent::Touch(touch) => self.handle_touch(touch, height),

            InputEvent::Focused(false) => {
                // Releases are not delivered while unfocused.
                self.gesture = Gesture::Idle;
                self.touches.clear();
                false
            }

            _ => false,
        }
    }

    fn handle_button(&mut self, ev: &PointerButtonEvent) -> bool {
        let p = Vec2::new(ev.x, ev.y);
        match ev.state {
            MouseButtonState::Pressed => {
                if self.gesture != Gesture::Idle {
                    return false;
                }
                // Ctrl, shift or meta swap the left and right button roles.
                let m = ev.modifiers;
                let swapped = m.ctrl || m.shift || m.meta;
                let rotate = Gesture::Rotate { last: p };
                let pan = Gesture::Pan { last: p };
                let (left, right) = if swapped { (pan, rotate) } else { (rotate, pan) };

                let gesture = match ev.button {
                    MouseButton::Left => left,
                    MouseButton::Right => right,
                    MouseButton::Middle => Gesture::Dolly { last: p },
                    _ => return false,
                };
                let enabled = match gesture {
                    Gesture::Rotate { .. } => self.config.enable_rotate,
                    Gesture::Pan { .. } => self.config.enable_pan,
                    Gesture::Dolly { .. } => self.config.enable_zoom,
                    _ => false,
                };
                if !enabled {
                    return false;
                }
                self.gesture = gesture;
                true
            }
            MouseButtonState::Released => {
                if !self.gesture.is_mouse() {
                    return false;
                }
                self.gesture = Gesture::Idle;
                true
            }
        }
    }

    fn handle_pointer_move(&mut self, p: Vec2, height: f32) -> bool {
        match self.gesture {
            Gesture::Rotate { last } => {
                self.gesture = Gesture::Rotate { last: p };
                self.rotate_by_pixels(p - last, height);
                true
            }
            Gesture::Dolly { last } => {
                self.gesture = Gesture::Dolly { last: p };
                let dy = p.y - last.y;
                if dy > 0.0 {
                    self.dolly_out(self.zoom_scale(dy));
                } else if dy < 0.0 {
                    self.dolly_in(self.zoom_scale(dy));
                }
                true
            }
            Gesture::Pan { last } => {
                self.gesture = Gesture::Pan { last: p };
                self.pending_pan += (p - last) / height;
                true
            }
            _ => false,
        }
    }

    fn handle_touch(&mut self, touch: &TouchEvent, height: f32) -> bool {
        let p = Vec2::new(touch.x, touch.y);

        match touch.phase {
            TouchPhase::Started => {
                if self.gesture.is_mouse() {
                    return false;
                }
                self.touches.retain(|(id, _)| *id != touch.id);
                self.touches.push((touch.id, p));
                self.begin_touch_gesture();
                true
            }
            TouchPhase::Moved => {
                let Some(slot) = self.touches.iter_mut().find(|(id, _)| *id == touch.id) else {
                    return false;
                };
                slot.1 = p;

                match self.gesture {
                    Gesture::TouchRotate { last } if self.touches.len() == 1 => {
                        self.gesture = Gesture::TouchRotate { last: p };
                        self.rotate_by_pixels(p - last, height);
                        true
                    }
                    Gesture::TouchDolly { distance } => {
                        let current = self.touch_distance();
                        if distance > 0.0 && current > 0.0 {
                            self.dolly_out((current / distance).powf(self.config.zoom_speed));
                        }
                        self.gesture = Gesture::TouchDolly { distance: current };
                        true
                    }
                    _ => false,
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                let before = self.touches.len();
                self.touches.retain(|(id, _)| *id != touch.id);
                if self.touches.len() == before {
                    return false;
                }
                self.begin_touch_gesture();
                true
            }
        }
    }

    fn begin_touch_gesture(&mut self) {
        let gesture = match self.touches.as_slice() {
            [(_, p)] if self.config.enable_rotate => Gesture::TouchRotate { last: *p },
            [_, _] if self.config.enable_zoom => Gesture::TouchDolly {
                distance: self.touch_distance(),
            },
            _ => Gesture::Idle,
        };
        self.gesture = gesture;
    }

    fn touch_distance(&self) -> f32 {
        match self.touches.as_slice() {
            [(_, a), (_, b), ..] => a.distance(*b),
            _ => 0.0,
        }
    }

    /// Dragging the full viewport height turns the camera once.
    fn rotate_by_pixels(&mut self, delta: Vec2, height: f32) {
        let delta = delta * self.config.rotate_speed;
        self.delta_theta -= TAU * delta.x / height;
        self.delta_phi -= TAU * delta.y / height;
    }

    fn zoom_scale(&self, delta: f32) -> f32 {
        0.95f32.powf(self.config.zoom_speed * (delta * 0.01).abs())
    }

    fn dolly_in(&mut self, scale: f32) {
        self.scale *= scale;
    }

    fn dolly_out(&mut self, scale: f32) {
        self.scale /= scale;
    }

    fn auto_rotation_angle(&self, dt: f32) -> f32 {
        TAU / 60.0 * self.config.auto_rotate_speed * dt
    }

    fn pan_world(&self, camera: &PerspectiveCamera, pan: Vec2) -> Vec3 {
        let offset = camera.position - self.target;
        let target_distance = offset.length() * (camera.fov_y_degrees.to_radians() / 2.0).tan();

        let forward = (-offset).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        let scale = 2.0 * target_distance * self.config.pan_speed;
        (-right * pan.x + up * pan.y) * scale
    }

    /// Applies accumulated input and auto-rotation to `camera`.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, dt: f32) -> bool {
        let mut s = Spherical::from_offset(camera.position - self.target);

        if self.config.auto_rotate && !self.is_interacting() {
            self.delta_theta -= self.auto_rotation_angle(dt);
        }

        if self.pending_pan != Vec2::ZERO {
            self.pan_offset += self.pan_world(camera, self.pending_pan);
            self.pending_pan = Vec2::ZERO;
        }

        let factor = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };

        s.theta += self.delta_theta * factor;
        s.phi += self.delta_phi * factor;
        s.phi = s
            .phi
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);

        let previous_target = self.target;
        self.target += self.pan_offset * factor;

        s.radius = (s.radius * self.scale)
            .max(self.config.min_distance)
            .min(self.config.max_distance);

        let position = self.target + s.to_offset();

        if self.config.enable_damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        s.theta = s.theta.sin().atan2(s.theta.cos());
        self.spherical = s;

        let moved = position.distance_squared(camera.position) > CHANGE_EPSILON
            || previous_target.distance_squared(self.target) > CHANGE_EPSILON;

        camera.position = position;
        camera.look_at(self.target);
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, MouseWheelDelta};
    use crate::scene::CameraConfig;

    const DT: f32 = 1.0 / 60.0;
    const HEIGHT: f32 = 600.0;

    fn drone_config() -> OrbitConfig {
        OrbitConfig {
            enable_damping: true,
            enable_pan: false,
            min_distance: 2.0,
            max_distance: 6.0,
            auto_rotate: true,
            auto_rotate_speed: 1.25,
            ..OrbitConfig::default()
        }
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(
            CameraConfig {
                fov_y_degrees: 38.0,
                position: Vec3::new(0.0, 0.6, 5.0),
                ..CameraConfig::default()
            },
            1.0,
        )
    }

    fn button(button: MouseButton, state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button,
            state,
            x,
            y,
            modifiers: Modifiers::default(),
        })
    }

    fn press(which: MouseButton, x: f32, y: f32) -> InputEvent {
        button(which, MouseButtonState::Pressed, x, y)
    }

    fn press_with(button: MouseButton, modifiers: Modifiers) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button,
            state: MouseButtonState::Pressed,
            x: 0.0,
            y: 0.0,
            modifiers,
        })
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y })
    }

    fn touch(id: u64, phase: TouchPhase, x: f32, y: f32) -> InputEvent {
        InputEvent::Touch(TouchEvent { id, phase, x, y })
    }

    fn wrapped(delta: f32) -> f32 {
        (delta + PI).rem_euclid(TAU) - PI
    }

    #[test]
    fn drag_right_turns_azimuth_monotonically() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);
        controls.update(&mut cam, DT);

        assert!(controls.handle_event(&press(MouseButton::Left, 100.0, 300.0), HEIGHT));
        let mut previous = controls.azimuth();
        for i in 1..=60 {
            assert!(controls.handle_event(&moved(100.0 + 5.0 * i as f32, 300.0), HEIGHT));
            controls.update(&mut cam, DT);
            let step = wrapped(controls.azimuth() - previous);
            assert!(step < 0.0, "frame {i}: azimuth step {step}");
            previous = controls.azimuth();
        }
    }

    #[test]
    fn auto_rotate_resumes_at_configured_speed_after_release() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);

        controls.handle_event(&press(MouseButton::Left, 0.0, 0.0), HEIGHT);
        controls.handle_event(&moved(-150.0, 0.0), HEIGHT);
        controls.update(&mut cam, DT);
        assert!(controls.is_interacting());
        let release = button(MouseButton::Left, MouseButtonState::Released, -150.0, 0.0);
        controls.handle_event(&release, HEIGHT);
        assert!(!controls.is_interacting());

        // Let the drag momentum decay.
        for _ in 0..600 {
            controls.update(&mut cam, DT);
        }

        let start = controls.azimuth();
        let mut turned = 0.0;
        let mut last = start;
        for _ in 0..60 {
            controls.update(&mut cam, DT);
            turned += wrapped(controls.azimuth() - last);
            last = controls.azimuth();
        }

        let expected = -TAU / 60.0 * 1.25;
        assert!((turned - expected).abs() < 1e-3, "turned {turned}, expected {expected}");
    }

    #[test]
    fn auto_rotate_paused_while_pointer_down() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(
            OrbitConfig {
                enable_damping: false,
                ..drone_config()
            },
            &cam,
        );
        controls.update(&mut cam, DT);
        let before = controls.azimuth();

        controls.handle_event(&press(MouseButton::Left, 10.0, 10.0), HEIGHT);
        for _ in 0..10 {
            controls.update(&mut cam, DT);
        }
        assert!((controls.azimuth() - before).abs() < 1e-6);
    }

    #[test]
    fn wheel_zoom_clamped_to_distance_range() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);

        let wheel = |y: f32| InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y },
            modifiers: Modifiers::default(),
        };

        for _ in 0..100 {
            assert!(controls.handle_event(&wheel(1.0), HEIGHT));
            controls.update(&mut cam, DT);
        }
        assert!((controls.distance() - 2.0).abs() < 1e-4);
        assert!((cam.position.distance(cam.target) - 2.0).abs() < 1e-4);

        for _ in 0..100 {
            controls.handle_event(&wheel(-1.0), HEIGHT);
            controls.update(&mut cam, DT);
        }
        assert!((controls.distance() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn pinch_spread_moves_camera_closer() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);
        controls.update(&mut cam, DT);
        let before = controls.distance();

        controls.handle_event(&touch(1, TouchPhase::Started, 100.0, 100.0), HEIGHT);
        controls.handle_event(&touch(2, TouchPhase::Started, 200.0, 100.0), HEIGHT);
        assert!(controls.handle_event(&touch(2, TouchPhase::Moved, 250.0, 100.0), HEIGHT));
        controls.update(&mut cam, DT);

        assert!(controls.distance() < before);
        assert!(controls.distance() >= 2.0);
    }

    #[test]
    fn single_touch_rotates() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(
            OrbitConfig {
                auto_rotate: false,
                enable_damping: false,
                ..drone_config()
            },
            &cam,
        );
        controls.update(&mut cam, DT);
        let before = controls.azimuth();

        controls.handle_event(&touch(7, TouchPhase::Started, 100.0, 100.0), HEIGHT);
        controls.handle_event(&touch(7, TouchPhase::Moved, 130.0, 100.0), HEIGHT);
        controls.update(&mut cam, DT);

        let expected = -TAU * 30.0 / HEIGHT;
        assert!((wrapped(controls.azimuth() - before) - expected).abs() < 1e-4);

        controls.handle_event(&touch(7, TouchPhase::Ended, 130.0, 100.0), HEIGHT);
        assert!(!controls.is_interacting());
    }

    #[test]
    fn pan_disabled_ignores_right_drag() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);

        assert!(!controls.handle_event(&press(MouseButton::Right, 0.0, 0.0), HEIGHT));
        assert!(!controls.handle_event(&moved(50.0, 50.0), HEIGHT));
        controls.update(&mut cam, DT);
        assert_eq!(controls.target(), Vec3::ZERO);
    }

    #[test]
    fn pan_moves_target_when_enabled() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(
            OrbitConfig {
                enable_pan: true,
                auto_rotate: false,
                ..OrbitConfig::default()
            },
            &cam,
        );

        controls.handle_event(&press(MouseButton::Right, 0.0, 0.0), HEIGHT);
        controls.handle_event(&moved(60.0, 0.0), HEIGHT);
        controls.update(&mut cam, DT);

        // Dragging right drags the scene right, so the target moves left.
        assert!(controls.target().x < 0.0);
    }

    #[test]
    fn modified_left_drag_pans_or_does_nothing() {
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };

        let mut cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);
        assert!(!controls.handle_event(&press_with(MouseButton::Left, ctrl), HEIGHT));
        assert!(!controls.is_interacting());

        let mut controls = OrbitControls::new(
            OrbitConfig {
                enable_pan: true,
                auto_rotate: false,
                enable_damping: false,
                ..OrbitConfig::default()
            },
            &cam,
        );
        controls.update(&mut cam, DT);
        let azimuth = controls.azimuth();

        let shift = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        assert!(controls.handle_event(&press_with(MouseButton::Left, shift), HEIGHT));
        controls.handle_event(&moved(60.0, 0.0), HEIGHT);
        controls.update(&mut cam, DT);

        assert!(controls.target().x < 0.0);
        assert!((controls.azimuth() - azimuth).abs() < 1e-5);
    }

    #[test]
    fn modified_right_drag_rotates() {
        let meta = Modifiers {
            meta: true,
            ..Modifiers::default()
        };
        let mut cam = camera();
        let mut controls = OrbitControls::new(
            OrbitConfig {
                auto_rotate: false,
                enable_damping: false,
                ..drone_config()
            },
            &cam,
        );
        controls.update(&mut cam, DT);
        let before = controls.azimuth();

        assert!(controls.handle_event(&press_with(MouseButton::Right, meta), HEIGHT));
        controls.handle_event(&moved(30.0, 0.0), HEIGHT);
        controls.update(&mut cam, DT);
        assert!(wrapped(controls.azimuth() - before) < 0.0);
        assert_eq!(controls.target(), Vec3::ZERO);
    }

    #[test]
    fn polar_angle_stays_off_the_poles() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(
            OrbitConfig {
                auto_rotate: false,
                ..OrbitConfig::default()
            },
            &cam,
        );

        controls.handle_event(&press(MouseButton::Left, 0.0, 0.0), HEIGHT);
        controls.handle_event(&moved(0.0, 5000.0), HEIGHT);
        controls.update(&mut cam, DT);
        assert!(controls.polar() > 0.0 && controls.polar() < PI);
        assert!(cam.position.is_finite());
    }

    #[test]
    fn disposed_controls_ignore_input() {
        let cam = camera();
        let mut controls = OrbitControls::new(drone_config(), &cam);
        controls.handle_event(&press(MouseButton::Left, 0.0, 0.0), HEIGHT);

        controls.dispose();
        assert!(controls.is_disposed());
        assert!(!controls.is_interacting());
        assert!(!controls.handle_event(&moved(100.0, 0.0), HEIGHT));
        assert!(!controls.handle_event(&touch(1, TouchPhase::Started, 0.0, 0.0), HEIGHT));
    }
}
