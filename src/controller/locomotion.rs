use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use super::input::{InputState, KeyBindings};
use crate::config::{CameraConfig, LocomotionConfig};
use crate::model::Camera;

/// Enable/disable switch shared between the player controls and the
/// simulation coordinator.
pub trait ControlGate {
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
}

/// First-person rig: yaw/pitch look and damped strafing along the local
/// lateral axis.
#[derive(Debug, Clone)]
pub struct LocomotionController {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Lateral velocity; only the x axis of the rig is driven
    pub velocity_x: f32,
    move_left: bool,
    move_right: bool,
    enabled: bool,
    bindings: KeyBindings,
    look_sensitivity: f32,
    damping: f32,
    strafe_acceleration: f32,
}

impl LocomotionController {
    pub fn new(config: &LocomotionConfig, camera: &CameraConfig) -> Self {
        Self {
            position: camera.start,
            yaw: 0.0,
            pitch: 0.0,
            velocity_x: config.initial_velocity_x,
            move_left: false,
            move_right: false,
            enabled: false,
            bindings: KeyBindings::from_config(config),
            look_sensitivity: config.look_sensitivity,
            damping: config.damping,
            strafe_acceleration: config.strafe_acceleration,
        }
    }

    pub fn on_look(&mut self, dx: f32, dy: f32) {
        if !self.enabled {
            return;
        }
        self.yaw -= dx * self.look_sensitivity;
        self.pitch = (self.pitch - dy * self.look_sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn on_key(&mut self, key: &str, pressed: bool) {
        if !self.enabled {
            return;
        }
        if self.bindings.is_strafe_left(key) {
            self.move_left = pressed;
        } else if self.bindings.is_strafe_right(key) {
            self.move_right = pressed;
        }
    }

    /// Feeds this frame's look delta and key transitions into the rig.
    pub fn apply_input(&mut self, input: &mut InputState) {
        let (dx, dy) = input.consume_look();
        self.on_look(dx, dy);
        for (key, pressed) in input.drain_key_transitions() {
            self.on_key(&key, pressed);
        }
    }

    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        self.velocity_x -= self.velocity_x * (self.damping * dt);

        let step = self.strafe_acceleration * dt;
        if self.move_left {
            self.velocity_x -= step;
        }
        if self.move_right {
            self.velocity_x += step;
        }

        self.position += self.lateral_axis() * (self.velocity_x * dt);
    }

    /// Local +x of the yaw frame.
    pub fn lateral_axis(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    pub fn sync_camera(&self, camera: &mut Camera) {
        camera.eye = self.position;
        camera.yaw = self.yaw;
        camera.pitch = self.pitch;
    }
}

impl ControlGate for LocomotionController {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
