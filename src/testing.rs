//! Test doubles for the physics, render and time seams.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::Vec3;

use crate::controller::{ControlGate, PhysicsBackend};
use crate::model::{BodyDesc, BodyHandle, Camera, Pose, Scene, TimeSource};
use crate::view::SceneRenderer;

/// Physics backend whose poses only change when a test says so.
#[derive(Debug, Default)]
pub struct ScriptedWorld {
    bodies: HashMap<u32, ScriptedBody>,
    next_index: u32,
    hidden: HashSet<u32>,
    steps: u64,
}

#[derive(Debug, Clone)]
pub struct ScriptedBody {
    pub desc: BodyDesc,
    pub pose: Pose,
    pub velocity: Vec3,
    pub never_sleeps: bool,
}

impl ScriptedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pose(&mut self, handle: BodyHandle, pose: Pose) {
        if let Some(body) = self.bodies.get_mut(&handle.index) {
            body.pose = pose;
        }
    }

    /// Makes `motion_state` report the body as unavailable.
    pub fn hide(&mut self, handle: BodyHandle) {
        self.hidden.insert(handle.index);
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&ScriptedBody> {
        self.bodies.get(&handle.index)
    }

    pub fn is_deactivation_disabled(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some_and(|body| body.never_sleeps)
    }
}

impl PhysicsBackend for ScriptedWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let index = self.next_index;
        self.next_index += 1;
        self.bodies.insert(
            index,
            ScriptedBody {
                desc: *desc,
                pose: desc.pose,
                velocity: Vec3::ZERO,
                never_sleeps: false,
            },
        );
        BodyHandle { index, generation: 0 }
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle.index).is_some()
    }

    fn advance(&mut self, dt: f32, _fixed_step: f32, _max_sub_steps: u32) -> u32 {
        if dt > 0.0 {
            self.steps += 1;
            1
        } else {
            0
        }
    }

    fn motion_state(&self, handle: BodyHandle) -> Option<Pose> {
        if self.hidden.contains(&handle.index) {
            return None;
        }
        self.bodies.get(&handle.index).map(|body| body.pose)
    }

    fn disable_deactivation(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.get_mut(&handle.index) {
            body.never_sleeps = true;
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle.index) {
            body.velocity = velocity;
        }
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle.index).map(|body| body.velocity)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn steps_taken(&self) -> u64 {
        self.steps
    }
}

/// Renderer that only counts frames.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    pub frames: usize,
    pub last_node_count: usize,
    pub last_eye: Option<Vec3>,
}

impl SceneRenderer for CountingRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        self.frames += 1;
        self.last_node_count = scene.len();
        self.last_eye = Some(camera.eye);
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new(start_ms: f64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }

    pub fn now(&self) -> f64 {
        self.0.get()
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

/// A bare gate for coordinator tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGate(pub bool);

impl ControlGate for FixedGate {
    fn enabled(&self) -> bool {
        self.0
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.0 = enabled;
    }
}
