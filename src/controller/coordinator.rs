//! Simulation-synchronization loop.
//!
//! The coordinator owns the physics world, the scene graph and the registry
//! of tracked bodies. Each [`SimulationCoordinator::step`] runs, in order:
//! termination scan, clock sample, physics advance (only while controls are
//! enabled), physics-to-scene transform copy, out-of-bounds eviction and
//! render. Termination is absorbing: once a tracked body crosses the edge no
//! later step advances, syncs or renders anything.

use glam::Vec3;

use super::locomotion::ControlGate;
use super::physics::PhysicsBackend;
use crate::config::{ArenaConfig, PhysicsConfig, TerminationScope};
use crate::error::ArenaError;
use crate::model::{
    BodyDesc, BodyHandle, BodyId, BodyOrigin, BodyRegistry, Camera, DynamicBody, GameState,
    NodeId, Scene, SceneNode, SimulationClock,
};
use crate::view::SceneRenderer;

/// Result of one [`SimulationCoordinator::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub terminated: bool,
    /// Sampled frame delta in seconds; 0 when terminated
    pub delta: f32,
}

impl StepOutcome {
    const TERMINATED: Self = Self { terminated: true, delta: 0.0 };
}

pub type TerminationHook = Box<dyn FnMut()>;

pub struct SimulationCoordinator<B: PhysicsBackend, R: SceneRenderer> {
    physics: B,
    renderer: R,
    scene: Scene,
    registry: BodyRegistry,
    camera: Option<Camera>,
    clock: SimulationClock,
    state: GameState,
    physics_config: PhysicsConfig,
    termination_scope: TerminationScope,
    max_tracked_bodies: usize,
    on_terminate: Option<TerminationHook>,
}

impl<B: PhysicsBackend, R: SceneRenderer> SimulationCoordinator<B, R> {
    pub fn new(physics: B, renderer: R, clock: SimulationClock, config: &ArenaConfig) -> Self {
        Self {
            physics,
            renderer,
            scene: Scene::new(),
            registry: BodyRegistry::new(),
            camera: None,
            clock,
            state: GameState::new(),
            physics_config: config.physics.clone(),
            termination_scope: config.termination_scope,
            max_tracked_bodies: config.max_tracked_bodies,
            on_terminate: None,
        }
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Invoked exactly once, on the frame that ends the run.
    pub fn set_termination_hook(&mut self, hook: impl FnMut() + 'static) {
        self.on_terminate = Some(Box::new(hook));
    }

    /// Add a zero-mass body. It is never tracked, synced or evicted.
    pub fn register_static(
        &mut self,
        node: SceneNode,
        desc: &BodyDesc,
    ) -> Result<(NodeId, BodyHandle), ArenaError> {
        if !desc.is_static() {
            return Err(ArenaError::InvalidMass { mass: desc.mass });
        }
        let handle = self.physics.add_body(desc);
        let node = self.scene.add(node);
        Ok((node, handle))
    }

    /// Add a body with positive mass and start tracking it. Evicts the oldest
    /// tracked body first when the registry is full.
    pub fn register_dynamic(
        &mut self,
        node: SceneNode,
        desc: &BodyDesc,
        origin: BodyOrigin,
    ) -> Result<(NodeId, BodyHandle, BodyId), ArenaError> {
        if !(desc.mass > 0.0 && desc.mass.is_finite()) {
            return Err(ArenaError::InvalidMass { mass: desc.mass });
        }
        while self.registry.len() >= self.max_tracked_bodies {
            match self.registry.pop_oldest() {
                Some((id, body)) => {
                    tracing::debug!(?id, "tracked body cap reached, evicting oldest");
                    self.discard(&body);
                }
                None => break,
            }
        }

        let handle = self.physics.add_body(desc);
        self.physics.disable_deactivation(handle);
        let node = self.scene.add(node);
        let id = self
            .registry
            .insert(DynamicBody::new(node, handle, origin, self.termination_scope));
        Ok((node, handle, id))
    }

    fn discard(&mut self, body: &DynamicBody) {
        self.scene.remove(body.node);
        self.physics.remove_body(body.handle);
    }

    /// Remove a tracked body from the registry, the scene and the world.
    pub fn evict(&mut self, id: BodyId) -> Result<(), ArenaError> {
        let body = self.registry.remove(id).ok_or(ArenaError::StaleBody)?;
        self.discard(&body);
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<(), ArenaError> {
        let body = self.registry.get(id).ok_or(ArenaError::StaleBody)?;
        self.physics.set_linear_velocity(body.handle, velocity);
        Ok(())
    }

    /// Advance one frame. See the module docs for the order of effects.
    pub fn step(
        &mut self,
        controls: &mut dyn ControlGate,
        edge_threshold: f32,
    ) -> Result<StepOutcome, ArenaError> {
        if self.state.is_terminated() {
            return Ok(StepOutcome::TERMINATED);
        }
        if self.camera.is_none() {
            return Err(ArenaError::MissingCamera);
        }

        if let Some(id) = self.edge_crossing(edge_threshold) {
            controls.set_enabled(false);
            if self.state.terminate() {
                tracing::info!(?id, score = %self.state.score_text(), "body crossed the slope edge");
                if let Some(hook) = self.on_terminate.as_mut() {
                    hook();
                }
            }
            return Ok(StepOutcome::TERMINATED);
        }

        let delta = self.clock.delta();
        if controls.enabled() {
            self.physics.advance(
                delta,
                self.physics_config.fixed_time_step,
                self.physics_config.max_sub_steps,
            );
        }

        self.sync_transforms();
        self.evict_out_of_bounds();
        if let Some(camera) = self.camera.as_ref() {
            self.renderer.render(&self.scene, camera);
        }

        Ok(StepOutcome { terminated: false, delta })
    }

    fn edge_crossing(&self, edge_threshold: f32) -> Option<BodyId> {
        self.registry
            .termination_set()
            .find(|(_, body)| {
                self.scene
                    .get(body.node)
                    .is_some_and(|node| node.position.z > edge_threshold)
            })
            .map(|(id, _)| id)
    }

    fn sync_transforms(&mut self) {
        for (id, body) in self.registry.iter() {
            let Some(pose) = self.physics.motion_state(body.handle) else {
                tracing::trace!(?id, "motion state unavailable, skipping sync");
                continue;
            };
            if let Some(node) = self.scene.get_mut(body.node) {
                node.set_pose(pose);
            }
        }
    }

    fn evict_out_of_bounds(&mut self) {
        let limit = self.physics_config.world_half_extent;
        let lost: Vec<BodyId> = self
            .registry
            .iter()
            .filter(|(_, body)| {
                self.scene
                    .get(body.node)
                    .is_some_and(|node| node.position.abs().max_element() > limit)
            })
            .map(|(id, _)| id)
            .collect();

        for id in lost {
            tracing::debug!(?id, "evicting body outside world bounds");
            if let Some(body) = self.registry.remove(id) {
                self.discard(&body);
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    pub fn game_state(&self) -> &GameState {
        &self.state
    }

    pub fn game_state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn physics(&self) -> &B {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut B {
        &mut self.physics
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
