use std::cell::RefCell;
use std::rc::Rc;

use super::coordinator::{SimulationCoordinator, StepOutcome};
use super::factory::RigidBodyFactory;
use super::input::InputState;
use super::launcher::ProjectileLauncher;
use super::locomotion::{ControlGate, LocomotionController};
use super::physics::PhysicsBackend;
use super::spawner::{wall_clock_seed, DropSpawner};
use crate::arena::{self, Arena};
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::ui::{HudState, Overlay};
use crate::view::SceneRenderer;

/// Per-frame sequencing around the coordinator: control gate transitions,
/// score, simulation step, locomotion, fire throttle and drops.
pub struct FrameDriver<B: PhysicsBackend, R: SceneRenderer> {
    pub coordinator: SimulationCoordinator<B, R>,
    pub locomotion: LocomotionController,
    pub arena: Arena,
    factory: RigidBodyFactory,
    launcher: ProjectileLauncher,
    spawner: DropSpawner,
    input: Rc<RefCell<InputState>>,
    hud: Rc<RefCell<HudState>>,
    cooldown: f32,
    since_last_shot: f32,
    last_wall_ms: Option<f64>,
    was_locked: bool,
}

impl<B: PhysicsBackend, R: SceneRenderer> FrameDriver<B, R> {
    /// Builds the arena into `coordinator` and wires the termination hook.
    /// `on_terminate` runs after the HUD switched to game over.
    pub fn new(
        mut coordinator: SimulationCoordinator<B, R>,
        config: &ArenaConfig,
        input: Rc<RefCell<InputState>>,
        hud: Rc<RefCell<HudState>>,
        mut on_terminate: impl FnMut() + 'static,
    ) -> Result<Self, ArenaError> {
        config.validate()?;
        let arena = arena::build(&mut coordinator, config)?;
        if coordinator.camera().is_none() {
            coordinator.set_camera(arena::camera(config, 800, 600));
        }

        let hook_hud = hud.clone();
        coordinator.set_termination_hook(move || {
            let mut hud = hook_hud.borrow_mut();
            let score = hud.score.clone();
            hud.game_over(score);
            drop(hud);
            on_terminate();
        });

        let seed = config.spawner.seed.unwrap_or_else(wall_clock_seed);
        tracing::info!(seed, "frame driver ready");

        Ok(Self {
            coordinator,
            locomotion: LocomotionController::new(&config.locomotion, &config.camera),
            arena,
            factory: RigidBodyFactory::new(config.physics.collision_margin),
            launcher: ProjectileLauncher::new(&config.projectile),
            spawner: DropSpawner::new(&config.spawner, seed),
            input,
            hud,
            cooldown: config.projectile.cooldown,
            since_last_shot: 0.0,
            last_wall_ms: None,
            was_locked: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(camera) = self.coordinator.camera_mut() {
            camera.set_aspect(width, height);
        }
    }

    /// Run one frame at wall time `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> Result<StepOutcome, ArenaError> {
        self.apply_gate_transitions();
        self.accumulate_score(now_ms);

        let outcome = self
            .coordinator
            .step(&mut self.locomotion, self.arena.edge_threshold)?;
        if outcome.terminated {
            // Nothing consumes input after the end; keep the queues empty
            let mut input = self.input.borrow_mut();
            input.drain_key_transitions();
            input.consume_look();
            return Ok(outcome);
        }
        self.since_last_shot += outcome.delta;

        let trigger_held = {
            let mut input = self.input.borrow_mut();
            self.locomotion.apply_input(&mut input);
            input.trigger_held
        };
        self.locomotion.update(outcome.delta);
        if let Some(camera) = self.coordinator.camera_mut() {
            self.locomotion.sync_camera(camera);
        }

        let enabled = self.locomotion.enabled();
        if enabled && trigger_held && self.since_last_shot > self.cooldown {
            self.since_last_shot = 0.0;
            self.launcher.fire(&mut self.coordinator, &self.factory)?;
        }

        self.spawner
            .tick(now_ms, enabled, &mut self.coordinator, &self.factory)?;
        Ok(outcome)
    }

    fn apply_gate_transitions(&mut self) {
        if self.coordinator.is_terminated() {
            return;
        }
        let mut input = self.input.borrow_mut();
        let mut hud = self.hud.borrow_mut();

        if input.consume_lock_error() {
            tracing::warn!("pointer lock unavailable, playing without it");
            self.locomotion.set_enabled(true);
            hud.overlay = Overlay::PointerLockError;
        }
        if input.consume_pause() {
            self.locomotion.set_enabled(false);
            hud.overlay = Overlay::Blocker;
        }
        if input.pointer_locked != self.was_locked {
            self.was_locked = input.pointer_locked;
            self.locomotion.set_enabled(input.pointer_locked);
            hud.overlay = if input.pointer_locked {
                Overlay::Playing
            } else {
                Overlay::Blocker
            };
            tracing::debug!(locked = input.pointer_locked, "pointer lock changed");
        }
    }

    fn accumulate_score(&mut self, now_ms: f64) {
        let elapsed = self.last_wall_ms.map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_wall_ms = Some(now_ms);
        if self.locomotion.enabled() {
            let state = self.coordinator.game_state_mut();
            state.accumulate(elapsed);
            self.hud.borrow_mut().score = state.score_text();
        }
    }

    pub fn hud(&self) -> &Rc<RefCell<HudState>> {
        &self.hud
    }

    pub fn input(&self) -> &Rc<RefCell<InputState>> {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::controller::input::{InputEvent, MouseButton};
    use crate::controller::physics::PhysicsSystem;
    use crate::model::{BodyOrigin, Pose, SimulationClock};
    use crate::testing::{CountingRenderer, ManualTime, ScriptedWorld};

    struct Harness<B: PhysicsBackend> {
        driver: FrameDriver<B, CountingRenderer>,
        time: ManualTime,
        terminated: Rc<Cell<u32>>,
    }

    impl<B: PhysicsBackend> Harness<B> {
        fn new(physics: B, config: &ArenaConfig) -> Self {
            let time = ManualTime::new(0.0);
            let clock = SimulationClock::new(Box::new(time.clone()), None);
            let coordinator = SimulationCoordinator::new(physics, CountingRenderer::default(), clock, config);
            let terminated = Rc::new(Cell::new(0));
            let count = terminated.clone();
            let driver = FrameDriver::new(
                coordinator,
                config,
                Rc::new(RefCell::new(InputState::new())),
                Rc::new(RefCell::new(HudState::default())),
                move || count.set(count.get() + 1),
            )
            .unwrap();
            Self { driver, time, terminated }
        }

        fn event(&self, event: InputEvent) {
            self.driver.input().borrow_mut().process_event(&event);
        }

        fn frame(&mut self, ms: f64) -> StepOutcome {
            self.time.advance(ms);
            self.driver.tick(self.time.now()).unwrap()
        }
    }

    fn seeded() -> ArenaConfig {
        let mut config = ArenaConfig::default();
        config.spawner.seed = Some(7);
        config
    }

    #[test]
    fn test_pointer_lock_gates_controls() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.frame(0.0);
        assert!(!h.driver.locomotion.enabled());
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::Blocker);

        h.event(InputEvent::PointerLockChanged { locked: true });
        h.frame(16.0);
        assert!(h.driver.locomotion.enabled());
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::Playing);

        h.event(InputEvent::PointerLockChanged { locked: false });
        h.frame(16.0);
        assert!(!h.driver.locomotion.enabled());
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::Blocker);
    }

    #[test]
    fn test_lock_error_enables_and_escape_pauses() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.event(InputEvent::PointerLockError);
        h.frame(0.0);
        assert!(h.driver.locomotion.enabled());
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::PointerLockError);

        h.event(InputEvent::KeyDown("Escape".into()));
        h.frame(16.0);
        assert!(!h.driver.locomotion.enabled());
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::Blocker);
    }

    #[test]
    fn test_score_only_counts_enabled_time() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.frame(0.0);
        h.frame(500.0);
        assert_eq!(h.driver.coordinator.game_state().elapsed_ms(), 0.0);

        h.event(InputEvent::PointerLockChanged { locked: true });
        h.frame(250.0);
        h.frame(250.0);
        assert_eq!(h.driver.coordinator.game_state().elapsed_ms(), 500.0);
        assert_eq!(h.driver.hud().borrow().score, "0.500");
    }

    #[test]
    fn test_fire_throttle() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.event(InputEvent::PointerLockChanged { locked: true });
        h.event(InputEvent::MouseButton { button: MouseButton::Left, is_down: true });
        h.frame(0.0);

        let projectiles = |h: &Harness<ScriptedWorld>| {
            h.driver
                .coordinator
                .registry()
                .iter()
                .filter(|(_, b)| b.origin == BodyOrigin::Projectile)
                .count()
        };
        // 0.1 s frames: the accumulated delta passes 0.2 s on every third frame
        h.frame(100.0);
        h.frame(100.0);
        assert_eq!(projectiles(&h), 0);
        h.frame(100.0);
        assert_eq!(projectiles(&h), 1);
        h.frame(100.0);
        h.frame(100.0);
        assert_eq!(projectiles(&h), 1);
        h.frame(100.0);
        assert_eq!(projectiles(&h), 2);

        // No firing while disabled
        h.event(InputEvent::PointerLockChanged { locked: false });
        for _ in 0..5 {
            h.frame(100.0);
        }
        assert_eq!(projectiles(&h), 2);
    }

    #[test]
    fn test_termination_updates_hud_once() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.event(InputEvent::PointerLockChanged { locked: true });
        h.frame(0.0);

        // Let the spawner drop a brick, then push it over the edge
        h.frame(2_000.0);
        let (_, brick) = h
            .driver
            .coordinator
            .registry()
            .iter()
            .find(|(_, b)| b.origin == BodyOrigin::Spawned)
            .map(|(id, b)| (id, *b))
            .unwrap();
        let beyond = h.driver.arena.edge_threshold + 1.0;
        h.driver
            .coordinator
            .physics_mut()
            .set_pose(brick.handle, Pose::at(glam::Vec3::new(0.0, 0.0, beyond)));
        h.frame(16.0);
        h.frame(16.0);

        assert!(h.driver.coordinator.is_terminated());
        assert!(!h.driver.locomotion.enabled());
        assert_eq!(h.terminated.get(), 1);
        let score = h.driver.coordinator.game_state().score_text();
        assert_eq!(h.driver.hud().borrow().overlay, Overlay::GameOver { score });

        // Lock changes after the end do not re-enable anything
        h.event(InputEvent::PointerLockChanged { locked: false });
        h.event(InputEvent::PointerLockChanged { locked: true });
        let bodies = h.driver.coordinator.registry().len();
        for _ in 0..200 {
            assert!(h.frame(16.0).terminated);
        }
        assert!(!h.driver.locomotion.enabled());
        assert_eq!(h.driver.coordinator.registry().len(), bodies);
        assert_eq!(h.terminated.get(), 1);
    }

    #[test]
    fn test_input_queues_stay_empty_after_the_end() {
        let mut h = Harness::new(ScriptedWorld::new(), &seeded());
        h.event(InputEvent::PointerLockChanged { locked: true });
        h.frame(0.0);
        h.frame(2_000.0);
        let brick = h
            .driver
            .coordinator
            .registry()
            .iter()
            .find(|(_, b)| b.origin == BodyOrigin::Spawned)
            .map(|(_, b)| b.handle)
            .unwrap();
        let beyond = h.driver.arena.edge_threshold + 1.0;
        h.driver
            .coordinator
            .physics_mut()
            .set_pose(brick, Pose::at(glam::Vec3::new(0.0, 0.0, beyond)));
        h.frame(16.0);
        h.frame(16.0);
        assert!(h.driver.coordinator.is_terminated());

        for _ in 0..50 {
            h.event(InputEvent::KeyDown("a".into()));
            h.event(InputEvent::KeyUp("a".into()));
            h.event(InputEvent::MouseMove { dx: 3.0, dy: 1.0 });
            assert!(h.frame(16.0).terminated);
        }
        let input = h.driver.input().borrow();
        assert!(input.key_presses.is_empty());
        assert!(input.key_releases.is_empty());
        assert_eq!(input.look_delta, (0.0, 0.0));
    }

    #[test]
    fn test_same_inputs_same_world() {
        let run = || {
            let config = seeded();
            let mut h = Harness::new(PhysicsSystem::new(&config.physics), &config);
            h.event(InputEvent::PointerLockChanged { locked: true });
            h.event(InputEvent::MouseButton { button: MouseButton::Left, is_down: true });
            h.frame(0.0);
            for i in 0..600 {
                if i == 300 {
                    h.event(InputEvent::MouseMove { dx: 40.0, dy: -20.0 });
                }
                h.frame(if i % 3 == 0 { 20.0 } else { 15.0 });
            }
            let coordinator = &h.driver.coordinator;
            coordinator
                .registry()
                .iter()
                .map(|(_, body)| coordinator.scene().get(body.node).unwrap().pose())
                .collect::<Vec<_>>()
        };

        let first = run();
        assert!(!first.is_empty());
        assert_eq!(first, run());
    }
}
