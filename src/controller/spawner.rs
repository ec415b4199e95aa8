use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::coordinator::SimulationCoordinator;
use super::factory::{BodyPair, RigidBodyFactory};
use super::physics::PhysicsBackend;
use crate::config::SpawnerConfig;
use crate::error::ArenaError;
use crate::model::{BodyOrigin, Material, Pose};
use crate::view::SceneRenderer;

/// Seed derived from the wall clock, for runs without a configured seed.
pub fn wall_clock_seed() -> u64 {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            js_sys::Date::now() as u64
        } else {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        }
    }
}

/// Drops bricks onto the top of the slope on a fixed wall-clock cadence, with
/// a large sphere in place of every n-th brick.
pub struct DropSpawner {
    config: SpawnerConfig,
    rng: SmallRng,
    material: Material,
    last_ms: Option<f64>,
    pending_ms: f64,
    drop_count: u32,
}

impl DropSpawner {
    pub fn new(config: &SpawnerConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            rng: SmallRng::seed_from_u64(seed),
            material: Material::solid(config.color),
            last_ms: None,
            pending_ms: 0.0,
            drop_count: 0,
        }
    }

    pub fn drop_count(&self) -> u32 {
        self.drop_count
    }

    /// Run every drop that fell due by `now_ms`. Drops that come due while
    /// `enabled` is false are counted but not spawned.
    pub fn tick<B: PhysicsBackend, R: SceneRenderer>(
        &mut self,
        now_ms: f64,
        enabled: bool,
        coordinator: &mut SimulationCoordinator<B, R>,
        factory: &RigidBodyFactory,
    ) -> Result<Vec<BodyPair>, ArenaError> {
        if let Some(last) = self.last_ms {
            self.pending_ms += (now_ms - last).max(0.0);
        }
        self.last_ms = Some(self.last_ms.map_or(now_ms, |last| last.max(now_ms)));

        let mut spawned = Vec::new();
        while self.pending_ms >= self.config.interval_ms {
            self.pending_ms -= self.config.interval_ms;
            self.drop_count += 1;
            if !enabled {
                continue;
            }
            spawned.push(self.spawn_next(coordinator, factory)?);
        }
        Ok(spawned)
    }

    fn spawn_next<B: PhysicsBackend, R: SceneRenderer>(
        &mut self,
        coordinator: &mut SimulationCoordinator<B, R>,
        factory: &RigidBodyFactory,
    ) -> Result<BodyPair, ArenaError> {
        let c = &self.config;
        if self.drop_count % c.sphere_every != 0 {
            let x = c.brick_x_spread * self.rng.gen::<f32>() * side(&mut self.rng);
            let position = Vec3::new(x, c.drop_height, c.brick_z);
            tracing::debug!(count = self.drop_count, ?position, "dropping brick");
            factory.create_box(
                coordinator,
                Vec3::splat(c.brick_size),
                c.brick_mass,
                Pose::at(position),
                self.material,
                BodyOrigin::Spawned,
            )
        } else {
            let x = c.sphere_x_spread * self.rng.gen::<f32>() * side(&mut self.rng);
            let z = -c.sphere_z_spread * self.rng.gen::<f32>();
            let position = Vec3::new(x, c.drop_height, z);
            tracing::debug!(count = self.drop_count, ?position, "dropping sphere");
            factory.create_sphere(
                coordinator,
                c.sphere_radius,
                c.sphere_mass,
                Pose::at(position),
                self.material,
                BodyOrigin::Spawned,
            )
        }
    }
}

fn side(rng: &mut SmallRng) -> f32 {
    if rng.gen_bool(0.5) {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::model::{Camera, Shape, SimulationClock};
    use crate::testing::{CountingRenderer, ManualTime, ScriptedWorld};

    fn coordinator() -> SimulationCoordinator<ScriptedWorld, CountingRenderer> {
        let clock = SimulationClock::new(Box::new(ManualTime::new(0.0)), None);
        let mut coord =
            SimulationCoordinator::new(ScriptedWorld::new(), CountingRenderer::default(), clock, &ArenaConfig::default());
        coord.set_camera(Camera::new(800, 600, 45.0, 0.2, 1000.0));
        coord
    }

    fn shapes(coord: &SimulationCoordinator<ScriptedWorld, CountingRenderer>, pairs: &[BodyPair]) -> Vec<Shape> {
        pairs
            .iter()
            .map(|pair| coord.physics().body(pair.handle).unwrap().desc.shape)
            .collect()
    }

    #[test]
    fn test_cadence_and_shape_alternation() {
        let mut coord = coordinator();
        let factory = RigidBodyFactory::new(0.05);
        let mut spawner = DropSpawner::new(&SpawnerConfig::default(), 1);

        assert!(spawner.tick(0.0, true, &mut coord, &factory).unwrap().is_empty());
        assert!(spawner.tick(1_999.0, true, &mut coord, &factory).unwrap().is_empty());
        let first = spawner.tick(2_000.0, true, &mut coord, &factory).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(shapes(&coord, &first), vec![Shape::Box { half_extents: Vec3::splat(3.0) }]);

        // A stalled frame catches up on every due drop
        let rest = spawner.tick(10_000.0, true, &mut coord, &factory).unwrap();
        assert_eq!(rest.len(), 4);
        assert_eq!(shapes(&coord, &rest)[3], Shape::Sphere { radius: 10.0 });
        assert_eq!(spawner.drop_count(), 5);
    }

    #[test]
    fn test_positions_within_bounds() {
        let mut coord = coordinator();
        let factory = RigidBodyFactory::new(0.05);
        let mut spawner = DropSpawner::new(&SpawnerConfig::default(), 99);
        spawner.tick(0.0, true, &mut coord, &factory).unwrap();
        let pairs = spawner.tick(100_000.0, true, &mut coord, &factory).unwrap();
        assert_eq!(pairs.len(), 50);

        for pair in &pairs {
            let body = coord.physics().body(pair.handle).unwrap();
            let p = body.desc.pose.position;
            assert_eq!(p.y, 15.0);
            match body.desc.shape {
                Shape::Box { .. } => {
                    assert!(p.x.abs() <= 26.0);
                    assert_eq!(p.z, -30.0);
                }
                Shape::Sphere { .. } => {
                    assert!(p.x.abs() <= 50.0);
                    assert!((-50.0..=0.0).contains(&p.z));
                }
            }
        }
    }

    #[test]
    fn test_disabled_drops_are_skipped_but_counted() {
        let mut coord = coordinator();
        let factory = RigidBodyFactory::new(0.05);
        let mut spawner = DropSpawner::new(&SpawnerConfig::default(), 1);
        spawner.tick(0.0, false, &mut coord, &factory).unwrap();
        assert!(spawner.tick(8_000.0, false, &mut coord, &factory).unwrap().is_empty());
        assert_eq!(spawner.drop_count(), 4);

        // The fifth drop is the sphere
        let pairs = spawner.tick(10_000.0, true, &mut coord, &factory).unwrap();
        assert_eq!(shapes(&coord, &pairs), vec![Shape::Sphere { radius: 10.0 }]);
    }

    #[test]
    fn test_same_seed_same_drops() {
        let run = |seed| {
            let mut coord = coordinator();
            let factory = RigidBodyFactory::new(0.05);
            let mut spawner = DropSpawner::new(&SpawnerConfig::default(), seed);
            spawner.tick(0.0, true, &mut coord, &factory).unwrap();
            let pairs = spawner.tick(20_000.0, true, &mut coord, &factory).unwrap();
            pairs
                .iter()
                .map(|pair| coord.physics().body(pair.handle).unwrap().desc.pose.position)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
