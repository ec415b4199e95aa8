//! Level geometry: the tilted ground slab and the two side walls.

use glam::{Quat, Vec3};

use crate::config::ArenaConfig;
use crate::controller::factory::{BodyPair, RigidBodyFactory};
use crate::controller::{PhysicsBackend, SimulationCoordinator};
use crate::error::ArenaError;
use crate::model::{BodyOrigin, Camera, Material, Pose};
use crate::view::SceneRenderer;

/// Static bodies of the level and the derived loss threshold.
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub ground: BodyPair,
    pub walls: [BodyPair; 2],
    pub edge_threshold: f32,
}

pub fn build<B: PhysicsBackend, R: SceneRenderer>(
    coordinator: &mut SimulationCoordinator<B, R>,
    config: &ArenaConfig,
) -> Result<Arena, ArenaError> {
    let factory = RigidBodyFactory::new(config.physics.collision_margin);
    let g = &config.ground;

    let ground = factory.create_box(
        coordinator,
        Vec3::new(g.width, g.thickness, g.length),
        0.0,
        Pose::new(g.position, g.orientation()),
        Material::solid(g.color),
        BodyOrigin::Scenery,
    )?;

    let w = &config.walls;
    let mut wall = |x: f32| {
        factory.create_box(
            coordinator,
            w.size,
            0.0,
            Pose::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY),
            Material::solid(w.color),
            BodyOrigin::Scenery,
        )
    };
    let walls = [wall(-w.offset_x)?, wall(w.offset_x)?];

    let edge_threshold = config.edge_threshold();
    tracing::info!(edge_threshold, tilt = g.tilt, "arena built");
    Ok(Arena { ground, walls, edge_threshold })
}

/// Player camera at the rig start position.
pub fn camera(config: &ArenaConfig, width: u32, height: u32) -> Camera {
    let c = &config.camera;
    let mut camera = Camera::new(width, height, c.fov_y_degrees, c.z_near, c.z_far);
    camera.eye = c.start;
    camera
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Shape, SimulationClock};
    use crate::testing::{CountingRenderer, ManualTime, ScriptedWorld};

    #[test]
    fn test_arena_is_static() {
        let config = ArenaConfig::default();
        let clock = SimulationClock::new(Box::new(ManualTime::new(0.0)), None);
        let mut coord = SimulationCoordinator::new(ScriptedWorld::new(), CountingRenderer::default(), clock, &config);
        let arena = build(&mut coord, &config).unwrap();

        assert!(coord.registry().is_empty());
        assert_eq!(coord.scene().len(), 3);
        assert_eq!(coord.physics().body_count(), 3);
        assert!((arena.edge_threshold - 0.15f32.cos() * 50.0).abs() < 1e-4);

        let ground = coord.physics().body(arena.ground.handle).unwrap();
        assert_eq!(ground.desc.mass, 0.0);
        assert_eq!(ground.desc.shape, Shape::Box { half_extents: Vec3::new(50.0, 0.5, 50.0) });
        assert!(ground.desc.pose.orientation.x > 0.14);

        let left = coord.physics().body(arena.walls[0].handle).unwrap();
        let right = coord.physics().body(arena.walls[1].handle).unwrap();
        assert_eq!(left.desc.pose.position.x, -51.0);
        assert_eq!(right.desc.pose.position.x, 51.0);
    }

    #[test]
    fn test_camera_starts_at_rig() {
        let camera = camera(&ArenaConfig::default(), 1280, 720);
        assert_eq!(camera.eye, Vec3::new(0.0, -10.0, 90.0));
        assert!((camera.fov_y - 45f32.to_radians()).abs() < 1e-6);
    }
}
