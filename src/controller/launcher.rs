use glam::{Quat, Vec3};

use super::coordinator::SimulationCoordinator;
use super::factory::{BodyPair, RigidBodyFactory};
use super::physics::PhysicsBackend;
use crate::config::ProjectileConfig;
use crate::error::ArenaError;
use crate::model::{BodyOrigin, Material, Pose};
use crate::view::SceneRenderer;

/// Fires spheres from the camera through the center of the screen.
#[derive(Debug, Clone)]
pub struct ProjectileLauncher {
    radius: f32,
    mass: f32,
    speed: f32,
    spawn_offset: Vec3,
    material: Material,
}

impl ProjectileLauncher {
    pub fn new(config: &ProjectileConfig) -> Self {
        Self {
            radius: config.radius,
            mass: config.mass,
            speed: config.speed,
            spawn_offset: config.spawn_offset,
            material: Material::solid(config.color),
        }
    }

    /// Spawn one projectile. Rate limiting is up to the caller.
    pub fn fire<B: PhysicsBackend, R: SceneRenderer>(
        &self,
        coordinator: &mut SimulationCoordinator<B, R>,
        factory: &RigidBodyFactory,
    ) -> Result<BodyPair, ArenaError> {
        let (origin, direction) = coordinator
            .camera()
            .ok_or(ArenaError::MissingCamera)?
            .center_ray();
        let position = origin + direction + self.spawn_offset;

        let pair = factory.create_sphere(
            coordinator,
            self.radius,
            self.mass,
            Pose::new(position, Quat::IDENTITY),
            self.material,
            BodyOrigin::Projectile,
        )?;
        if let Some(id) = pair.id {
            coordinator.set_linear_velocity(id, direction * self.speed)?;
        }
        tracing::debug!(?position, ?direction, "projectile fired");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::model::{Camera, Shape, SimulationClock};
    use crate::testing::{CountingRenderer, ManualTime, ScriptedWorld};

    fn coordinator(camera: Option<Camera>) -> SimulationCoordinator<ScriptedWorld, CountingRenderer> {
        let clock = SimulationClock::new(Box::new(ManualTime::new(0.0)), None);
        let mut coord =
            SimulationCoordinator::new(ScriptedWorld::new(), CountingRenderer::default(), clock, &ArenaConfig::default());
        if let Some(camera) = camera {
            coord.set_camera(camera);
        }
        coord
    }

    #[test]
    fn test_fire_from_origin_looking_down_negative_z() {
        let mut coord = coordinator(Some(Camera::new(800, 600, 45.0, 0.2, 1000.0)));
        let launcher = ProjectileLauncher::new(&ProjectileConfig::default());
        let factory = RigidBodyFactory::new(0.05);

        let pair = launcher.fire(&mut coord, &factory).unwrap();
        let velocity = coord.physics().linear_velocity(pair.handle).unwrap();
        assert!((velocity - Vec3::new(0.0, 0.0, -160.0)).length() < 1e-4);

        let body = coord.physics().body(pair.handle).unwrap();
        assert_eq!(body.desc.shape, Shape::Sphere { radius: 1.2 });
        assert_eq!(body.desc.mass, 10.0);
        // origin + direction + offset
        assert!((body.desc.pose.position - Vec3::new(0.0, 0.0, -11.0)).length() < 1e-5);
        assert_eq!(
            coord.registry().get(pair.id.unwrap()).map(|b| b.origin),
            Some(BodyOrigin::Projectile)
        );
    }

    #[test]
    fn test_fire_follows_camera_direction() {
        let mut camera = Camera::new(800, 600, 45.0, 0.2, 1000.0);
        camera.eye = Vec3::new(0.0, -10.0, 90.0);
        camera.yaw = std::f32::consts::FRAC_PI_2;
        let mut coord = coordinator(Some(camera));
        let launcher = ProjectileLauncher::new(&ProjectileConfig::default());

        let pair = launcher.fire(&mut coord, &RigidBodyFactory::new(0.05)).unwrap();
        let velocity = coord.physics().linear_velocity(pair.handle).unwrap();
        assert!((velocity - Vec3::new(-160.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_fire_without_camera() {
        let mut coord = coordinator(None);
        let launcher = ProjectileLauncher::new(&ProjectileConfig::default());
        assert_eq!(
            launcher.fire(&mut coord, &RigidBodyFactory::new(0.05)),
            Err(ArenaError::MissingCamera)
        );
    }
}
