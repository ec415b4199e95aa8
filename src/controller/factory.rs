use glam::Vec3;

use super::coordinator::SimulationCoordinator;
use super::physics::PhysicsBackend;
use crate::error::ArenaError;
use crate::model::{BodyDesc, BodyHandle, BodyId, BodyOrigin, Material, NodeId, Pose, SceneNode, Shape};
use crate::view::SceneRenderer;

/// A scene node and the physics body driving it. `id` is set for tracked
/// (dynamic) bodies only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPair {
    pub node: NodeId,
    pub handle: BodyHandle,
    pub id: Option<BodyId>,
}

/// Builds box and sphere bodies and registers them with a coordinator.
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyFactory {
    margin: f32,
}

impl RigidBodyFactory {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    /// Box of full edge lengths `dimensions`. `mass == 0` builds a static body.
    pub fn create_box<B: PhysicsBackend, R: SceneRenderer>(
        &self,
        coordinator: &mut SimulationCoordinator<B, R>,
        dimensions: Vec3,
        mass: f32,
        pose: Pose,
        material: Material,
        origin: BodyOrigin,
    ) -> Result<BodyPair, ArenaError> {
        let shape = Shape::cuboid(dimensions)?;
        self.create(coordinator, shape, mass, pose, material, origin)
    }

    pub fn create_sphere<B: PhysicsBackend, R: SceneRenderer>(
        &self,
        coordinator: &mut SimulationCoordinator<B, R>,
        radius: f32,
        mass: f32,
        pose: Pose,
        material: Material,
        origin: BodyOrigin,
    ) -> Result<BodyPair, ArenaError> {
        let shape = Shape::sphere(radius)?;
        self.create(coordinator, shape, mass, pose, material, origin)
    }

    fn create<B: PhysicsBackend, R: SceneRenderer>(
        &self,
        coordinator: &mut SimulationCoordinator<B, R>,
        shape: Shape,
        mass: f32,
        pose: Pose,
        material: Material,
        origin: BodyOrigin,
    ) -> Result<BodyPair, ArenaError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(ArenaError::InvalidMass { mass });
        }
        if !pose.is_finite() {
            return Err(ArenaError::NonFinitePose);
        }
        let pose = Pose::new(pose.position, pose.orientation.normalize());

        let node = SceneNode::new(shape, material, pose).with_shadows(true, true);
        let desc = BodyDesc { shape, mass, pose, margin: self.margin };

        if desc.is_static() {
            let (node, handle) = coordinator.register_static(node, &desc)?;
            Ok(BodyPair { node, handle, id: None })
        } else {
            let (node, handle, id) = coordinator.register_dynamic(node, &desc, origin)?;
            tracing::debug!(?shape, mass, ?origin, "dynamic body created");
            Ok(BodyPair { node, handle, id: Some(id) })
        }
    }
}
