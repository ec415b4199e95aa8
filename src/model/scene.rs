use glam::{Mat4, Quat, Vec3};
use slotmap::{new_key_type, SlotMap};

use super::body::{Material, Pose, Shape};

new_key_type! {
    /// Handle to a node in the [`Scene`].
    pub struct NodeId;
}

/// A renderable object: one primitive mesh with a pose and render flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub shape: Shape,
    pub material: Material,
    pub position: Vec3,
    pub orientation: Quat,
    /// Carried for a shadow-map pass; the current renderer draws no shadows.
    pub cast_shadow: bool,
    /// Receivers get the directional sun term; others are shaded flat.
    pub receive_shadow: bool,
}

impl SceneNode {
    pub fn new(shape: Shape, material: Material, pose: Pose) -> Self {
        Self {
            shape,
            material,
            position: pose.position,
            orientation: pose.orientation,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    /// Overwrite the pose verbatim (no interpolation)
    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.orientation = pose.orientation;
    }

    /// Transform of the unit mesh into world space.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.shape.render_scale(), self.orientation, self.position)
    }
}

/// The renderable scene graph. Flat: the arena has no node hierarchy beyond
/// the camera rig, which is held by the locomotion controller.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self { nodes: SlotMap::with_key() }
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
