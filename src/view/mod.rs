// VIEW: rendering and graphics
pub mod gpu_init;
pub mod render;

pub use gpu_init::GpuContext;
pub use render::{GpuRenderer, InstanceRaw};

use crate::model::{Camera, Scene};

/// Draws the scene graph from a camera. Called once per non-terminating frame.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera);
}
