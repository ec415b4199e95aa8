// MODEL: scene graph, bodies, camera and run state
pub mod body;
pub mod camera;
pub mod clock;
pub mod game_state;
pub mod registry;
pub mod scene;

pub use body::{BodyDesc, BodyHandle, BodyOrigin, Material, Pose, Shape};
pub use camera::Camera;
pub use clock::{SimulationClock, TimeSource};
pub use game_state::GameState;
pub use registry::{BodyId, BodyRegistry, DynamicBody};
pub use scene::{NodeId, Scene, SceneNode};
