// CONTROLLER: input, simulation coordination and the frame loop
pub mod coordinator;
pub mod factory;
pub mod frame_loop;
pub mod input;
pub mod launcher;
pub mod locomotion;
pub mod physics;
pub mod spawner;

pub use coordinator::{SimulationCoordinator, StepOutcome};
pub use factory::{BodyPair, RigidBodyFactory};
pub use frame_loop::FrameDriver;
pub use input::{InputEvent, InputState, KeyBindings, MouseButton};
pub use launcher::ProjectileLauncher;
pub use locomotion::{ControlGate, LocomotionController};
pub use physics::{PhysicsBackend, PhysicsSystem};
pub use spawner::DropSpawner;
