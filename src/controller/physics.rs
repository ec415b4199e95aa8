use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use crate::config::PhysicsConfig;
use crate::model::{BodyDesc, BodyHandle, Pose, Shape};

/// Rigid-body world as seen by the coordinator.
pub trait PhysicsBackend {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle;
    /// Returns `false` if the handle was already gone.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    /// Advance by `dt` seconds in fixed steps; returns the steps taken.
    fn advance(&mut self, dt: f32, fixed_step: f32, max_sub_steps: u32) -> u32;
    /// Current pose, or `None` when not yet available.
    fn motion_state(&self, handle: BodyHandle) -> Option<Pose>;
    fn disable_deactivation(&mut self, handle: BodyHandle);
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);
    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3>;
    fn body_count(&self) -> usize;
    /// Total fixed steps taken since creation
    fn steps_taken(&self) -> u64;
}

/// rapier3d world stepped with a fixed-step accumulator.
///
/// At most `max_sub_steps` steps run per `advance`; time beyond that is
/// dropped rather than carried over, so a long stall never causes a burst of
/// catch-up steps on the next frame.
pub struct PhysicsSystem {
    gravity: Vector<Real>,
    friction: f32,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    accumulator: f32,
    steps: u64,
}

impl PhysicsSystem {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = config.fixed_time_step;
        Self {
            gravity: vector![config.gravity.x, config.gravity.y, config.gravity.z],
            friction: config.friction,
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            accumulator: 0.0,
            steps: 0,
        }
    }

    fn collider(&self, desc: &BodyDesc) -> ColliderBuilder {
        let builder = match desc.shape {
            Shape::Box { half_extents: h } => {
                // The margin becomes the border radius, keeping the outer size
                let m = desc.margin;
                if m > 0.0 && h.min_element() > m {
                    ColliderBuilder::round_cuboid(h.x - m, h.y - m, h.z - m, m)
                } else {
                    ColliderBuilder::cuboid(h.x, h.y, h.z)
                }
            }
            Shape::Sphere { radius } => ColliderBuilder::ball(radius),
        };
        builder
            .friction(self.friction)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
    }

    fn step_once(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.steps += 1;
    }
}

fn raw(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle { index, generation }
}

fn rapier(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.index, handle.generation)
}

fn isometry(pose: &Pose) -> Isometry<Real> {
    let p = pose.position;
    let q = pose.orientation;
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z));
    Isometry::from_parts(Translation3::new(p.x, p.y, p.z), rotation)
}

impl PhysicsBackend for PhysicsSystem {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let mut builder = builder.position(isometry(&desc.pose));
        let mut collider = self.collider(desc);
        if !desc.is_static() {
            // Mass and inertia live on the body; the collider only adds contact
            let i = desc.shape.local_inertia(desc.mass);
            builder = builder.additional_mass_properties(MassProperties::new(
                point![0.0, 0.0, 0.0],
                desc.mass,
                vector![i.x, i.y, i.z],
            ));
            collider = collider.density(0.0);
        }
        let handle = self.bodies.insert(builder.build());
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        raw(handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies
            .remove(
                rapier(handle),
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn advance(&mut self, dt: f32, fixed_step: f32, max_sub_steps: u32) -> u32 {
        if !(dt > 0.0) || !(fixed_step > 0.0) {
            return 0;
        }
        self.params.dt = fixed_step;
        self.accumulator += dt;

        let due = (self.accumulator / fixed_step).floor();
        self.accumulator -= due * fixed_step;
        let count = (due as u32).min(max_sub_steps);
        for _ in 0..count {
            self.step_once();
        }
        if count > 0 {
            tracing::trace!(dt, steps = count, "physics advanced");
        }
        count
    }

    fn motion_state(&self, handle: BodyHandle) -> Option<Pose> {
        let body = self.bodies.get(rapier(handle))?;
        let iso = body.position();
        let t = iso.translation.vector;
        let q = iso.rotation.quaternion();
        Some(Pose::new(
            Vec3::new(t.x, t.y, t.z),
            Quat::from_xyzw(q.i, q.j, q.k, q.w),
        ))
    }

    fn disable_deactivation(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.get_mut(rapier(handle)) {
            *body.activation_mut() = RigidBodyActivation::cannot_sleep();
            body.wake_up(true);
        }
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(rapier(handle)) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(rapier(handle)).map(|body| {
            let v = body.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn steps_taken(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsSystem {
        PhysicsSystem::new(&PhysicsConfig::default())
    }

    fn ball(mass: f32, position: Vec3) -> BodyDesc {
        BodyDesc {
            shape: Shape::Sphere { radius: 1.0 },
            mass,
            pose: Pose::at(position),
            margin: 0.05,
        }
    }

    #[test]
    fn test_fixed_step_accumulator() {
        let mut physics = world();
        let step = 1.0 / 60.0;

        assert_eq!(physics.advance(0.01, step, 10), 0);
        assert_eq!(physics.advance(0.01, step, 10), 1);
        assert_eq!(physics.steps_taken(), 1);

        // A long stall is capped and the remainder dropped
        assert_eq!(physics.advance(1.0, step, 10), 10);
        assert_eq!(physics.advance(0.0, step, 10), 0);
        assert_eq!(physics.steps_taken(), 11);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut physics = world();
        let handle = physics.add_body(&ball(10.0, Vec3::new(0.0, 20.0, 0.0)));
        physics.disable_deactivation(handle);

        physics.advance(0.5, 1.0 / 60.0, 60);
        let pose = physics.motion_state(handle).unwrap();
        assert!(pose.position.y < 20.0);
        let v = physics.linear_velocity(handle).unwrap();
        // Gravity is -16
        assert!((v.y + 8.0).abs() < 0.5, "vy = {}", v.y);
    }

    #[test]
    fn test_static_body_stays_put() {
        let mut physics = world();
        let handle = physics.add_body(&ball(0.0, Vec3::new(3.0, 4.0, 5.0)));
        physics.advance(1.0, 1.0 / 60.0, 60);
        assert_eq!(physics.motion_state(handle).unwrap().position, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_velocity_and_removal() {
        let mut physics = world();
        let handle = physics.add_body(&ball(1.0, Vec3::ZERO));
        physics.set_linear_velocity(handle, Vec3::new(0.0, 0.0, -160.0));
        assert_eq!(physics.linear_velocity(handle), Some(Vec3::new(0.0, 0.0, -160.0)));

        assert_eq!(physics.body_count(), 1);
        assert!(physics.remove_body(handle));
        assert!(!physics.remove_body(handle));
        assert_eq!(physics.motion_state(handle), None);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_pose_round_trips_orientation() {
        let mut physics = world();
        let q = Quat::from_xyzw(0.15, 0.0, 0.0, 1.0).normalize();
        let mut desc = ball(0.0, Vec3::new(0.0, -0.5, 0.0));
        desc.pose.orientation = q;
        let handle = physics.add_body(&desc);
        let pose = physics.motion_state(handle).unwrap();
        assert!(pose.orientation.angle_between(q) < 1e-5);
    }

    #[test]
    fn test_resting_body_never_sleeps() {
        let mut physics = world();
        let slab = BodyDesc {
            shape: Shape::cuboid(Vec3::new(40.0, 1.0, 40.0)).unwrap(),
            mass: 0.0,
            pose: Pose::at(Vec3::new(0.0, -0.5, 0.0)),
            margin: 0.05,
        };
        physics.add_body(&slab);
        let handle = physics.add_body(&ball(5.0, Vec3::new(0.0, 1.0, 0.0)));
        physics.disable_deactivation(handle);

        // Five seconds at rest, well past rapier's sleep delay
        for _ in 0..300 {
            physics.advance(1.0 / 60.0, 1.0 / 60.0, 1);
        }
        let body = &physics.bodies[rapier(handle)];
        assert!(body.linvel().norm() < 0.1, "still moving: {}", body.linvel());
        assert!(!body.is_sleeping());
    }

    #[test]
    fn test_mass_comes_from_desc() {
        let mut physics = world();
        let handle = physics.add_body(&ball(10.0, Vec3::new(0.0, 50.0, 0.0)));
        physics.advance(1.0 / 60.0, 1.0 / 60.0, 1);
        let body = &physics.bodies[rapier(handle)];
        assert!((body.mass() - 10.0).abs() < 1e-4);
    }
}
