use glam::{Quat, Vec3};

use crate::error::ArenaError;

/// Collision and render primitive of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl Shape {
    /// Box sized by its full edge lengths.
    pub fn cuboid(dimensions: Vec3) -> Result<Self, ArenaError> {
        if !dimensions.is_finite() || dimensions.min_element() <= 0.0 {
            return Err(ArenaError::DegenerateShape {
                reason: "box dimensions must be positive and finite",
            });
        }
        Ok(Shape::Box { half_extents: dimensions * 0.5 })
    }

    pub fn sphere(radius: f32) -> Result<Self, ArenaError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ArenaError::DegenerateShape {
                reason: "sphere radius must be positive and finite",
            });
        }
        Ok(Shape::Sphere { radius })
    }

    /// Scale applied to the unit render mesh of this shape.
    pub fn render_scale(&self) -> Vec3 {
        match *self {
            Shape::Box { half_extents } => half_extents * 2.0,
            Shape::Sphere { radius } => Vec3::splat(radius),
        }
    }

    /// Local inertia diagonal for a solid body of the given mass.
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        match *self {
            Shape::Box { half_extents } => {
                let e = half_extents * 2.0;
                Vec3::new(
                    e.y * e.y + e.z * e.z,
                    e.x * e.x + e.z * e.z,
                    e.x * e.x + e.y * e.y,
                ) * (mass / 12.0)
            }
            Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
        }
    }
}

/// World position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 4],
}

impl Material {
    pub const fn solid(color: [f32; 4]) -> Self {
        Self { color }
    }
}

/// Who created a body; decides termination-set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOrigin {
    /// Ground, walls and other fixed level geometry
    Scenery,
    /// Dropped by the spawner onto the slope
    Spawned,
    /// Fired by the player
    Projectile,
}

/// Everything the physics backend needs to construct a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub mass: f32,
    pub pose: Pose,
    pub margin: f32,
}

impl BodyDesc {
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }
}

/// Opaque body handle issued by a physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_uses_half_extents() {
        let shape = Shape::cuboid(Vec3::new(6.0, 4.0, 2.0)).unwrap();
        assert_eq!(shape, Shape::Box { half_extents: Vec3::new(3.0, 2.0, 1.0) });
        assert_eq!(shape.render_scale(), Vec3::new(6.0, 4.0, 2.0));
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        assert!(Shape::cuboid(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(Shape::cuboid(Vec3::new(1.0, f32::NAN, 1.0)).is_err());
        assert!(Shape::sphere(-2.0).is_err());
        assert!(Shape::sphere(f32::INFINITY).is_err());
    }

    #[test]
    fn test_cube_inertia() {
        // Solid cube: m * s^2 / 6 on every axis
        let inertia = Shape::cuboid(Vec3::splat(6.0)).unwrap().local_inertia(30.0);
        assert!((inertia.x - 180.0).abs() < 1e-3);
        assert_eq!(inertia.x, inertia.y);
        assert_eq!(inertia.y, inertia.z);
    }
}
