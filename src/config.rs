//! Arena Configuration
//!
//! Every tunable constant of the playground lives here. `Default` matches the
//! values the game shipped with; a JSON document can override any subset of
//! fields because every struct is `#[serde(default)]`.

use glam::{Quat, Vec3};
use serde::Deserialize;

use crate::error::ArenaError;

/// Which bodies can end the run by crossing the slope edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationScope {
    /// Every dynamic body, including player-fired projectiles.
    AllDynamic,
    /// Only bodies dropped by the spawner.
    SpawnedOnly,
}

/// How the z threshold is derived from the ground dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRule {
    /// `cos(tilt) * length`
    FullLength,
    /// `cos(tilt) * length / 2`, the actual far edge of the ground.
    HalfLength,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Internal fixed step of the physics world (seconds)
    pub fixed_time_step: f32,
    /// Upper bound of fixed steps taken per `step` call
    pub max_sub_steps: u32,
    pub collision_margin: f32,
    /// Friction coefficient of every collider, combined by multiplication
    pub friction: f32,
    /// Bodies farther than this from the origin on any axis are evicted
    pub world_half_extent: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -16.0, 0.0),
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 10,
            collision_margin: 0.05,
            friction: 0.5,
            world_half_extent: 1000.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    pub width: f32,
    pub thickness: f32,
    pub length: f32,
    pub position: Vec3,
    /// x component of the (unnormalized) tilt quaternion `(tilt, 0, 0, 1)`
    pub tilt: f32,
    pub color: [f32; 4],
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            thickness: 1.0,
            length: 100.0,
            position: Vec3::new(0.0, -0.5, 0.0),
            tilt: 0.15,
            color: [0.72, 0.72, 0.70, 1.0],
        }
    }
}

impl GroundConfig {
    pub fn orientation(&self) -> Quat {
        Quat::from_xyzw(self.tilt, 0.0, 0.0, 1.0).normalize()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    pub size: Vec3,
    /// Walls sit at `x = ±offset_x`
    pub offset_x: f32,
    pub color: [f32; 4],
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            size: Vec3::new(2.0, 50.0, 90.0),
            offset_x: 51.0,
            color: [0.72, 0.72, 0.70, 1.0],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub radius: f32,
    pub mass: f32,
    pub speed: f32,
    /// Added to the ray's near point before spawning
    pub spawn_offset: Vec3,
    /// Minimum accumulated physics time between two shots (seconds)
    pub cooldown: f32,
    pub color: [f32; 4],
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            radius: 1.2,
            mass: 10.0,
            speed: 160.0,
            spawn_offset: Vec3::new(0.0, 0.0, -10.0),
            cooldown: 0.2,
            color: [0.125, 0.125, 0.125, 1.0],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub interval_ms: f64,
    /// Every n-th drop is a sphere, the rest are bricks
    pub sphere_every: u32,
    pub drop_height: f32,
    pub brick_size: f32,
    pub brick_mass: f32,
    pub brick_x_spread: f32,
    pub brick_z: f32,
    pub sphere_radius: f32,
    pub sphere_mass: f32,
    pub sphere_x_spread: f32,
    pub sphere_z_spread: f32,
    pub color: [f32; 4],
    /// Fixed seed for reproducible drops; wall clock when absent
    pub seed: Option<u64>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000.0,
            sphere_every: 5,
            drop_height: 15.0,
            brick_size: 6.0,
            brick_mass: 30.0,
            brick_x_spread: 26.0,
            brick_z: -30.0,
            sphere_radius: 10.0,
            sphere_mass: 60.0,
            sphere_x_spread: 50.0,
            sphere_z_spread: 50.0,
            color: [0.66, 0.33, 0.24, 1.0],
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub look_sensitivity: f32,
    pub damping: f32,
    pub strafe_acceleration: f32,
    pub initial_velocity_x: f32,
    pub strafe_left_key: String,
    pub strafe_right_key: String,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            look_sensitivity: 0.002,
            damping: 10.0,
            strafe_acceleration: 400.0,
            initial_velocity_x: 1.0,
            strafe_left_key: "a".to_string(),
            strafe_right_key: "d".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub start: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            z_near: 0.2,
            z_far: 1000.0,
            start: Vec3::new(0.0, -10.0, 90.0),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub clear_color: [f64; 3],
    pub sun_position: Vec3,
    pub sun_intensity: f32,
    pub ambient: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            // 0xBFD1E5
            clear_color: [0.749, 0.820, 0.898],
            sun_position: Vec3::new(50.0, 100.0, 50.0),
            sun_intensity: 1.0,
            // 0x606060
            ambient: 0.376,
        }
    }
}

/// Central configuration for the whole playground.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub physics: PhysicsConfig,
    pub ground: GroundConfig,
    pub walls: WallConfig,
    pub projectile: ProjectileConfig,
    pub spawner: SpawnerConfig,
    pub locomotion: LocomotionConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub edge_rule: EdgeRule,
    pub termination_scope: TerminationScope,
    /// Oldest tracked body is evicted once this many are alive
    pub max_tracked_bodies: usize,
    /// Upper bound on the sampled frame delta; unclamped when absent
    pub max_frame_delta: Option<f32>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            ground: GroundConfig::default(),
            walls: WallConfig::default(),
            projectile: ProjectileConfig::default(),
            spawner: SpawnerConfig::default(),
            locomotion: LocomotionConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            edge_rule: EdgeRule::HalfLength,
            termination_scope: TerminationScope::SpawnedOnly,
            max_tracked_bodies: 256,
            max_frame_delta: None,
        }
    }
}

impl ArenaConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ArenaError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `SLOPEFALL_CONFIG`, or fall back to defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ArenaError> {
        match std::env::var("SLOPEFALL_CONFIG") {
            Ok(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| ArenaError::ConfigParse {
                    message: format!("{path}: {e}"),
                })?;
                tracing::info!(%path, "loading arena config");
                Self::from_json_str(&json)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// z coordinate past which a tracked body ends the run.
    pub fn edge_threshold(&self) -> f32 {
        let full = self.ground.tilt.cos() * self.ground.length;
        match self.edge_rule {
            EdgeRule::FullLength => full,
            EdgeRule::HalfLength => full / 2.0,
        }
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        let invalid = |reason: &str| {
            Err(ArenaError::InvalidConfiguration {
                reason: reason.to_string(),
            })
        };

        if !(self.physics.fixed_time_step > 0.0) {
            return invalid("physics.fixed_time_step must be positive");
        }
        if self.physics.max_sub_steps == 0 {
            return invalid("physics.max_sub_steps must be at least 1");
        }
        if !(self.physics.collision_margin >= 0.0) {
            return invalid("physics.collision_margin must not be negative");
        }
        if !self.physics.gravity.is_finite() {
            return invalid("physics.gravity must be finite");
        }
        if !(self.physics.world_half_extent > 0.0) {
            return invalid("physics.world_half_extent must be positive");
        }
        if !(self.projectile.mass > 0.0 && self.projectile.radius > 0.0) {
            return invalid("projectile mass and radius must be positive");
        }
        if !(self.spawner.brick_mass > 0.0 && self.spawner.sphere_mass > 0.0) {
            return invalid("spawned bodies must have positive mass");
        }
        if !(self.spawner.interval_ms > 0.0) {
            return invalid("spawner.interval_ms must be positive");
        }
        if self.spawner.sphere_every == 0 {
            return invalid("spawner.sphere_every must be at least 1");
        }
        if self.max_tracked_bodies == 0 {
            return invalid("max_tracked_bodies must be at least 1");
        }
        if let Some(max) = self.max_frame_delta {
            if !(max > 0.0) {
                return invalid("max_frame_delta must be positive");
            }
        }
        Ok(())
    }
}
