use glam::{Mat4, Quat, Vec3};

/// Perspective camera. Looks down -z at yaw = pitch = 0, yaw turns about +y
/// and pitch about the local x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32, fov_y_degrees: f32, z_near: f32, z_far: f32) -> Self {
        let mut camera = Self {
            eye: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: fov_y_degrees.to_radians(),
            aspect: 1.0,
            z_near,
            z_far,
        };
        camera.set_aspect(width, height);
        camera
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            -self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.eye).inverse()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Ray through the center of the viewport as `(origin, unit direction)`.
    pub fn center_ray(&self) -> (Vec3, Vec3) {
        (self.eye, self.forward().normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::new(800, 600, 45.0, 0.2, 1000.0);
        assert_close(camera.forward(), Vec3::NEG_Z);
        assert_close(camera.orientation() * Vec3::NEG_Z, Vec3::NEG_Z);
    }

    #[test]
    fn test_forward_matches_orientation() {
        let mut camera = Camera::new(800, 600, 45.0, 0.2, 1000.0);
        camera.yaw = 0.7;
        camera.pitch = -0.3;
        assert_close(camera.forward(), camera.orientation() * Vec3::NEG_Z);

        camera.yaw = FRAC_PI_2;
        camera.pitch = 0.0;
        assert_close(camera.forward(), Vec3::NEG_X);
    }

    #[test]
    fn test_view_maps_eye_to_origin() {
        let mut camera = Camera::new(800, 600, 45.0, 0.2, 1000.0);
        camera.eye = Vec3::new(0.0, -10.0, 90.0);
        camera.yaw = 0.4;
        let p = camera.view().transform_point3(camera.eye);
        assert_close(p, Vec3::ZERO);

        let ahead = camera.view().transform_point3(camera.eye + camera.forward() * 5.0);
        assert_close(ahead, Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let camera = Camera::new(800, 0, 45.0, 0.2, 1000.0);
        assert!(camera.aspect.is_finite());
    }
}
