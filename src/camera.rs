use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_y: 22.9,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect_ratio, self.near, self.far)
    }
}

/// A camera as placed in the world for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub camera: PerspectiveCamera,
    pub world: Mat4,
}

impl CameraFrame {
    pub fn position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    pub fn view(&self) -> Mat4 {
        self.world.inverse()
    }

    pub fn view_proj(&self, aspect_ratio: f32) -> Mat4 {
        self.camera.projection(aspect_ratio) * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_looks_down_negative_z() {
        let frame = CameraFrame {
            camera: PerspectiveCamera::default(),
            world: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
        };

        let clip = frame.view_proj(1.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;

        assert_eq!(frame.position(), Vec3::new(0.0, 0.0, 5.0));
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
