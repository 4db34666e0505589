use glam::Vec3;

use crate::render_loop::FrameContext;
use crate::scene_graph::{NodeUpdater, Transform};
use crate::scroll::SegmentValues;

pub const BASE_DISTANCE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub position_z: f32,
    pub rotation_y: f32,
}

impl CameraTransform {
    pub fn from_segments(segments: &SegmentValues) -> Self {
        Self {
            position_z: BASE_DISTANCE + segments.section1 / 100.0,
            rotation_y: segments.section3 / 10000.0,
        }
    }
}

/// Moves the camera group along z during the dolly phase and turns it about y
/// during the pan phase. Snaps every frame, no smoothing.
#[derive(Debug, Default)]
pub struct CameraRig;

impl NodeUpdater for CameraRig {
    fn update(&mut self, transform: &mut Transform, frame: &FrameContext) {
        let camera = CameraTransform::from_segments(&frame.segments);

        transform.set_transform(
            Vec3::new(0.0, 0.0, camera.position_z),
            Vec3::new(0.0, camera.rotation_y, 0.0),
            1.0,
        );
    }
}
