use crate::render_loop::FrameContext;
use crate::scene_graph::{NodeUpdater, Transform};

/// Y rotation added to the lettering group per rendered frame.
pub const MODEL_SPIN_PER_FRAME: f32 = 0.02;

/// Spins its node about y by a fixed step per frame.
///
/// The step ignores `frame.delta`, so the apparent speed follows the host's
/// frame rate. No wraparound: the angle keeps growing.
#[derive(Debug, Clone, Copy)]
pub struct ModelAnimator {
    increment: f32,
}

impl ModelAnimator {
    pub fn new(increment: f32) -> Self {
        Self { increment }
    }

    pub fn spin() -> Self {
        Self::new(MODEL_SPIN_PER_FRAME)
    }

    /// Zero step. Keeps a static node on the same update path as the model.
    pub fn inert() -> Self {
        Self::new(0.0)
    }
}

impl NodeUpdater for ModelAnimator {
    fn update(&mut self, transform: &mut Transform, _frame: &FrameContext) {
        let mut rotation = transform.rotation();
        rotation.y += self.increment;
        transform.set_rotation(rotation);
    }
}
