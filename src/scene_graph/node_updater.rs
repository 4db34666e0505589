use crate::render_loop::FrameContext;
use crate::scene_graph::transform::Transform;

/// Per-frame writer of a single node's transform.
///
/// The render loop calls `update` once per tick for every registered updater.
/// An updater is the only code that mutates its node's transform.
pub trait NodeUpdater {
    fn update(&mut self, transform: &mut Transform, frame: &FrameContext);
}

impl<F> NodeUpdater for F
where
    F: FnMut(&mut Transform, &FrameContext),
{
    fn update(&mut self, transform: &mut Transform, frame: &FrameContext) {
        self(transform, frame)
    }
}
