pub mod page;
pub mod segments;
pub mod tracker;

pub use page::ScrollPage;
pub use segments::{map_scroll_value, ScrollPhase, SegmentValues};
pub use tracker::{ScrollEventSource, ScrollPositionTracker};
