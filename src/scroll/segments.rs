/// End of the dolly-in phase. Below this the camera moves with the scroll.
pub const DOLLY_END: f32 = 450.0;

/// Start of the pan phase. Between `DOLLY_END` and this the camera holds.
pub const PAN_START: f32 = 600.0;

// Reported as section2 for the whole pan phase. This is not
// `PAN_START - DOLLY_END`, so section2 jumps from ~150 to 600 at the boundary.
const PAN_SECTION2: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    DollyIn,
    Hold,
    Pan,
}

impl ScrollPhase {
    pub fn of(scroll: f32) -> Self {
        if scroll < DOLLY_END {
            ScrollPhase::DollyIn
        } else if scroll < PAN_START {
            ScrollPhase::Hold
        } else {
            ScrollPhase::Pan
        }
    }
}

/// Per-phase progress derived from a scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentValues {
    pub section1: f32,
    pub section2: f32,
    pub section3: f32,
}

impl SegmentValues {
    pub fn new(section1: f32, section2: f32, section3: f32) -> Self {
        Self {
            section1,
            section2,
            section3,
        }
    }
}

/// Splits a scroll offset into the dolly, hold and pan sections.
///
/// Input is not validated. Negative offsets land in the dolly branch with a
/// negative `section1`; NaN fails both comparisons and lands in the pan
/// branch with a NaN `section3`.
pub fn map_scroll_value(scroll: f32) -> SegmentValues {
    match ScrollPhase::of(scroll) {
        ScrollPhase::DollyIn => SegmentValues::new(scroll, 0.0, 0.0),
        ScrollPhase::Hold => SegmentValues::new(DOLLY_END, scroll - DOLLY_END, 0.0),
        ScrollPhase::Pan => SegmentValues::new(DOLLY_END, PAN_SECTION2, scroll - PAN_START),
    }
}
