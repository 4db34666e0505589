/// A fixed full-viewport canvas over a tall spacer.
///
/// The spacer is `spacer_pages` viewports tall, so the offset ranges over
/// `[0, (spacer_pages - 1) * viewport_height]`. Like a browser, the page only
/// reports an offset when it actually changes.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    offset: f32,
    viewport_height: f32,
    spacer_pages: f32,
}

impl ScrollPage {
    pub fn new(spacer_pages: f32, viewport_height: f32) -> Self {
        Self {
            offset: 0.0,
            viewport_height: viewport_height.max(0.0),
            spacer_pages: spacer_pages.max(0.0),
        }
    }

    #[cfg(test)]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn document_height(&self) -> f32 {
        self.spacer_pages * self.viewport_height
    }

    pub fn max_offset(&self) -> f32 {
        (self.document_height() - self.viewport_height).max(0.0)
    }

    pub fn scroll_by(&mut self, delta: f32) -> Option<f32> {
        self.scroll_to(self.offset + delta)
    }

    pub fn scroll_to(&mut self, offset: f32) -> Option<f32> {
        let clamped = offset.clamp(0.0, self.max_offset());
        self.apply(clamped)
    }

    pub fn page_down(&mut self) -> Option<f32> {
        self.scroll_by(self.viewport_height)
    }

    pub fn page_up(&mut self) -> Option<f32> {
        self.scroll_by(-self.viewport_height)
    }

    pub fn to_start(&mut self) -> Option<f32> {
        self.scroll_to(0.0)
    }

    pub fn to_end(&mut self) -> Option<f32> {
        self.scroll_to(self.max_offset())
    }

    /// Re-clamps the offset after the viewport changes size.
    ///
    /// A zero-height viewport (a minimized window) is ignored, so the offset
    /// survives until the window is restored.
    pub fn resize(&mut self, viewport_height: f32) -> Option<f32> {
        if viewport_height <= 0.0 {
            return None;
        }

        self.viewport_height = viewport_height;
        self.scroll_to(self.offset)
    }

    fn apply(&mut self, offset: f32) -> Option<f32> {
        if offset == self.offset {
            return None;
        }

        self.offset = offset;
        Some(offset)
    }
}
