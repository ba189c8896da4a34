use crate::error::ChartResult;
use crate::render::{OverlayFrame, Renderer};

/// Render-request coalescer: any number of requests between two animation
/// frames produce a single paint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameScheduler {
    pending: bool,
    requests: u64,
    paints: u64,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the overlay dirty. Returns `true` when this request scheduled a
    /// new frame, `false` when it was folded into the pending one.
    pub fn request(&mut self) -> bool {
        self.requests += 1;
        let scheduled = !self.pending;
        self.pending = true;
        scheduled
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Drops a pending paint, e.g. when the chart is closed.
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Animation-frame callback: builds and paints the overlay only if a
    /// request is pending.
    pub fn on_frame<R, F>(&mut self, renderer: &mut R, build: F) -> ChartResult<bool>
    where
        R: Renderer + ?Sized,
        F: FnOnce() -> OverlayFrame,
    {
        if !self.pending {
            return Ok(false);
        }
        self.pending = false;
        let frame = build();
        renderer.render(&frame)?;
        self.paints += 1;
        Ok(true)
    }

    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    #[must_use]
    pub fn paint_count(&self) -> u64 {
        self.paints
    }
}

#[cfg(test)]
mod tests {
    use super::FrameScheduler;
    use crate::core::Viewport;
    use crate::render::{NullRenderer, OverlayFrame};

    #[test]
    fn coalesces_requests_into_one_paint() {
        let mut scheduler = FrameScheduler::new();
        let mut renderer = NullRenderer::default();
        assert!(scheduler.request());
        assert!(!scheduler.request());
        assert!(!scheduler.request());

        let painted = scheduler
            .on_frame(&mut renderer, || OverlayFrame::new(Viewport::new(10, 10)))
            .expect("paint");
        assert!(painted);
        let painted = scheduler
            .on_frame(&mut renderer, || OverlayFrame::new(Viewport::new(10, 10)))
            .expect("idle frame");
        assert!(!painted);
        assert_eq!(renderer.frames_rendered, 1);
        assert_eq!(scheduler.request_count(), 3);
        assert_eq!(scheduler.paint_count(), 1);
    }
}
