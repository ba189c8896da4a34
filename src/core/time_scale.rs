use serde::{Deserialize, Serialize};

use crate::core::{LinearScale, Viewport};
use crate::error::{ChartError, ChartResult};

/// Visible window over logical bar indices (bar 0 is the oldest loaded bar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    #[must_use]
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub fn span(self) -> f64 {
        self.to - self.from
    }

    #[must_use]
    pub fn shifted(self, delta: f64) -> Self {
        Self::new(self.from + delta, self.to + delta)
    }
}

/// Tuning for fitting the visible range to freshly loaded data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScaleTuning {
    /// Bars kept visible when fitting to the latest data.
    pub default_visible_bars: f64,
    /// Empty logical space kept right of the last bar.
    pub right_offset_bars: f64,
    pub min_span_bars: f64,
}

impl Default for TimeScaleTuning {
    fn default() -> Self {
        Self {
            default_visible_bars: 150.0,
            right_offset_bars: 5.0,
            min_span_bars: 2.0,
        }
    }
}

/// Horizontal axis model: logical index ↔ x pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    visible: LogicalRange,
    tuning: TimeScaleTuning,
}

impl TimeScale {
    pub fn new(from: f64, to: f64) -> ChartResult<Self> {
        let mut scale = Self {
            visible: LogicalRange::new(0.0, 1.0),
            tuning: TimeScaleTuning::default(),
        };
        scale.set_visible_range(LogicalRange::new(from, to))?;
        Ok(scale)
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: TimeScaleTuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[must_use]
    pub fn visible_range(self) -> LogicalRange {
        self.visible
    }

    pub fn set_visible_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        if !range.from.is_finite() || !range.to.is_finite() {
            return Err(ChartError::InvalidData(
                "visible logical range must be finite".to_owned(),
            ));
        }
        let (from, to) = if range.from <= range.to {
            (range.from, range.to)
        } else {
            (range.to, range.from)
        };
        let min_span = self.tuning.min_span_bars.max(1e-6);
        self.visible = if to - from < min_span {
            let center = (from + to) / 2.0;
            LogicalRange::new(center - min_span / 2.0, center + min_span / 2.0)
        } else {
            LogicalRange::new(from, to)
        };
        Ok(())
    }

    /// Shows the newest `default_visible_bars` bars with the right offset.
    pub fn fit_latest(&mut self, bar_count: usize) -> ChartResult<()> {
        let last = bar_count.saturating_sub(1) as f64;
        let to = last + self.tuning.right_offset_bars;
        let from = to - self.tuning.default_visible_bars;
        self.set_visible_range(LogicalRange::new(from, to))
    }

    /// Shifts the visible range after `prepended` bars were inserted before
    /// bar 0, so the same bars stay on screen.
    pub fn shift_for_prepended(&mut self, prepended: usize) {
        self.visible = self.visible.shifted(prepended as f64);
    }

    /// Pans by a pixel delta; dragging right (positive) reveals older bars.
    pub fn pan_by_pixels(&mut self, delta_px: f64, viewport: Viewport) -> ChartResult<()> {
        if !delta_px.is_finite() {
            return Err(ChartError::InvalidData(
                "pan delta must be finite".to_owned(),
            ));
        }
        let bars_per_px = self.visible.span() / viewport.width_px().max(1.0);
        self.visible = self.visible.shifted(-delta_px * bars_per_px);
        Ok(())
    }

    /// Zooms around `anchor_px`; `factor > 1.0` zooms in.
    pub fn zoom_around_pixel(
        &mut self,
        factor: f64,
        anchor_px: f64,
        viewport: Viewport,
    ) -> ChartResult<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ChartError::InvalidData(
                "zoom factor must be finite and > 0".to_owned(),
            ));
        }
        let anchor = self.pixel_to_logical(anchor_px, viewport).ok_or_else(|| {
            ChartError::InvalidData("zoom anchor must be finite".to_owned())
        })?;
        let span = self.visible.span();
        let target = (span / factor).max(self.tuning.min_span_bars);
        let left_ratio = (anchor - self.visible.from) / span;
        let from = anchor - left_ratio * target;
        self.set_visible_range(LogicalRange::new(from, from + target))
    }

    #[must_use]
    pub fn logical_to_pixel(self, logical: f64, viewport: Viewport) -> Option<f64> {
        self.linear()?.domain_to_pixel(logical, viewport.width_px())
    }

    #[must_use]
    pub fn pixel_to_logical(self, pixel: f64, viewport: Viewport) -> Option<f64> {
        self.linear()?.pixel_to_domain(pixel, viewport.width_px())
    }

    fn linear(self) -> Option<LinearScale> {
        LinearScale::new(self.visible.from, self.visible.to).ok()
    }
}
