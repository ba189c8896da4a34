use serde::{Deserialize, Serialize};

use crate::core::{LinearScale, OhlcvBar, Viewport};
use crate::error::{ChartError, ChartResult};

/// Tuning controls for price-domain autoscaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScaleTuning {
    pub top_padding_ratio: f64,
    pub bottom_padding_ratio: f64,
    pub min_span_absolute: f64,
}

impl Default for PriceScaleTuning {
    fn default() -> Self {
        Self {
            top_padding_ratio: 0.10,
            bottom_padding_ratio: 0.10,
            min_span_absolute: 0.000_001,
        }
    }
}

impl PriceScaleTuning {
    fn validate(self) -> ChartResult<Self> {
        if !self.top_padding_ratio.is_finite()
            || !self.bottom_padding_ratio.is_finite()
            || self.top_padding_ratio < 0.0
            || self.bottom_padding_ratio < 0.0
        {
            return Err(ChartError::InvalidData(
                "price scale padding ratios must be finite and >= 0".to_owned(),
            ));
        }

        if !self.min_span_absolute.is_finite() || self.min_span_absolute <= 0.0 {
            return Err(ChartError::InvalidData(
                "price scale min span must be finite and > 0".to_owned(),
            ));
        }

        Ok(self)
    }
}

/// Linear price axis mapped to a top-down pixel axis (higher price = smaller y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScale {
    min: f64,
    max: f64,
}

impl PriceScale {
    pub fn new(min: f64, max: f64) -> ChartResult<Self> {
        LinearScale::new(min, max)?;
        Ok(Self {
            min: min.min(max),
            max: min.max(max),
        })
    }

    /// Fits the domain to the low/high extent of `bars` plus padding.
    pub fn from_bars(bars: &[OhlcvBar], tuning: PriceScaleTuning) -> ChartResult<Self> {
        let tuning = tuning.validate()?;
        let (low, high) = bars
            .iter()
            .filter(|bar| bar.low.is_finite() && bar.high.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), bar| {
                (lo.min(bar.low), hi.max(bar.high))
            });
        if !low.is_finite() || !high.is_finite() {
            return Err(ChartError::InvalidData(
                "price scale cannot be built from empty data".to_owned(),
            ));
        }

        let span = (high - low).max(tuning.min_span_absolute);
        let center = (high + low) / 2.0;
        let (low, high) = (center - span / 2.0, center + span / 2.0);
        Self::new(
            low - span * tuning.bottom_padding_ratio,
            high + span * tuning.top_padding_ratio,
        )
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.min, self.max)
    }

    #[must_use]
    pub fn price_to_pixel(self, price: f64, viewport: Viewport) -> Option<f64> {
        let height = viewport.height_px();
        let from_bottom = LinearScale::new(self.min, self.max)
            .ok()?
            .domain_to_pixel(price, height)?;
        Some(height - from_bottom)
    }

    #[must_use]
    pub fn pixel_to_price(self, pixel: f64, viewport: Viewport) -> Option<f64> {
        let height = viewport.height_px();
        if !pixel.is_finite() {
            return None;
        }
        LinearScale::new(self.min, self.max)
            .ok()?
            .pixel_to_domain(height - pixel, height)
    }
}

#[cfg(test)]
mod tests {
    use super::{PriceScale, PriceScaleTuning};
    use crate::core::{OhlcvBar, Viewport};

    #[test]
    fn higher_price_maps_higher_on_screen() {
        let viewport = Viewport::new(800, 400);
        let scale = PriceScale::new(0.0, 100.0).expect("scale");
        assert_eq!(scale.price_to_pixel(100.0, viewport), Some(0.0));
        assert_eq!(scale.price_to_pixel(0.0, viewport), Some(400.0));
        assert_eq!(scale.pixel_to_price(100.0, viewport), Some(75.0));
    }

    #[test]
    fn autoscale_pads_extent() {
        let bars = [
            OhlcvBar::raw(1, 100.0, 110.0, 90.0, 105.0, 0.0),
            OhlcvBar::raw(2, 105.0, 120.0, 95.0, 98.0, 0.0),
        ];
        let scale = PriceScale::from_bars(&bars, PriceScaleTuning::default()).expect("scale");
        let (min, max) = scale.domain();
        assert!((min - 87.0).abs() <= 1e-9);
        assert!((max - 123.0).abs() <= 1e-9);
    }
}
