use crate::error::{ChartError, ChartResult};

/// Affine mapping between a finite domain and a pixel extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> ChartResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
        })
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    /// Maps `value` into `[0, extent_px]` (values outside the domain map
    /// outside the extent).
    #[must_use]
    pub fn domain_to_pixel(self, value: f64, extent_px: f64) -> Option<f64> {
        if !value.is_finite() || !extent_px.is_finite() || extent_px <= 0.0 {
            return None;
        }
        let span = self.domain_end - self.domain_start;
        Some((value - self.domain_start) / span * extent_px)
    }

    #[must_use]
    pub fn pixel_to_domain(self, pixel: f64, extent_px: f64) -> Option<f64> {
        if !pixel.is_finite() || !extent_px.is_finite() || extent_px <= 0.0 {
            return None;
        }
        let span = self.domain_end - self.domain_start;
        Some(self.domain_start + pixel / extent_px * span)
    }
}

#[cfg(test)]
mod tests {
    use super::LinearScale;

    #[test]
    fn rejects_degenerate_domain() {
        assert!(LinearScale::new(5.0, 5.0).is_err());
        assert!(LinearScale::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn maps_both_directions() {
        let scale = LinearScale::new(10.0, 20.0).expect("scale");
        let px = scale.domain_to_pixel(15.0, 200.0).expect("px");
        assert!((px - 100.0).abs() <= 1e-9);
        let back = scale.pixel_to_domain(px, 200.0).expect("domain");
        assert!((back - 15.0).abs() <= 1e-9);
        assert!(scale.domain_to_pixel(15.0, 0.0).is_none());
    }
}
