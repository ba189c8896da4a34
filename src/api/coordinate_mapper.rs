use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::core::{OhlcvBar, PriceScale, ScreenPoint, TimeIndex, TimeScale, Viewport};
use crate::drawing::{DrawingPoint, PointProjector, SceneContext};

/// Native conversions offered by the charting surface underneath the
/// overlay. Every method returns `None` when the surface cannot resolve the
/// input.
pub trait ChartSurface {
    fn viewport(&self) -> Viewport;
    fn time_to_x(&self, time: i64) -> Option<f64>;
    fn x_to_time(&self, x: f64) -> Option<i64>;
    fn price_to_y(&self, price: f64) -> Option<f64>;
    fn y_to_price(&self, y: f64) -> Option<f64>;
    fn logical_to_x(&self, logical: f64) -> Option<f64>;
    fn x_to_logical(&self, x: f64) -> Option<f64>;
}

/// Headless surface over the crate's own scales.
///
/// Like a real charting library, its native time conversions only resolve
/// times inside the loaded series.
#[derive(Debug, Clone, Copy)]
pub struct ViewportSurface<'a> {
    pub viewport: Viewport,
    pub time_scale: TimeScale,
    pub price_scale: PriceScale,
    pub index: &'a TimeIndex,
}

impl<'a> ViewportSurface<'a> {
    #[must_use]
    pub fn new(
        viewport: Viewport,
        time_scale: TimeScale,
        price_scale: PriceScale,
        index: &'a TimeIndex,
    ) -> Self {
        Self {
            viewport,
            time_scale,
            price_scale,
            index,
        }
    }

    fn loaded_logical_span(&self) -> Option<(f64, f64)> {
        (!self.index.is_empty()).then(|| (0.0, (self.index.len() - 1) as f64))
    }
}

impl ChartSurface for ViewportSurface<'_> {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn time_to_x(&self, time: i64) -> Option<f64> {
        let (first, last) = (self.index.first_time()?, self.index.last_time()?);
        if time < first || time > last {
            return None;
        }
        let logical = self.index.logical_for_time(time)?;
        self.logical_to_x(logical)
    }

    fn x_to_time(&self, x: f64) -> Option<i64> {
        let logical = self.x_to_logical(x)?;
        let (min, max) = self.loaded_logical_span()?;
        if logical < min || logical > max {
            return None;
        }
        self.index.time_for_logical(logical)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        self.price_scale.price_to_pixel(price, self.viewport)
    }

    fn y_to_price(&self, y: f64) -> Option<f64> {
        self.price_scale.pixel_to_price(y, self.viewport)
    }

    fn logical_to_x(&self, logical: f64) -> Option<f64> {
        self.time_scale.logical_to_pixel(logical, self.viewport)
    }

    fn x_to_logical(&self, x: f64) -> Option<f64> {
        self.time_scale.pixel_to_logical(x, self.viewport)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnetOptions {
    pub enabled: bool,
    pub tolerance_px: f64,
}

impl Default for MagnetOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            tolerance_px: 30.0,
        }
    }
}

/// Converts drawing anchors to pixels and back, falling back to the time
/// index when the native surface cannot resolve a time.
pub struct CoordinateMapper<'a, S: ChartSurface + ?Sized> {
    surface: &'a S,
    index: &'a TimeIndex,
    bars: &'a [OhlcvBar],
    magnet: MagnetOptions,
}

impl<'a, S: ChartSurface + ?Sized> CoordinateMapper<'a, S> {
    #[must_use]
    pub fn new(surface: &'a S, index: &'a TimeIndex, bars: &'a [OhlcvBar]) -> Self {
        Self {
            surface,
            index,
            bars,
            magnet: MagnetOptions::default(),
        }
    }

    #[must_use]
    pub fn with_magnet(mut self, magnet: MagnetOptions) -> Self {
        self.magnet = magnet;
        self
    }

    #[must_use]
    pub fn magnet(&self) -> MagnetOptions {
        self.magnet
    }

    #[must_use]
    pub fn scene_context(&self) -> SceneContext {
        SceneContext {
            viewport: self.surface.viewport(),
            bar_duration_ms: self.index.bar_duration_ms(),
        }
    }

    /// Pixel position of `point`, or [`ScreenPoint::OFF_SCREEN`].
    ///
    /// x resolves natively first, then by exact index lookup, then by
    /// extrapolating whole bar durations past the loaded edge.
    #[must_use]
    pub fn point_to_screen(&self, point: DrawingPoint) -> ScreenPoint {
        let Some(y) = self.surface.price_to_y(point.price) else {
            return ScreenPoint::OFF_SCREEN;
        };
        let x = self
            .surface
            .time_to_x(point.time)
            .or_else(|| {
                self.index
                    .index_of(point.time)
                    .and_then(|i| self.surface.logical_to_x(i as f64))
            })
            .or_else(|| {
                self.index
                    .logical_for_time(point.time)
                    .and_then(|logical| self.surface.logical_to_x(logical))
            });
        match x {
            Some(x) if x.is_finite() && y.is_finite() => ScreenPoint::new(x, y),
            _ => ScreenPoint::OFF_SCREEN,
        }
    }

    /// Anchor under `pos`. With `magnet` (and magnet mode enabled) the result
    /// snaps to the closest OHLC value of the candle under the cursor when it
    /// lies within the magnet tolerance.
    #[must_use]
    pub fn screen_to_point(&self, pos: ScreenPoint, magnet: bool) -> Option<DrawingPoint> {
        if !pos.is_resolved() {
            return None;
        }
        if magnet && self.magnet.enabled {
            if let Some(snapped) = self.snap_to_candle(pos) {
                return Some(snapped);
            }
        }
        let price = self.surface.y_to_price(pos.y)?;
        let time = self.surface.x_to_time(pos.x).or_else(|| {
            self.surface
                .x_to_logical(pos.x)
                .and_then(|logical| self.index.time_for_logical(logical))
        })?;
        Some(DrawingPoint::new(time, price))
    }

    fn snap_to_candle(&self, pos: ScreenPoint) -> Option<DrawingPoint> {
        let logical = self.surface.x_to_logical(pos.x)?.round();
        if logical < 0.0 {
            return None;
        }
        let bar = self.bars.get(logical as usize)?;
        let candidates: SmallVec<[(OrderedFloat<f64>, f64); 4]> = bar
            .ohlc()
            .into_iter()
            .filter_map(|price| {
                let y = self.surface.price_to_y(price)?;
                Some((OrderedFloat((y - pos.y).abs()), price))
            })
            .collect();
        let (distance, price) = candidates.into_iter().min_by_key(|item| item.0)?;
        (distance.0 <= self.magnet.tolerance_px).then(|| DrawingPoint::new(bar.time, price))
    }
}

impl<S: ChartSurface + ?Sized> PointProjector for CoordinateMapper<'_, S> {
    fn project(&self, point: DrawingPoint) -> ScreenPoint {
        self.point_to_screen(point)
    }
}
