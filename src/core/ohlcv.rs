use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// One time-bucketed price bar. `time` is epoch milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl OhlcvBar {
    /// Builds a validated bar.
    ///
    /// Invariants:
    /// - all values are finite and `time > 0`
    /// - `low <= min(open, close) <= max(open, close) <= high`
    pub fn new(
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> ChartResult<Self> {
        let bar = Self::raw(time, open, high, low, close, volume);
        if time <= 0 {
            return Err(ChartError::InvalidData(
                "ohlcv time must be a positive epoch-ms value".to_owned(),
            ));
        }
        if ![open, high, low, close, volume]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(ChartError::InvalidData(
                "ohlcv values must be finite".to_owned(),
            ));
        }
        if !bar.is_consistent() {
            return Err(ChartError::InvalidData(
                "ohlcv requires low <= open/close <= high".to_owned(),
            ));
        }
        Ok(bar)
    }

    /// Builds a bar without checking the OHLC invariant. Parser output goes
    /// through here and is repaired later by the sanitizer.
    #[must_use]
    pub const fn raw(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candle at `price` with zero volume.
    #[must_use]
    pub const fn flat(time: i64, price: f64) -> Self {
        Self::raw(time, price, price, price, price, 0.0)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// OHLC values in the order used for magnet snapping.
    #[must_use]
    pub fn ohlc(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }

    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.time)
    }

    /// ISO-8601 timestamp (UTC, second precision unless milliseconds are set).
    #[must_use]
    pub fn iso_time(&self) -> String {
        match self.datetime() {
            Some(dt) if self.time.rem_euclid(1000) == 0 => {
                dt.to_rfc3339_opts(SecondsFormat::Secs, true)
            }
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.time.to_string(),
        }
    }
}

/// Returns `true` when `bars` is strictly increasing in time.
#[must_use]
pub fn is_strictly_sorted(bars: &[OhlcvBar]) -> bool {
    bars.windows(2).all(|pair| pair[0].time < pair[1].time)
}
