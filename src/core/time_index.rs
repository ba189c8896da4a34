use crate::core::OhlcvBar;

/// Time→logical-index map derived from the displayed series.
///
/// Indices are positions in the displayed series. Fractional indices are used
/// for timestamps that fall between bars (drawings made on a finer timeframe)
/// and for timestamps beyond either end of the loaded data, which are
/// extrapolated using the nominal bar duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeIndex {
    times: Vec<i64>,
    bar_duration_ms: i64,
}

impl TimeIndex {
    #[must_use]
    pub fn from_bars(bars: &[OhlcvBar], bar_duration_ms: i64) -> Self {
        Self {
            times: bars.iter().map(|bar| bar.time).collect(),
            bar_duration_ms: bar_duration_ms.max(1),
        }
    }

    #[must_use]
    pub fn from_times(times: Vec<i64>, bar_duration_ms: i64) -> Self {
        Self {
            times,
            bar_duration_ms: bar_duration_ms.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn bar_duration_ms(&self) -> i64 {
        self.bar_duration_ms
    }

    #[must_use]
    pub fn first_time(&self) -> Option<i64> {
        self.times.first().copied()
    }

    #[must_use]
    pub fn last_time(&self) -> Option<i64> {
        self.times.last().copied()
    }

    /// Exact lookup of a loaded bar.
    #[must_use]
    pub fn index_of(&self, time: i64) -> Option<usize> {
        self.times.binary_search(&time).ok()
    }

    /// Logical index for any timestamp: exact, interpolated between the two
    /// surrounding bars, or extrapolated past either edge.
    #[must_use]
    pub fn logical_for_time(&self, time: i64) -> Option<f64> {
        let first = self.first_time()?;
        let last = self.last_time()?;
        let duration = self.bar_duration_ms as f64;

        if time >= last {
            let last_index = (self.times.len() - 1) as f64;
            return Some(last_index + (time - last) as f64 / duration);
        }
        if time <= first {
            return Some((time - first) as f64 / duration);
        }

        match self.times.binary_search(&time) {
            Ok(index) => Some(index as f64),
            Err(upper) => {
                let lower = upper - 1;
                let (t0, t1) = (self.times[lower], self.times[upper]);
                let fraction = (time - t0) as f64 / (t1 - t0) as f64;
                Some(lower as f64 + fraction)
            }
        }
    }

    /// Timestamp for a logical index, inverse of [`Self::logical_for_time`].
    #[must_use]
    pub fn time_for_logical(&self, logical: f64) -> Option<i64> {
        if !logical.is_finite() {
            return None;
        }
        let first = self.first_time()?;
        let last = self.last_time()?;
        let last_index = (self.times.len() - 1) as f64;
        let duration = self.bar_duration_ms as f64;

        if logical >= last_index {
            return Some(last + ((logical - last_index) * duration).round() as i64);
        }
        if logical <= 0.0 {
            return Some(first + (logical * duration).round() as i64);
        }

        let lower = logical.floor() as usize;
        let fraction = logical - lower as f64;
        let t0 = self.times[lower];
        let t1 = self.times[(lower + 1).min(self.times.len() - 1)];
        Some(t0 + ((t1 - t0) as f64 * fraction).round() as i64)
    }
}
