use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::OhlcvBar;

/// Repair policy for [`sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanitizeOptions {
    /// Nominal bar duration of the series; `0` disables gap filling.
    pub timeframe_ms: i64,
    /// Flatten outlier candles to the previous close instead of only counting them.
    pub smooth_outliers: bool,
    /// Relative close-to-close move above which a candle is an outlier.
    pub outlier_threshold: f64,
    /// Accepted deviation from exactly two bar durations when filling gaps.
    pub gap_tolerance_ratio: f64,
}

impl SanitizeOptions {
    #[must_use]
    pub fn new(timeframe_ms: i64) -> Self {
        Self {
            timeframe_ms,
            smooth_outliers: false,
            outlier_threshold: 0.5,
            gap_tolerance_ratio: 0.1,
        }
    }

    #[must_use]
    pub fn with_smooth_outliers(mut self, enabled: bool) -> Self {
        self.smooth_outliers = enabled;
        self
    }
}

/// Counters surfaced to the user after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeStats {
    pub fixed_zeroes: usize,
    pub fixed_logic: usize,
    pub filled_gaps: usize,
    pub outliers: usize,
    /// Number of records in the cleaned output, fillers included.
    pub total_records: usize,
}

/// Repairs a sorted series in one pass, comparing each record with the
/// previous already-cleaned record.
#[must_use]
pub fn sanitize(bars: &[OhlcvBar], options: SanitizeOptions) -> (Vec<OhlcvBar>, SanitizeStats) {
    let mut stats = SanitizeStats::default();
    let mut cleaned: Vec<OhlcvBar> = Vec::with_capacity(bars.len());

    for raw in bars {
        let mut bar = *raw;
        let previous = cleaned.last().copied();

        if repair_zeroes(&mut bar, previous) {
            stats.fixed_zeroes += 1;
        }
        if repair_logic(&mut bar) {
            stats.fixed_logic += 1;
        }

        if let Some(prev) = previous {
            if let Some(filler) = gap_filler(prev, bar.time, options) {
                cleaned.push(filler);
                stats.filled_gaps += 1;
            }

            if prev.close != 0.0 {
                let change = (bar.close - prev.close).abs() / prev.close.abs();
                if change > options.outlier_threshold {
                    stats.outliers += 1;
                    if options.smooth_outliers {
                        bar = OhlcvBar {
                            volume: bar.volume,
                            ..OhlcvBar::flat(bar.time, prev.close)
                        };
                    }
                }
            }
        }

        cleaned.push(bar);
    }

    stats.total_records = cleaned.len();
    if stats.outliers > 0 {
        warn!(
            outliers = stats.outliers,
            smoothed = options.smooth_outliers,
            "outlier candles detected"
        );
    }
    debug!(
        input = bars.len(),
        output = cleaned.len(),
        fixed_zeroes = stats.fixed_zeroes,
        fixed_logic = stats.fixed_logic,
        filled_gaps = stats.filled_gaps,
        "sanitized series"
    );
    (cleaned, stats)
}

/// Replaces zero prices with the previous close, or for the first record with
/// any nonzero sibling field.
fn repair_zeroes(bar: &mut OhlcvBar, previous: Option<OhlcvBar>) -> bool {
    let fields = [bar.open, bar.high, bar.low, bar.close];
    if !fields.contains(&0.0) {
        return false;
    }
    let replacement = match previous {
        Some(prev) if prev.close != 0.0 => Some(prev.close),
        _ => fields.iter().copied().find(|value| *value != 0.0),
    };
    let Some(replacement) = replacement else {
        return false;
    };

    for field in [&mut bar.open, &mut bar.high, &mut bar.low, &mut bar.close] {
        if *field == 0.0 {
            *field = replacement;
        }
    }
    true
}

/// Swaps inverted high/low and widens them to contain open and close.
fn repair_logic(bar: &mut OhlcvBar) -> bool {
    let mut fixed = false;
    if bar.low > bar.high {
        std::mem::swap(&mut bar.low, &mut bar.high);
        fixed = true;
    }
    let body_high = bar.open.max(bar.close);
    let body_low = bar.open.min(bar.close);
    if bar.high < body_high {
        bar.high = body_high;
        fixed = true;
    }
    if bar.low > body_low {
        bar.low = body_low;
        fixed = true;
    }
    fixed
}

/// Flat candle for a single missing slot, when the delta is within tolerance
/// of exactly two bar durations.
fn gap_filler(prev: OhlcvBar, time: i64, options: SanitizeOptions) -> Option<OhlcvBar> {
    if options.timeframe_ms <= 0 {
        return None;
    }
    let duration = options.timeframe_ms as f64;
    let delta = (time - prev.time) as f64;
    let expected = 2.0 * duration;
    if (delta - expected).abs() <= expected * options.gap_tolerance_ratio {
        Some(OhlcvBar::flat(prev.time + options.timeframe_ms, prev.close))
    } else {
        None
    }
}
