use tracing::debug;

use crate::core::OhlcvBar;

/// Start of the bucket containing `time`.
#[must_use]
pub fn bucket_start(time: i64, bucket_ms: i64) -> i64 {
    time.div_euclid(bucket_ms) * bucket_ms
}

/// Aggregates a sorted series into `bucket_ms` buckets in one linear pass.
///
/// Each output candle is stamped with its bucket start: open of the first
/// record, running high/low, close of the last record, summed volume. When
/// `bucket_ms` is not coarser than `base_ms` the input is returned as a copy.
#[must_use]
pub fn resample(bars: &[OhlcvBar], base_ms: i64, bucket_ms: i64) -> Vec<OhlcvBar> {
    if bucket_ms <= 0 || bucket_ms <= base_ms {
        return bars.to_vec();
    }

    let mut out: Vec<OhlcvBar> = Vec::with_capacity(bars.len() / 2 + 1);
    for bar in bars {
        let bucket = bucket_start(bar.time, bucket_ms);
        match out.last_mut() {
            Some(current) if current.time == bucket => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(OhlcvBar { time: bucket, ..*bar }),
        }
    }

    debug!(input = bars.len(), output = out.len(), bucket_ms, "resampled series");
    out
}

/// Merges `incoming` into `existing`: concatenate, stable sort by time, keep
/// the first record of every run of equal timestamps.
#[must_use]
pub fn merge_dedup(existing: &[OhlcvBar], incoming: &[OhlcvBar]) -> Vec<OhlcvBar> {
    let mut merged: Vec<OhlcvBar> = Vec::with_capacity(existing.len() + incoming.len());
    merged.extend_from_slice(existing);
    merged.extend_from_slice(incoming);
    merged.sort_by_key(|bar| bar.time);
    merged.dedup_by_key(|bar| bar.time);
    merged
}

#[cfg(test)]
mod tests {
    use super::{bucket_start, merge_dedup, resample};
    use crate::core::OhlcvBar;

    #[test]
    fn base_timeframe_is_copied() {
        let bars = vec![OhlcvBar::flat(60_000, 1.0), OhlcvBar::flat(120_000, 2.0)];
        assert_eq!(resample(&bars, 60_000, 60_000), bars);
    }

    #[test]
    fn bucket_start_floors_negative_times() {
        assert_eq!(bucket_start(-1, 1_000), -1_000);
        assert_eq!(bucket_start(1_999, 1_000), 1_000);
    }

    #[test]
    fn merge_keeps_first_duplicate() {
        let existing = [OhlcvBar::flat(2, 1.0), OhlcvBar::flat(3, 1.0)];
        let incoming = [OhlcvBar::flat(1, 9.0), OhlcvBar::flat(2, 9.0)];
        let merged = merge_dedup(&existing, &incoming);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].close, 1.0);
    }
}
