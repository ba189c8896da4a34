use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of positive deltas sampled by [`Timeframe::detect_from_times`].
pub const DETECTION_SAMPLE_LIMIT: usize = 200;

const MINUTE_MS: i64 = 60_000;

/// Known candle bucket durations, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H12,
    D1,
    W1,
    MN1,
}

/// Filename tokens recognized by [`Timeframe::infer_from_file_name`].
///
/// Matching is against whole lowercase tokens split on non-alphanumerics, so
/// the table stays plain data and can be extended without touching the matcher.
pub const FILE_NAME_TOKENS: &[(&str, Timeframe)] = &[
    ("m1", Timeframe::M1),
    ("1m", Timeframe::M1),
    ("1min", Timeframe::M1),
    ("1minute", Timeframe::M1),
    ("m3", Timeframe::M3),
    ("3m", Timeframe::M3),
    ("3min", Timeframe::M3),
    ("m5", Timeframe::M5),
    ("5m", Timeframe::M5),
    ("5min", Timeframe::M5),
    ("m15", Timeframe::M15),
    ("15m", Timeframe::M15),
    ("15min", Timeframe::M15),
    ("m30", Timeframe::M30),
    ("30m", Timeframe::M30),
    ("30min", Timeframe::M30),
    ("h1", Timeframe::H1),
    ("1h", Timeframe::H1),
    ("60m", Timeframe::H1),
    ("60min", Timeframe::H1),
    ("1hour", Timeframe::H1),
    ("hourly", Timeframe::H1),
    ("h2", Timeframe::H2),
    ("2h", Timeframe::H2),
    ("120m", Timeframe::H2),
    ("h4", Timeframe::H4),
    ("4h", Timeframe::H4),
    ("240m", Timeframe::H4),
    ("h6", Timeframe::H6),
    ("6h", Timeframe::H6),
    ("h12", Timeframe::H12),
    ("12h", Timeframe::H12),
    ("d1", Timeframe::D1),
    ("1d", Timeframe::D1),
    ("day", Timeframe::D1),
    ("daily", Timeframe::D1),
    ("w1", Timeframe::W1),
    ("1w", Timeframe::W1),
    ("week", Timeframe::W1),
    ("weekly", Timeframe::W1),
    ("mn1", Timeframe::MN1),
    ("mn", Timeframe::MN1),
    ("1mo", Timeframe::MN1),
    ("month", Timeframe::MN1),
    ("monthly", Timeframe::MN1),
];

impl Timeframe {
    pub const ALL: [Timeframe; 13] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    #[must_use]
    pub const fn minutes(self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H12 => 720,
            Timeframe::D1 => 1_440,
            Timeframe::W1 => 10_080,
            // Fixed 30-day bucket; calendar months are not modelled.
            Timeframe::MN1 => 43_200,
        }
    }

    #[must_use]
    pub const fn duration_ms(self) -> i64 {
        self.minutes() as i64 * MINUTE_MS
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::MN1 => "1M",
        }
    }

    /// Maps observed minutes onto the table: exact match first, otherwise the
    /// smallest bucket that is at least `minutes`, otherwise the coarsest one.
    #[must_use]
    pub fn from_minutes_nearest(minutes: f64) -> Timeframe {
        if let Some(exact) = Self::ALL
            .iter()
            .copied()
            .find(|tf| f64::from(tf.minutes()) == minutes)
        {
            return exact;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|tf| f64::from(tf.minutes()) >= minutes)
            .unwrap_or(Timeframe::MN1)
    }

    /// Detects the nominal timeframe from sorted bar times (epoch ms).
    ///
    /// Samples up to [`DETECTION_SAMPLE_LIMIT`] positive deltas and takes their
    /// mode; ties resolve to the smaller delta.
    #[must_use]
    pub fn detect_from_times(times: &[i64]) -> Option<Timeframe> {
        let mut counts: IndexMap<i64, usize> = IndexMap::new();
        for delta in times
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|delta| *delta > 0)
            .take(DETECTION_SAMPLE_LIMIT)
        {
            *counts.entry(delta).or_insert(0) += 1;
        }

        let (mode_ms, samples) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(delta, count)| (*delta, *count))?;
        let minutes = mode_ms as f64 / MINUTE_MS as f64;
        let detected = Self::from_minutes_nearest(minutes);
        debug!(mode_ms, samples, timeframe = detected.label(), "detected timeframe");
        Some(detected)
    }

    /// Infers a timeframe from a file name such as `EURUSD_M15.csv` or
    /// `btc-usdt 4h.txt`. Returns the last matching token.
    #[must_use]
    pub fn infer_from_file_name(name: &str) -> Option<Timeframe> {
        file_name_tokens(name)
            .filter_map(|token| Self::from_token(&token))
            .last()
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Timeframe> {
        FILE_NAME_TOKENS
            .iter()
            .find(|(pattern, _)| pattern.eq_ignore_ascii_case(token))
            .map(|(_, tf)| *tf)
    }
}

/// Lowercase alphanumeric tokens of a file name with the extension removed.
pub(crate) fn file_name_tokens(name: &str) -> impl Iterator<Item = String> + '_ {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => base,
    };
    stem.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::Timeframe;

    #[test]
    fn nearest_prefers_exact_then_next_larger() {
        assert_eq!(Timeframe::from_minutes_nearest(15.0), Timeframe::M15);
        assert_eq!(Timeframe::from_minutes_nearest(10.0), Timeframe::M15);
        assert_eq!(Timeframe::from_minutes_nearest(0.5), Timeframe::M1);
        assert_eq!(Timeframe::from_minutes_nearest(1e9), Timeframe::MN1);
    }

    #[test]
    fn detects_mode_ignoring_gaps() {
        let mut times: Vec<i64> = (0..50).map(|i| 1_000_000 + i * 300_000).collect();
        // Weekend gap and a duplicate do not move the mode.
        times.push(times[49] + 172_800_000);
        times.push(*times.last().expect("last"));
        assert_eq!(Timeframe::detect_from_times(&times), Some(Timeframe::M5));
        assert_eq!(Timeframe::detect_from_times(&[5]), None);
    }

    #[test]
    fn infers_from_file_names() {
        assert_eq!(
            Timeframe::infer_from_file_name("EURUSD_M15.csv"),
            Some(Timeframe::M15)
        );
        assert_eq!(
            Timeframe::infer_from_file_name("/data/btc-usdt 4h.txt"),
            Some(Timeframe::H4)
        );
        assert_eq!(
            Timeframe::infer_from_file_name("SPX_daily.csv"),
            Some(Timeframe::D1)
        );
        assert_eq!(Timeframe::infer_from_file_name("prices.csv"), None);
    }
}
