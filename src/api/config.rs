use serde::{Deserialize, Serialize};

use crate::drawing::HitOptions;
use crate::error::{ChartError, ChartResult};
use crate::ingest::{DEFAULT_CHUNK_SIZE, SanitizeOptions};
use crate::interaction::ControllerOptions;

use super::coordinate_mapper::MagnetOptions;

/// Per-chart workspace settings.
///
/// Serializable so the record handed to persistence carries the settings a
/// chart was annotated with. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_hit_tolerance_px")]
    pub hit_tolerance_px: f64,
    #[serde(default = "default_handle_radius_px")]
    pub handle_radius_px: f64,
    #[serde(default)]
    pub magnet_enabled: bool,
    #[serde(default = "default_magnet_tolerance_px")]
    pub magnet_tolerance_px: f64,
    #[serde(default = "default_brush_min_distance_px")]
    pub brush_min_distance_px: f64,
    #[serde(default = "default_brush_smoothing_iterations")]
    pub brush_smoothing_iterations: u32,
    #[serde(default)]
    pub brush_simplify_epsilon: f64,
    #[serde(default)]
    pub smooth_outliers: bool,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
    #[serde(default = "default_gap_tolerance_ratio")]
    pub gap_tolerance_ratio: f64,
    /// Distance in bars from the oldest loaded bar at which the next chunk
    /// is requested.
    #[serde(default = "default_backfill_threshold_bars")]
    pub backfill_threshold_bars: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size_bytes(),
            history_limit: default_history_limit(),
            hit_tolerance_px: default_hit_tolerance_px(),
            handle_radius_px: default_handle_radius_px(),
            magnet_enabled: false,
            magnet_tolerance_px: default_magnet_tolerance_px(),
            brush_min_distance_px: default_brush_min_distance_px(),
            brush_smoothing_iterations: default_brush_smoothing_iterations(),
            brush_simplify_epsilon: 0.0,
            smooth_outliers: false,
            outlier_threshold: default_outlier_threshold(),
            gap_tolerance_ratio: default_gap_tolerance_ratio(),
            backfill_threshold_bars: default_backfill_threshold_bars(),
        }
    }
}

impl WorkspaceConfig {
    #[must_use]
    pub fn with_chunk_size_bytes(mut self, bytes: u64) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_magnet(mut self, enabled: bool) -> Self {
        self.magnet_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_smooth_outliers(mut self, enabled: bool) -> Self {
        self.smooth_outliers = enabled;
        self
    }

    #[must_use]
    pub fn with_brush_smoothing(mut self, iterations: u32, epsilon: f64) -> Self {
        self.brush_smoothing_iterations = iterations;
        self.brush_simplify_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_backfill_threshold_bars(mut self, bars: f64) -> Self {
        self.backfill_threshold_bars = bars;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        if self.chunk_size_bytes == 0 {
            return Err(ChartError::InvalidData(
                "chunk size must be > 0".to_owned(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ChartError::InvalidData(
                "history limit must be > 0".to_owned(),
            ));
        }
        for (name, value) in [
            ("hit tolerance", self.hit_tolerance_px),
            ("handle radius", self.handle_radius_px),
            ("magnet tolerance", self.magnet_tolerance_px),
            ("brush min distance", self.brush_min_distance_px),
            ("brush simplify epsilon", self.brush_simplify_epsilon),
            ("gap tolerance ratio", self.gap_tolerance_ratio),
            ("backfill threshold", self.backfill_threshold_bars),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidData(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(ChartError::InvalidData(
                "outlier threshold must be finite and > 0".to_owned(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub fn controller_options(self) -> ControllerOptions {
        ControllerOptions {
            hit: HitOptions {
                tolerance_px: self.hit_tolerance_px,
                handle_radius_px: self.handle_radius_px,
            },
            history_limit: self.history_limit,
            brush_min_distance_px: self.brush_min_distance_px,
            brush_smoothing_iterations: self.brush_smoothing_iterations,
            brush_simplify_epsilon: self.brush_simplify_epsilon,
        }
    }

    #[must_use]
    pub fn magnet_options(self) -> MagnetOptions {
        MagnetOptions {
            enabled: self.magnet_enabled,
            tolerance_px: self.magnet_tolerance_px,
        }
    }

    #[must_use]
    pub fn sanitize_options(self, timeframe_ms: i64) -> SanitizeOptions {
        SanitizeOptions {
            timeframe_ms,
            smooth_outliers: self.smooth_outliers,
            outlier_threshold: self.outlier_threshold,
            gap_tolerance_ratio: self.gap_tolerance_ratio,
        }
    }

    pub fn to_json_pretty(self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self).map_err(|e| {
            ChartError::Serialization(format!("failed to serialize workspace config: {e}"))
        })
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input).map_err(|e| {
            ChartError::Serialization(format!("failed to parse workspace config: {e}"))
        })?;
        config.validate()
    }
}

fn default_chunk_size_bytes() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_history_limit() -> usize {
    crate::drawing::DEFAULT_HISTORY_LIMIT
}

fn default_hit_tolerance_px() -> f64 {
    6.0
}

fn default_handle_radius_px() -> f64 {
    8.0
}

fn default_magnet_tolerance_px() -> f64 {
    30.0
}

fn default_brush_min_distance_px() -> f64 {
    3.0
}

fn default_brush_smoothing_iterations() -> u32 {
    2
}

fn default_outlier_threshold() -> f64 {
    0.5
}

fn default_gap_tolerance_ratio() -> f64 {
    0.1
}

fn default_backfill_threshold_bars() -> f64 {
    50.0
}

#[cfg(test)]
mod tests {
    use super::WorkspaceConfig;

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            WorkspaceConfig::from_json_str(r#"{"magnet_enabled":true}"#).expect("config");
        assert!(config.magnet_enabled);
        assert_eq!(config.chunk_size_bytes, 2 * 1024 * 1024);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.magnet_options().tolerance_px, 30.0);
    }

    #[test]
    fn rejects_zero_history() {
        assert!(WorkspaceConfig::default().with_history_limit(0).validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let config = WorkspaceConfig::default().with_smooth_outliers(true);
        let json = config.to_json_pretty().expect("json");
        assert_eq!(WorkspaceConfig::from_json_str(&json).expect("parse"), config);
    }
}
