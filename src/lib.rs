//! chart-workspace: OHLCV ingestion and chart annotation engine.
//!
//! The crate streams OHLCV files tail-first, repairs and resamples them, and
//! keeps a set of vector drawings anchored in (time, price) space. Rendering
//! of the base series is left to the host's charting library; this crate
//! produces the drawing overlay on top of it.

pub mod api;
pub mod core;
pub mod drawing;
pub mod error;
pub mod ingest;
pub mod interaction;
pub mod render;
pub mod telemetry;

pub use api::{ChartSession, ChartStateRecord, ChartStateStore, SyncContext, WorkspaceConfig};
pub use error::{ChartError, ChartResult};
