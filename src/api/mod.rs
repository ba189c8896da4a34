//! Host-facing surface: chart sessions, settings, persistence and
//! cross-chart sync.

mod config;
pub mod coordinate_mapper;
mod persistence;
mod session;
mod sync;

pub use config::WorkspaceConfig;
pub use coordinate_mapper::{ChartSurface, CoordinateMapper, MagnetOptions, ViewportSurface};
pub use persistence::{CHART_STATE_DIR, ChartStateRecord, ChartStateStore};
pub use session::ChartSession;
pub use sync::{ChartId, SyncContext, SyncEvent, SyncSettings};
