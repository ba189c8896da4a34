//! Drawing model, per-kind geometry, undo history and the ordered drawing
//! collection.

pub mod catalog;
pub mod collection;
pub mod geometry;
pub mod history;
pub mod smoothing;
pub mod types;

pub use catalog::{
    DrawingGeometry, DrawingHit, FIB_LEVELS, HitOptions, HitTarget, PointProjector, SceneContext,
    ShapePart, TextBounds, geometry, handles, hit_test, hit_test_drawings, project_points,
};
pub use collection::{DrawingSet, DrawingSnapshot, PanelRow};
pub use history::{DEFAULT_HISTORY_LIMIT, History};
pub use smoothing::{moving_average, simplify_rdp, smooth_stroke};
pub use types::{
    Drawing, DrawingId, DrawingKind, DrawingPoint, DrawingProperties, Folder, FolderId, LineStyle,
    PointArity, TextAlign,
};
