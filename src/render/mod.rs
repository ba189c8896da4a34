mod frame;
mod null_renderer;
pub mod overlay;
mod primitives;
mod scheduler;

pub use frame::OverlayFrame;
pub use null_renderer::NullRenderer;
pub use overlay::{OverlayStyle, build_overlay};
pub use primitives::{
    CirclePrimitive, Color, LinePrimitive, PolygonPrimitive, PolylinePrimitive, RectPrimitive,
    Stroke, StrokeDash, TextHAlign, TextPrimitive,
};
pub use scheduler::FrameScheduler;

use crate::error::ChartResult;

/// Contract implemented by any overlay rendering backend.
///
/// Backends receive a fully materialized `OverlayFrame` so drawing code stays
/// isolated from the drawing model and interaction logic.
pub trait Renderer {
    fn render(&mut self, frame: &OverlayFrame) -> ChartResult<()>;
}

#[cfg(feature = "cairo-backend")]
mod cairo_backend;
#[cfg(feature = "cairo-backend")]
pub use cairo_backend::{CairoContextRenderer, CairoRenderStats, CairoRenderer};
