use cairo::{Context, Format, ImageSurface, Operator};
use pango::FontDescription;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::core::ScreenPoint;
use crate::error::{ChartError, ChartResult};
use crate::render::{Color, OverlayFrame, RectPrimitive, Renderer, Stroke, TextHAlign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CairoRenderStats {
    pub shapes_filled: usize,
    pub strokes_drawn: usize,
    pub texts_drawn: usize,
}

/// Extension trait for renderers that can draw into an external Cairo
/// context (for example a GTK `DrawingArea` callback stacked above the
/// candlestick view).
pub trait CairoContextRenderer {
    fn render_on_cairo_context(
        &mut self,
        context: &Context,
        frame: &OverlayFrame,
    ) -> ChartResult<()>;
}

/// Cairo + Pango overlay renderer.
///
/// The surface is cleared to full transparency before every pass so the
/// overlay can be composited above the chart.
#[derive(Debug)]
pub struct CairoRenderer {
    surface: ImageSurface,
    last_stats: CairoRenderStats,
}

impl CairoRenderer {
    pub fn new(width: i32, height: i32) -> ChartResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(ChartError::InvalidData(
                "cairo surface size must be > 0".to_owned(),
            ));
        }

        let surface = ImageSurface::create(Format::ARgb32, width, height)
            .map_err(|err| map_backend_error("failed to create cairo surface", err))?;
        Ok(Self {
            surface,
            last_stats: CairoRenderStats::default(),
        })
    }

    #[must_use]
    pub fn surface(&self) -> &ImageSurface {
        &self.surface
    }

    #[must_use]
    pub fn last_stats(&self) -> CairoRenderStats {
        self.last_stats
    }

    fn render_with_context(&mut self, context: &Context, frame: &OverlayFrame) -> ChartResult<()> {
        frame.validate()?;

        context.save().map_err(|err| map_backend_error("failed to save state", err))?;
        context.set_operator(Operator::Clear);
        context
            .paint()
            .map_err(|err| map_backend_error("failed to clear surface", err))?;
        context
            .restore()
            .map_err(|err| map_backend_error("failed to restore state", err))?;

        let mut stats = CairoRenderStats::default();

        for polygon in &frame.polygons {
            append_polyline_path(context, &polygon.points);
            context.close_path();
            fill_and_stroke(context, polygon.fill, polygon.stroke, &mut stats)?;
        }

        for circle in &frame.circles {
            context.new_sub_path();
            context.arc(circle.center.x, circle.center.y, circle.radius, 0.0, 2.0 * PI);
            fill_and_stroke(context, circle.fill, circle.stroke, &mut stats)?;
        }

        for line in &frame.lines {
            context.move_to(line.from.x, line.from.y);
            context.line_to(line.to.x, line.to.y);
            stroke_path(context, line.stroke)?;
            stats.strokes_drawn += 1;
        }

        for polyline in &frame.polylines {
            append_polyline_path(context, &polyline.points);
            stroke_path(context, polyline.stroke)?;
            stats.strokes_drawn += 1;
        }

        for rect in &frame.rects {
            append_rect_path(context, *rect);
            apply_color(context, rect.fill_color);
            context
                .fill()
                .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
            stats.shapes_filled += 1;
        }

        for text in &frame.texts {
            let layout = pangocairo::functions::create_layout(context);
            let font_description =
                FontDescription::from_string(&format!("Sans {}px", text.font_size_px));
            layout.set_font_description(Some(&font_description));
            layout.set_text(&text.text);

            let (text_width, _text_height) = layout.pixel_size();
            let x = match text.h_align {
                TextHAlign::Left => text.x,
                TextHAlign::Center => text.x - f64::from(text_width) / 2.0,
                TextHAlign::Right => text.x - f64::from(text_width),
            };

            apply_color(context, text.color);
            context.move_to(x, text.y);
            pangocairo::functions::show_layout(context, &layout);
            stats.texts_drawn += 1;
        }

        self.last_stats = stats;
        Ok(())
    }
}

impl Renderer for CairoRenderer {
    fn render(&mut self, frame: &OverlayFrame) -> ChartResult<()> {
        let context = Context::new(&self.surface)
            .map_err(|err| map_backend_error("failed to create cairo context", err))?;
        self.render_with_context(&context, frame)
    }
}

impl CairoContextRenderer for CairoRenderer {
    fn render_on_cairo_context(
        &mut self,
        context: &Context,
        frame: &OverlayFrame,
    ) -> ChartResult<()> {
        self.render_with_context(context, frame)
    }
}

fn apply_color(context: &Context, color: Color) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
}

fn apply_stroke(context: &Context, stroke: Stroke) {
    apply_color(context, stroke.color);
    context.set_line_width(stroke.width);
    match stroke.dash.pattern(stroke.width) {
        Some(pattern) => context.set_dash(&pattern, 0.0),
        None => context.set_dash(&[], 0.0),
    }
}

fn stroke_path(context: &Context, stroke: Stroke) -> ChartResult<()> {
    apply_stroke(context, stroke);
    context
        .stroke()
        .map_err(|err| map_backend_error("failed to stroke path", err))
}

fn fill_and_stroke(
    context: &Context,
    fill: Option<Color>,
    stroke: Option<Stroke>,
    stats: &mut CairoRenderStats,
) -> ChartResult<()> {
    if let Some(fill) = fill {
        apply_color(context, fill);
        context
            .fill_preserve()
            .map_err(|err| map_backend_error("failed to fill shape", err))?;
        stats.shapes_filled += 1;
    }
    match stroke {
        Some(stroke) => {
            stroke_path(context, stroke)?;
            stats.strokes_drawn += 1;
        }
        None => context.new_path(),
    }
    Ok(())
}

fn append_polyline_path(context: &Context, points: &[ScreenPoint]) {
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        context.move_to(first.x, first.y);
    }
    for point in iter {
        context.line_to(point.x, point.y);
    }
}

fn append_rect_path(context: &Context, rect: RectPrimitive) {
    if rect.corner_radius <= 0.0 {
        context.rectangle(rect.x, rect.y, rect.width, rect.height);
        return;
    }

    let radius = rect
        .corner_radius
        .min(rect.width * 0.5)
        .min(rect.height * 0.5);
    let left = rect.x;
    let top = rect.y;
    let right = rect.x + rect.width;
    let bottom = rect.y + rect.height;

    context.new_sub_path();
    context.arc(right - radius, top + radius, radius, -FRAC_PI_2, 0.0);
    context.arc(right - radius, bottom - radius, radius, 0.0, FRAC_PI_2);
    context.arc(left + radius, bottom - radius, radius, FRAC_PI_2, PI);
    context.arc(left + radius, top + radius, radius, PI, PI + FRAC_PI_2);
    context.close_path();
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> ChartError {
    ChartError::InvalidData(format!("{prefix}: {err}"))
}
