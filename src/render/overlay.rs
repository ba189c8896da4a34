use tracing::trace;

use crate::drawing::{
    Drawing, DrawingId, PointProjector, SceneContext, ShapePart, TextAlign, geometry, handles,
    project_points,
};
use crate::render::{
    CirclePrimitive, Color, LinePrimitive, OverlayFrame, PolygonPrimitive, PolylinePrimitive,
    RectPrimitive, Stroke, StrokeDash, TextHAlign, TextPrimitive,
};

/// Overlay-wide styling not stored on individual drawings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub fallback_color: Color,
    pub fill_alpha: f64,
    pub range_fill_alpha: f64,
    pub label_font_px: f64,
    pub label_color: Color,
    pub handle_radius_px: f64,
    pub handle_fill: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fallback_color: Color::rgb(0.161, 0.384, 1.0),
            fill_alpha: 0.2,
            range_fill_alpha: 0.15,
            label_font_px: 12.0,
            label_color: Color::rgb(0.45, 0.47, 0.52),
            handle_radius_px: 5.0,
            handle_fill: Color::WHITE,
        }
    }
}

/// Paints `drawings` (bottom-to-top) into a fresh frame. Hidden drawings and
/// drawings with an off-screen anchor are left out; the selected drawing
/// gets its handles.
#[must_use]
pub fn build_overlay<'a, I, P>(
    drawings: I,
    selected: Option<&DrawingId>,
    projector: &P,
    ctx: &SceneContext,
    style: &OverlayStyle,
) -> OverlayFrame
where
    I: IntoIterator<Item = &'a Drawing>,
    P: PointProjector + ?Sized,
{
    let mut frame = OverlayFrame::new(ctx.viewport);
    for drawing in drawings {
        if !drawing.is_visible() {
            continue;
        }
        let points = project_points(drawing, projector);
        let Some(geo) = geometry(drawing, &points, ctx) else {
            trace!(id = drawing.id.as_str(), "drawing not resolvable, skipped");
            continue;
        };

        let color = parse_color(&drawing.properties.color, style.fallback_color);
        let width = valid_width(drawing.properties.line_width);
        let stroke = Stroke::new(width, color, drawing.properties.line_style.into());
        let fill_color = drawing
            .properties
            .background_color
            .as_deref()
            .map(|hex| parse_color(hex, color))
            .unwrap_or_else(|| {
                let alpha = if drawing.kind.is_range_box() {
                    style.range_fill_alpha
                } else {
                    style.fill_alpha
                };
                color.with_alpha(alpha)
            });

        for part in geo.parts {
            push_part(&mut frame, part, stroke, fill_color, drawing, style);
        }

        if selected == Some(&drawing.id) {
            for handle in handles(drawing, &points) {
                frame.circles.push(CirclePrimitive {
                    center: handle,
                    radius: style.handle_radius_px,
                    fill: Some(style.handle_fill),
                    stroke: Some(Stroke::new(1.5, color, StrokeDash::Solid)),
                });
            }
        }
    }
    frame
}

fn push_part(
    frame: &mut OverlayFrame,
    part: ShapePart,
    stroke: Stroke,
    fill_color: Color,
    drawing: &Drawing,
    style: &OverlayStyle,
) {
    match part {
        ShapePart::Segment { from, to, guide } => {
            let stroke = if guide {
                Stroke {
                    dash: StrokeDash::Dashed,
                    width: 1.0,
                    ..stroke
                }
            } else {
                stroke
            };
            frame.lines.push(LinePrimitive::new(from, to, stroke));
        }
        ShapePart::Polyline(points) => {
            if points.len() >= 2 {
                frame.polylines.push(PolylinePrimitive { points, stroke });
            }
        }
        ShapePart::Polygon { corners, filled } => {
            frame.polygons.push(PolygonPrimitive {
                points: corners.into_vec(),
                fill: filled.then_some(fill_color),
                stroke: Some(stroke),
            });
        }
        ShapePart::Circle {
            center,
            radius,
            filled,
        } => {
            frame.circles.push(CirclePrimitive {
                center,
                radius,
                fill: filled.then_some(fill_color),
                stroke: Some(stroke),
            });
        }
        ShapePart::Text {
            anchor,
            bounds,
            content,
            font_size,
            align,
        } => {
            if content.trim().is_empty() {
                return;
            }
            if let Some(hex) = drawing.properties.background_color.as_deref() {
                let background = parse_color(hex, Color::TRANSPARENT);
                frame.rects.push(
                    RectPrimitive::new(
                        bounds.min.x,
                        bounds.min.y,
                        bounds.max.x - bounds.min.x,
                        bounds.max.y - bounds.min.y,
                        background,
                    )
                    .with_corner_radius(2.0),
                );
            }
            frame.texts.push(TextPrimitive::new(
                content,
                anchor.x,
                anchor.y,
                font_size,
                stroke.color,
                h_align(align),
            ));
        }
        ShapePart::Label {
            anchor,
            content,
            align,
        } => {
            if content.is_empty() {
                return;
            }
            frame.texts.push(TextPrimitive::new(
                content,
                anchor.x,
                anchor.y - style.label_font_px * 1.4,
                style.label_font_px,
                style.label_color,
                h_align(align),
            ));
        }
    }
}

fn h_align(align: TextAlign) -> TextHAlign {
    match align {
        TextAlign::Left => TextHAlign::Left,
        TextAlign::Center => TextHAlign::Center,
        TextAlign::Right => TextHAlign::Right,
    }
}

fn parse_color(hex: &str, fallback: Color) -> Color {
    Color::from_hex(hex).unwrap_or_else(|err| {
        trace!(error = %err, "falling back to default drawing color");
        fallback
    })
}

fn valid_width(width: f64) -> f64 {
    if width.is_finite() && width > 0.0 {
        width
    } else {
        1.0
    }
}
