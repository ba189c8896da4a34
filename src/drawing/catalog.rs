//! Per-kind behaviour: point arity, screen geometry, hit rules and handles.

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::core::{ScreenPoint, Viewport};
use crate::drawing::geometry::{
    arrow_head, channel_offset, distance_to_outline, distance_to_polyline, distance_to_segment,
    extend_line, extend_ray, point_in_polygon, rotated_rectangle,
};
use crate::drawing::types::{Drawing, DrawingId, DrawingKind, DrawingPoint, PointArity, TextAlign};

pub const FIB_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

const ARROW_HEAD_PX: f64 = 12.0;
const CHAR_WIDTH_RATIO: f64 = 0.6;
const LINE_HEIGHT_RATIO: f64 = 1.2;

impl DrawingKind {
    pub const ALL: [DrawingKind; 18] = [
        DrawingKind::Text,
        DrawingKind::HorizontalLine,
        DrawingKind::VerticalLine,
        DrawingKind::HorizontalRay,
        DrawingKind::TrendLine,
        DrawingKind::Ray,
        DrawingKind::ExtendedLine,
        DrawingKind::Arrow,
        DrawingKind::Rectangle,
        DrawingKind::Circle,
        DrawingKind::Measure,
        DrawingKind::DateRange,
        DrawingKind::PriceRange,
        DrawingKind::FibRetracement,
        DrawingKind::Triangle,
        DrawingKind::RotatedRectangle,
        DrawingKind::ParallelChannel,
        DrawingKind::Brush,
    ];

    #[must_use]
    pub const fn arity(self) -> PointArity {
        match self {
            DrawingKind::Text
            | DrawingKind::HorizontalLine
            | DrawingKind::VerticalLine
            | DrawingKind::HorizontalRay => PointArity::Fixed(1),
            DrawingKind::TrendLine
            | DrawingKind::Ray
            | DrawingKind::ExtendedLine
            | DrawingKind::Arrow
            | DrawingKind::Rectangle
            | DrawingKind::Circle
            | DrawingKind::Measure
            | DrawingKind::DateRange
            | DrawingKind::PriceRange
            | DrawingKind::FibRetracement => PointArity::Fixed(2),
            DrawingKind::Triangle
            | DrawingKind::RotatedRectangle
            | DrawingKind::ParallelChannel => PointArity::Fixed(3),
            DrawingKind::Brush => PointArity::AtLeast(2),
        }
    }

    /// Clicks needed to finish creation; `None` for press-drag-release
    /// strokes.
    #[must_use]
    pub const fn clicks_to_complete(self) -> Option<usize> {
        match self.arity() {
            PointArity::Fixed(n) => Some(n),
            PointArity::AtLeast(_) => None,
        }
    }

    /// Kinds whose body is a translucent box regardless of the `filled` flag.
    #[must_use]
    pub const fn is_range_box(self) -> bool {
        matches!(
            self,
            DrawingKind::Measure | DrawingKind::DateRange | DrawingKind::PriceRange
        )
    }
}

/// Surface facts the catalog needs beyond the projected points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneContext {
    pub viewport: Viewport,
    pub bar_duration_ms: i64,
}

/// Converts anchors to pixels; unresolvable anchors map to
/// [`ScreenPoint::OFF_SCREEN`].
pub trait PointProjector {
    fn project(&self, point: DrawingPoint) -> ScreenPoint;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBounds {
    pub min: ScreenPoint,
    pub max: ScreenPoint,
}

impl TextBounds {
    #[must_use]
    pub fn contains(self, p: ScreenPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// One screen-space piece of a drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapePart {
    /// `guide` segments are auxiliary strokes painted dashed.
    Segment {
        from: ScreenPoint,
        to: ScreenPoint,
        guide: bool,
    },
    Polyline(Vec<ScreenPoint>),
    Polygon {
        corners: SmallVec<[ScreenPoint; 4]>,
        filled: bool,
    },
    Circle {
        center: ScreenPoint,
        radius: f64,
        filled: bool,
    },
    Text {
        anchor: ScreenPoint,
        bounds: TextBounds,
        content: String,
        font_size: f64,
        align: TextAlign,
    },
    /// Informational caption; painted but never hit. `anchor` is the
    /// bottom edge of the caption.
    Label {
        anchor: ScreenPoint,
        content: String,
        align: TextAlign,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawingGeometry {
    pub parts: Vec<ShapePart>,
}

impl DrawingGeometry {
    fn push(&mut self, part: ShapePart) {
        self.parts.push(part);
    }

    fn segment(&mut self, from: ScreenPoint, to: ScreenPoint) {
        self.push(ShapePart::Segment {
            from,
            to,
            guide: false,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle(usize),
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingHit {
    pub id: DrawingId,
    pub target: HitTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOptions {
    pub tolerance_px: f64,
    pub handle_radius_px: f64,
}

impl Default for HitOptions {
    fn default() -> Self {
        Self {
            tolerance_px: 6.0,
            handle_radius_px: 8.0,
        }
    }
}

/// Projects every anchor of `drawing`.
#[must_use]
pub fn project_points<P: PointProjector + ?Sized>(
    drawing: &Drawing,
    projector: &P,
) -> Vec<ScreenPoint> {
    drawing.points.iter().map(|p| projector.project(*p)).collect()
}

/// Builds the screen geometry of `drawing` from its projected anchors.
///
/// Returns `None` when any anchor is off-screen. Fewer anchors than the
/// kind's arity (a creation preview) yield a plain polyline.
#[must_use]
pub fn geometry(
    drawing: &Drawing,
    points: &[ScreenPoint],
    ctx: &SceneContext,
) -> Option<DrawingGeometry> {
    if points.is_empty() || points.iter().any(|p| !p.is_resolved()) {
        return None;
    }
    let mut geo = DrawingGeometry::default();
    if points.len() < drawing.kind.arity().min() {
        if points.len() == 1 {
            geo.segment(points[0], points[0]);
        } else {
            geo.push(ShapePart::Polyline(points.to_vec()));
        }
        return Some(geo);
    }

    let props = &drawing.properties;
    let width = ctx.viewport.width_px();
    let height = ctx.viewport.height_px();
    let p0 = points[0];

    match drawing.kind {
        DrawingKind::Text => {
            let content = props.text.clone().unwrap_or_else(|| "Text".to_owned());
            let font_size = props.font_size_or_default();
            let align = props.text_align.unwrap_or_default();
            let bounds = text_bounds(p0, &content, font_size, align);
            geo.push(ShapePart::Text {
                anchor: p0,
                bounds,
                content,
                font_size,
                align,
            });
        }
        DrawingKind::HorizontalLine => {
            geo.segment(ScreenPoint::new(0.0, p0.y), ScreenPoint::new(width, p0.y));
        }
        DrawingKind::VerticalLine => {
            geo.segment(ScreenPoint::new(p0.x, 0.0), ScreenPoint::new(p0.x, height));
        }
        DrawingKind::HorizontalRay => {
            geo.segment(p0, ScreenPoint::new(width.max(p0.x), p0.y));
        }
        DrawingKind::TrendLine => geo.segment(p0, points[1]),
        DrawingKind::Ray => geo.segment(p0, extend_ray(p0, points[1], ctx.viewport)),
        DrawingKind::ExtendedLine => {
            let (from, to) = extend_line(p0, points[1], ctx.viewport);
            geo.segment(from, to);
        }
        DrawingKind::Arrow => {
            let tip = points[1];
            geo.segment(p0, tip);
            for barb in arrow_head(p0, tip, ARROW_HEAD_PX) {
                geo.segment(tip, barb);
            }
        }
        DrawingKind::Rectangle => {
            geo.push(ShapePart::Polygon {
                corners: box_corners(p0, points[1]),
                filled: props.is_filled(),
            });
        }
        DrawingKind::Circle => {
            geo.push(ShapePart::Circle {
                center: p0,
                radius: p0.distance_to(points[1]),
                filled: props.is_filled(),
            });
        }
        DrawingKind::Measure | DrawingKind::DateRange | DrawingKind::PriceRange => {
            let corners = box_corners(p0, points[1]);
            let top_center = ScreenPoint::new((p0.x + points[1].x) / 2.0, p0.y.min(points[1].y));
            geo.push(ShapePart::Polygon {
                corners,
                filled: true,
            });
            geo.push(ShapePart::Label {
                anchor: top_center,
                content: range_caption(drawing, ctx.bar_duration_ms),
                align: TextAlign::Center,
            });
        }
        DrawingKind::FibRetracement => {
            let p1 = points[1];
            let (min_x, max_x) = (p0.x.min(p1.x), p0.x.max(p1.x));
            geo.push(ShapePart::Segment {
                from: p0,
                to: p1,
                guide: true,
            });
            let (start, end) = (drawing.points[0].price, drawing.points[1].price);
            for ratio in FIB_LEVELS {
                let y = p1.y + (p0.y - p1.y) * ratio;
                geo.segment(ScreenPoint::new(min_x, y), ScreenPoint::new(max_x, y));
                let price = end + (start - end) * ratio;
                geo.push(ShapePart::Label {
                    anchor: ScreenPoint::new(min_x, y),
                    content: format!("{ratio} ({})", format_price(price)),
                    align: TextAlign::Left,
                });
            }
        }
        DrawingKind::Triangle => {
            geo.push(ShapePart::Polygon {
                corners: SmallVec::from_slice(&points[..3]),
                filled: props.is_filled(),
            });
        }
        DrawingKind::RotatedRectangle => {
            geo.push(ShapePart::Polygon {
                corners: SmallVec::from_slice(&rotated_rectangle(p0, points[1], points[2])),
                filled: props.is_filled(),
            });
        }
        DrawingKind::ParallelChannel => {
            let p1 = points[1];
            let (dx, dy) = channel_offset(p0, p1, points[2]);
            let (q0, q1) = (p0.offset(dx, dy), p1.offset(dx, dy));
            if props.is_filled() {
                geo.push(ShapePart::Polygon {
                    corners: SmallVec::from_slice(&[p0, p1, q1, q0]),
                    filled: true,
                });
            }
            geo.segment(p0, p1);
            geo.segment(q0, q1);
            geo.push(ShapePart::Segment {
                from: p0.offset(dx / 2.0, dy / 2.0),
                to: p1.offset(dx / 2.0, dy / 2.0),
                guide: true,
            });
        }
        DrawingKind::Brush => geo.push(ShapePart::Polyline(points.to_vec())),
    }
    Some(geo)
}

/// Whether `cursor` touches any hittable part of `geometry`.
#[must_use]
pub fn hit_test(geometry: &DrawingGeometry, cursor: ScreenPoint, tolerance_px: f64) -> bool {
    geometry.parts.iter().any(|part| match part {
        ShapePart::Segment { from, to, .. } => {
            distance_to_segment(cursor, *from, *to) < tolerance_px
        }
        ShapePart::Polyline(points) => distance_to_polyline(cursor, points) < tolerance_px,
        ShapePart::Polygon { corners, filled } => {
            (*filled && point_in_polygon(cursor, corners))
                || distance_to_outline(cursor, corners) < tolerance_px
        }
        ShapePart::Circle {
            center,
            radius,
            filled,
        } => {
            let distance = cursor.distance_to(*center);
            if *filled {
                distance <= radius + tolerance_px
            } else {
                (distance - radius).abs() < tolerance_px
            }
        }
        ShapePart::Text { bounds, .. } => bounds.contains(cursor),
        ShapePart::Label { .. } => false,
    })
}

/// Draggable control points, one per anchor. Brush strokes only move as a
/// whole.
#[must_use]
pub fn handles(drawing: &Drawing, points: &[ScreenPoint]) -> SmallVec<[ScreenPoint; 4]> {
    if drawing.kind == DrawingKind::Brush {
        return SmallVec::new();
    }
    points.iter().copied().filter(|p| p.is_resolved()).collect()
}

/// Resolves what lies under `cursor`.
///
/// The selected drawing's handles are checked first; the nearest handle
/// within the handle radius wins. Remaining drawings are tested topmost
/// first, with `drawings` yielded bottom-to-top. Hidden drawings and those
/// rejected by `accept` are skipped.
#[must_use]
pub fn hit_test_drawings<'a, I, P, F>(
    drawings: I,
    selected: Option<&DrawingId>,
    cursor: ScreenPoint,
    projector: &P,
    ctx: &SceneContext,
    options: HitOptions,
    accept: F,
) -> Option<DrawingHit>
where
    I: IntoIterator<Item = &'a Drawing>,
    I::IntoIter: DoubleEndedIterator + Clone,
    P: PointProjector + ?Sized,
    F: Fn(&Drawing) -> bool,
{
    let drawings = drawings.into_iter();

    let selected_drawing = selected.and_then(|selected_id| {
        drawings
            .clone()
            .find(|d| &d.id == selected_id && d.is_visible() && accept(d))
    });
    if let Some(drawing) = selected_drawing {
        let points = project_points(drawing, projector);
        let nearest = handles(drawing, &points)
            .into_iter()
            .enumerate()
            .map(|(index, handle)| (OrderedFloat(handle.distance_to(cursor)), index))
            .filter(|(distance, _)| distance.0 <= options.handle_radius_px)
            .min();
        if let Some((_, index)) = nearest {
            return Some(DrawingHit {
                id: drawing.id.clone(),
                target: HitTarget::Handle(index),
            });
        }
    }

    drawings
        .rev()
        .filter(|d| d.is_visible() && accept(d))
        .find(|drawing| {
            let points = project_points(drawing, projector);
            geometry(drawing, &points, ctx)
                .is_some_and(|geo| hit_test(&geo, cursor, options.tolerance_px))
        })
        .map(|drawing| DrawingHit {
            id: drawing.id.clone(),
            target: HitTarget::Body,
        })
}

fn box_corners(a: ScreenPoint, b: ScreenPoint) -> SmallVec<[ScreenPoint; 4]> {
    let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
    let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
    SmallVec::from_slice(&[
        ScreenPoint::new(min_x, min_y),
        ScreenPoint::new(max_x, min_y),
        ScreenPoint::new(max_x, max_y),
        ScreenPoint::new(min_x, max_y),
    ])
}

/// Box estimated from character count: `0.6 × font` per character and
/// `1.2 × font` per line, anchored at the top edge.
#[must_use]
pub fn text_bounds(
    anchor: ScreenPoint,
    content: &str,
    font_size: f64,
    align: TextAlign,
) -> TextBounds {
    let longest = content.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let lines = content.lines().count().max(1);
    let width = longest as f64 * font_size * CHAR_WIDTH_RATIO;
    let height = lines as f64 * font_size * LINE_HEIGHT_RATIO;
    let min_x = match align {
        TextAlign::Left => anchor.x,
        TextAlign::Center => anchor.x - width / 2.0,
        TextAlign::Right => anchor.x - width,
    };
    TextBounds {
        min: ScreenPoint::new(min_x, anchor.y),
        max: ScreenPoint::new(min_x + width, anchor.y + height),
    }
}

fn range_caption(drawing: &Drawing, bar_duration_ms: i64) -> String {
    let (a, b) = (drawing.points[0], drawing.points[1]);
    let delta = b.price - a.price;
    let pct = if a.price != 0.0 {
        delta / a.price * 100.0
    } else {
        0.0
    };
    let span_ms = b.time - a.time;
    let bars = if bar_duration_ms > 0 {
        span_ms / bar_duration_ms
    } else {
        0
    };
    let price_part = format!("{}{} ({pct:+.2}%)", sign(delta), format_price(delta.abs()));
    let time_part = format!("{bars} bars, {}", format_duration(span_ms));
    match drawing.kind {
        DrawingKind::PriceRange => price_part,
        DrawingKind::DateRange => time_part,
        _ => format!("{price_part} | {time_part}"),
    }
}

fn sign(value: f64) -> &'static str {
    if value < 0.0 { "-" } else { "+" }
}

/// Decimal places scaled to magnitude.
#[must_use]
pub fn format_price(value: f64) -> String {
    let decimals = match value.abs() {
        v if v >= 100.0 => 2,
        v if v >= 1.0 => 4,
        _ => 6,
    };
    format!("{value:.decimals$}")
}

#[must_use]
pub fn format_duration(span_ms: i64) -> String {
    let negative = span_ms < 0;
    let minutes = span_ms.unsigned_abs() / 60_000;
    let (days, hours, mins) = (minutes / 1_440, minutes / 60 % 24, minutes % 60);
    let body = match (days, hours, mins) {
        (0, 0, m) => format!("{m}m"),
        (0, h, 0) => format!("{h}h"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, 0, _) => format!("{d}d"),
        (d, h, _) => format!("{d}d {h}h"),
    };
    if negative { format!("-{body}") } else { body }
}

#[cfg(test)]
mod tests {
    use super::{
        DrawingGeometry, HitOptions, HitTarget, PointProjector, SceneContext, ShapePart,
        format_duration, geometry, hit_test, hit_test_drawings,
    };
    use crate::core::{ScreenPoint, Viewport};
    use crate::drawing::types::{
        Drawing, DrawingKind, DrawingPoint, DrawingProperties, PointArity,
    };

    /// time ms → x, price → y, unchanged.
    struct Identity;

    impl PointProjector for Identity {
        fn project(&self, point: DrawingPoint) -> ScreenPoint {
            ScreenPoint::new(point.time as f64, point.price)
        }
    }

    fn ctx() -> SceneContext {
        SceneContext {
            viewport: Viewport::new(400, 300),
            bar_duration_ms: 60_000,
        }
    }

    fn drawing(kind: DrawingKind, points: &[(i64, f64)]) -> Drawing {
        Drawing::new(
            kind,
            points.iter().map(|(t, p)| DrawingPoint::new(*t, *p)).collect(),
            DrawingProperties::default(),
        )
        .expect("drawing")
    }

    fn geo(d: &Drawing) -> DrawingGeometry {
        let points: Vec<ScreenPoint> = d.points.iter().map(|p| Identity.project(*p)).collect();
        geometry(d, &points, &ctx()).expect("geometry")
    }

    #[test]
    fn every_kind_has_geometry_at_full_arity() {
        for kind in DrawingKind::ALL {
            let count = match kind.arity() {
                PointArity::Fixed(n) => n,
                PointArity::AtLeast(n) => n + 2,
            };
            let points: Vec<(i64, f64)> = (0..count)
                .map(|i| (50 + 40 * i as i64, 50.0 + 25.0 * i as f64))
                .collect();
            let d = drawing(kind, &points);
            assert!(!geo(&d).parts.is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn off_screen_anchor_yields_no_geometry() {
        let d = drawing(DrawingKind::TrendLine, &[(10, 10.0), (20, 20.0)]);
        let points = [ScreenPoint::new(10.0, 10.0), ScreenPoint::OFF_SCREEN];
        assert!(geometry(&d, &points, &ctx()).is_none());
    }

    #[test]
    fn horizontal_line_tests_y_distance_only() {
        let d = drawing(DrawingKind::HorizontalLine, &[(100, 50.0)]);
        let g = geo(&d);
        assert!(hit_test(&g, ScreenPoint::new(390.0, 54.0), 6.0));
        assert!(!hit_test(&g, ScreenPoint::new(390.0, 57.0), 6.0));
    }

    #[test]
    fn outlined_rectangle_needs_edge_proximity() {
        let d = drawing(DrawingKind::Rectangle, &[(100, 100.0), (200, 200.0)]);
        let g = geo(&d);
        assert!(!hit_test(&g, ScreenPoint::new(150.0, 150.0), 6.0));
        assert!(hit_test(&g, ScreenPoint::new(102.0, 150.0), 6.0));

        let mut filled = d.clone();
        filled.properties.filled = Some(true);
        assert!(hit_test(&geo(&filled), ScreenPoint::new(150.0, 150.0), 6.0));
    }

    #[test]
    fn text_hit_uses_estimated_box() {
        let mut d = drawing(DrawingKind::Text, &[(100, 100.0)]);
        d.properties.text = Some("hello".to_owned());
        d.properties.font_size = Some(10.0);
        let g = geo(&d);
        assert!(hit_test(&g, ScreenPoint::new(128.0, 110.0), 6.0));
        assert!(!hit_test(&g, ScreenPoint::new(131.0, 110.0), 6.0));
        assert!(matches!(g.parts[0], ShapePart::Text { .. }));
    }

    #[test]
    fn fib_labels_are_not_hittable() {
        let d = drawing(DrawingKind::FibRetracement, &[(100, 100.0), (200, 200.0)]);
        let g = geo(&d);
        let labels = g
            .parts
            .iter()
            .filter(|part| matches!(part, ShapePart::Label { .. }))
            .count();
        assert_eq!(labels, 7);
        assert!(hit_test(&g, ScreenPoint::new(150.0, 161.8), 6.0));
    }

    #[test]
    fn topmost_drawing_wins_and_selected_handles_take_priority() {
        let bottom = drawing(DrawingKind::HorizontalLine, &[(100, 100.0)]);
        let top = drawing(DrawingKind::VerticalLine, &[(100, 100.0)]);
        let set = vec![bottom.clone(), top.clone()];
        let options = HitOptions::default();
        let cursor = ScreenPoint::new(101.0, 101.0);

        let hit = hit_test_drawings(&set, None, cursor, &Identity, &ctx(), options, |_| true)
            .expect("hit");
        assert_eq!(hit.id, top.id);
        assert_eq!(hit.target, HitTarget::Body);

        let hit = hit_test_drawings(
            &set,
            Some(&bottom.id),
            cursor,
            &Identity,
            &ctx(),
            options,
            |_| true,
        )
        .expect("hit");
        assert_eq!(hit.id, bottom.id);
        assert_eq!(hit.target, HitTarget::Handle(0));
    }

    #[test]
    fn hidden_drawings_are_skipped() {
        let mut hidden = drawing(DrawingKind::HorizontalLine, &[(100, 100.0)]);
        hidden.properties.visible = false;
        let set = vec![hidden];
        let hit = hit_test_drawings(
            &set,
            None,
            ScreenPoint::new(50.0, 100.0),
            &Identity,
            &ctx(),
            HitOptions::default(),
            |_| true,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(45 * 60_000), "45m");
        assert_eq!(format_duration(90 * 60_000), "1h 30m");
        assert_eq!(format_duration(28 * 3_600_000), "1d 4h");
    }
}
