//! Screen-space math shared by the drawing catalog.

use crate::core::{ScreenPoint, Viewport};

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: ScreenPoint, a: ScreenPoint, b: ScreenPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(ScreenPoint::new(a.x + t * dx, a.y + t * dy))
}

/// Even-odd ray casting.
#[must_use]
pub fn point_in_polygon(p: ScreenPoint, corners: &[ScreenPoint]) -> bool {
    if corners.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = corners.len() - 1;
    for i in 0..corners.len() {
        let (a, b) = (corners[i], corners[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the closed outline through `corners`.
#[must_use]
pub fn distance_to_outline(p: ScreenPoint, corners: &[ScreenPoint]) -> f64 {
    match corners.len() {
        0 => f64::INFINITY,
        1 => p.distance_to(corners[0]),
        n => (0..n)
            .map(|i| distance_to_segment(p, corners[i], corners[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from `p` to the open polyline through `points`.
#[must_use]
pub fn distance_to_polyline(p: ScreenPoint, points: &[ScreenPoint]) -> f64 {
    match points.len() {
        0 => f64::INFINITY,
        1 => p.distance_to(points[0]),
        _ => points
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Parameter along `origin + t * dir` where the ray leaves the viewport.
fn exit_parameter(origin: ScreenPoint, dx: f64, dy: f64, viewport: Viewport) -> f64 {
    let bound = |pos: f64, delta: f64, max: f64| {
        if delta > 0.0 {
            (max - pos) / delta
        } else if delta < 0.0 {
            -pos / delta
        } else {
            f64::INFINITY
        }
    };
    bound(origin.x, dx, viewport.width_px()).min(bound(origin.y, dy, viewport.height_px()))
}

/// Extends `a → b` past `b` to the viewport border. Never shorter than the
/// original segment.
#[must_use]
pub fn extend_ray(a: ScreenPoint, b: ScreenPoint, viewport: Viewport) -> ScreenPoint {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx.abs() <= f64::EPSILON && dy.abs() <= f64::EPSILON {
        return b;
    }
    let t = exit_parameter(a, dx, dy, viewport).max(1.0);
    if !t.is_finite() {
        return b;
    }
    ScreenPoint::new(a.x + t * dx, a.y + t * dy)
}

/// Extends the line through `a` and `b` to the viewport border on both sides.
#[must_use]
pub fn extend_line(
    a: ScreenPoint,
    b: ScreenPoint,
    viewport: Viewport,
) -> (ScreenPoint, ScreenPoint) {
    (extend_ray(b, a, viewport), extend_ray(a, b, viewport))
}

/// Corners of a rectangle whose base edge is `a`–`b` and whose height is the
/// perpendicular offset of `c` from that edge.
#[must_use]
pub fn rotated_rectangle(a: ScreenPoint, b: ScreenPoint, c: ScreenPoint) -> [ScreenPoint; 4] {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len <= f64::EPSILON {
        return [a, b, b, a];
    }
    let height = (dx * (c.y - a.y) - dy * (c.x - a.x)) / len;
    let (nx, ny) = (-dy / len * height, dx / len * height);
    [a, b, b.offset(nx, ny), a.offset(nx, ny)]
}

/// Offset that moves the line `a`–`b` onto `c`: vertical for non-vertical
/// lines, horizontal otherwise.
#[must_use]
pub fn channel_offset(a: ScreenPoint, b: ScreenPoint, c: ScreenPoint) -> (f64, f64) {
    let dx = b.x - a.x;
    if dx.abs() <= f64::EPSILON {
        return (c.x - a.x, 0.0);
    }
    let line_y = a.y + (b.y - a.y) * (c.x - a.x) / dx;
    (0.0, c.y - line_y)
}

/// Two barbs for an arrow head at `tip`, pointing away from `tail`.
#[must_use]
pub fn arrow_head(tail: ScreenPoint, tip: ScreenPoint, length: f64) -> [ScreenPoint; 2] {
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let spread = 25f64.to_radians();
    let barb = |offset: f64| {
        let a = angle + std::f64::consts::PI + offset;
        tip.offset(length * a.cos(), length * a.sin())
    };
    [barb(spread), barb(-spread)]
}
