//! Brush stroke post-processing: moving-average smoothing followed by
//! Ramer–Douglas–Peucker simplification.

use crate::core::ScreenPoint;
use crate::drawing::geometry::distance_to_segment;

/// One pass of a 3-point moving average. Endpoints are kept fixed.
#[must_use]
pub fn moving_average(points: &[ScreenPoint]) -> Vec<ScreenPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for w in points.windows(3) {
        out.push(ScreenPoint::new(
            (w[0].x + w[1].x + w[2].x) / 3.0,
            (w[0].y + w[1].y + w[2].y) / 3.0,
        ));
    }
    out.push(points[points.len() - 1]);
    out
}

/// Removes points closer than `epsilon` to the chord of their span. With
/// `epsilon == 0.0` only exactly collinear points are dropped.
#[must_use]
pub fn simplify_rdp(points: &[ScreenPoint], epsilon: f64) -> Vec<ScreenPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (index, distance) = ((start + 1)..end)
            .map(|i| (i, distance_to_segment(points[i], points[start], points[end])))
            .fold((start, -1.0), |best, item| if item.1 > best.1 { item } else { best });
        if distance > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// `iterations` moving-average passes, then simplification.
#[must_use]
pub fn smooth_stroke(points: &[ScreenPoint], iterations: u32, epsilon: f64) -> Vec<ScreenPoint> {
    let mut current = points.to_vec();
    for _ in 0..iterations {
        current = moving_average(&current);
    }
    simplify_rdp(&current, epsilon.max(0.0))
}
