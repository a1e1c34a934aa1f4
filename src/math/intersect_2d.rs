use super::{Point2, TOLERANCE};

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are the parameters
/// on the first and second segment, both in `[0, 1]`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * db.y - dy * db.x) / cross;
    let u = (dx * da.y - dy * da.x) / cross;

    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t = t.clamp(0.0, 1.0);
        Some((a0 + da * t, t, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Crossing of segment `a`-`b` with the vertical line `x = c`.
///
/// Uses a half-open rule on the segment (`a` included, `b` excluded when the
/// line passes exactly through it) so that a polygon vertex lying on the line
/// is counted once. Returns the segment parameter.
#[must_use]
pub fn crossing_with_vertical(a: &Point2, b: &Point2, c: f64) -> Option<f64> {
    let a_left = a.x < c;
    let b_left = b.x < c;
    if a_left == b_left {
        return None;
    }
    let dx = b.x - a.x;
    if dx.abs() < TOLERANCE {
        return None;
    }
    Some(((c - a.x) / dx).clamp(0.0, 1.0))
}
