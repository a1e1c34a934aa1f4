use super::Point2;

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns the polygon in counter-clockwise order.
#[must_use]
pub fn to_ccw(points: &[Point2]) -> Vec<Point2> {
    if signed_area(points) < 0.0 {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

/// Winding number of a closed polygon around `p`.
///
/// Zero means `p` lies outside. Points exactly on an edge may report either
/// value.
#[must_use]
pub fn winding_number(polygon: &[Point2], p: &Point2) -> i32 {
    let n = polygon.len();
    let mut wn = 0;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        let side = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                wn += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            wn -= 1;
        }
    }
    wn
}

/// Returns `true` if `p` lies inside the closed polygon.
#[must_use]
pub fn contains(polygon: &[Point2], p: &Point2) -> bool {
    winding_number(polygon, p) != 0
}

/// Total length of an open polyline.
#[must_use]
pub fn polyline_length(points: &[Point2]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Removes consecutive duplicates (closer than `eps`), including the closing
/// duplicate of a closed polygon.
#[must_use]
pub fn dedup_closed(points: &[Point2], eps: f64) -> Vec<Point2> {
    let mut out: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_none_or(|q| (p - q).norm() > eps) {
            out.push(*p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= eps {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn signed_area_ccw_square() {
        assert!((signed_area(&square()) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let cw: Vec<Point2> = square().into_iter().rev().collect();
        assert!((signed_area(&cw) + 1.0).abs() < TOLERANCE);
        assert!((signed_area(&to_ccw(&cw)) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn winding_inside_and_outside() {
        let sq = square();
        assert_eq!(winding_number(&sq, &Point2::new(0.5, 0.5)), 1);
        assert_eq!(winding_number(&sq, &Point2::new(1.5, 0.5)), 0);
        let cw: Vec<Point2> = sq.into_iter().rev().collect();
        assert_eq!(winding_number(&cw, &Point2::new(0.5, 0.5)), -1);
    }

    #[test]
    fn dedup_drops_closing_duplicate() {
        let mut pts = square();
        pts.push(Point2::new(0.0, 0.0));
        pts.insert(1, Point2::new(0.0, 0.0));
        assert_eq!(dedup_closed(&pts, 1e-9).len(), 4);
    }
}
