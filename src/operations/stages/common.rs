use crate::math::{Point2, Point3, Vector3};
use crate::milling::Stock;

/// Ordered tool tip positions.
pub type Toolpath = Vec<Point3>;

/// Area of the triangle `a, b, c` in space.
fn triangle_area_3d(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Drops points that span at most `max_area` with the last kept point and
/// the following point. The first and last points are always kept.
#[must_use]
pub fn remove_collinear(points: &[Point3], max_area: f64) -> Toolpath {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for w in points.windows(2).skip(1) {
        let (p, next) = (&w[0], &w[1]);
        let anchor = out[out.len() - 1];
        if (p - anchor).norm() <= f64::EPSILON {
            continue;
        }
        if triangle_area_3d(&anchor, p, next) > max_area {
            out.push(*p);
        }
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

/// Joins passes into one path, lifting to the safe height between them.
#[must_use]
pub fn join_with_lifts(passes: &[Toolpath], stock: &Stock) -> Toolpath {
    let mut out: Toolpath = Vec::new();
    for pass in passes.iter().filter(|p| !p.is_empty()) {
        if let (Some(prev), Some(first)) = (out.last().copied(), pass.first()) {
            out.push(stock.above(&prev));
            out.push(stock.above(first));
        }
        out.extend_from_slice(pass);
    }
    out
}

/// Adds an approach from and a retreat to the safe height.
#[must_use]
pub fn with_safe_ends(path: Toolpath, stock: &Stock) -> Toolpath {
    let (Some(first), Some(last)) = (path.first().copied(), path.last().copied()) else {
        return path;
    };
    let mut out = Vec::with_capacity(path.len() + 2);
    out.push(stock.above(&first));
    out.extend(path);
    out.push(stock.above(&last));
    out
}

/// Moves a path so the stock centre lands on the origin.
#[must_use]
pub fn translate_back(path: Toolpath, stock: &Stock) -> Toolpath {
    let shift = Vector3::new(stock.center_x, stock.center_y, 0.0);
    path.into_iter().map(|p| p - shift).collect()
}

/// Safe ends plus the optional re-centring every stage applies last.
pub(crate) fn finish(path: Toolpath, stock: &Stock, recenter: bool) -> Toolpath {
    let path = with_safe_ends(path, stock);
    if recenter {
        translate_back(path, stock)
    } else {
        path
    }
}

/// Lifts a planar polyline to height `z`.
pub(crate) fn at_height(points: &[Point2], z: f64) -> Toolpath {
    points.iter().map(|p| Point3::new(p.x, p.y, z)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn collinear_points_are_dropped() {
        let pts: Vec<Point3> = (0..10)
            .map(|k| Point3::new(f64::from(k), 0.0, 5.0))
            .chain(std::iter::once(Point3::new(9.0, 4.0, 5.0)))
            .collect();
        let out = remove_collinear(&pts, 1e-9);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], Point3::new(9.0, 0.0, 5.0));
    }

    #[test]
    fn duplicates_are_dropped() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let out = remove_collinear(&[Point3::origin(), p, p, Point3::new(1.0, 3.0, 1.0)], 1e-9);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn lifts_between_passes() {
        let stock = Stock::default();
        let a = vec![Point3::new(0.0, 0.0, 20.0), Point3::new(1.0, 0.0, 20.0)];
        let b = vec![Point3::new(5.0, 5.0, 20.0)];
        let joined = join_with_lifts(&[a, Vec::new(), b], &stock);
        assert_eq!(joined.len(), 5);
        assert!((joined[2].z - stock.safe_height()).abs() < 1e-12);
        assert!((joined[3].x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn finish_recenters() {
        let stock = Stock {
            center_x: 10.0,
            center_y: -4.0,
            ..Stock::default()
        };
        let path = finish(vec![Point3::new(10.0, -4.0, 20.0)], &stock, true);
        assert_eq!(path.len(), 3);
        assert!((path[1] - Point3::new(0.0, 0.0, 20.0)).norm() < 1e-12);
        assert!((path[0].z - stock.safe_height()).abs() < 1e-12);
    }
}
