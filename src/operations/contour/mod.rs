//! Closed-contour combination in a 2D frame (stock XY or surface UV).

pub mod boolean;
pub mod boundary;

pub use boolean::{boolean, overlaps, union_all, BooleanOp};
pub use boundary::Rect;

use crate::math::polygon_2d::{contains, signed_area, to_ccw};
use crate::math::Point2;

/// A planar region bounded by closed loops.
///
/// Counter-clockwise loops bound material, clockwise loops are holes. Holes
/// never overlap each other and lie inside some outer loop.
#[derive(Debug, Clone, Default)]
pub struct Region {
    loops: Vec<Vec<Point2>>,
}

impl Region {
    /// The full rectangle.
    #[must_use]
    pub fn rect(rect: &Rect) -> Self {
        Self {
            loops: vec![rect.corners()],
        }
    }

    /// A region from loops that already follow the orientation convention.
    #[must_use]
    pub fn from_loops(loops: Vec<Vec<Point2>>) -> Self {
        Self { loops }
    }

    /// All boundary loops.
    #[must_use]
    pub fn loops(&self) -> &[Vec<Point2>] {
        &self.loops
    }

    /// Returns `true` if the region has no material loop.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outers().next().is_none()
    }

    /// Counter-clockwise loops.
    pub fn outers(&self) -> impl Iterator<Item = &Vec<Point2>> {
        self.loops.iter().filter(|l| signed_area(l) > 0.0)
    }

    /// Clockwise loops.
    pub fn holes(&self) -> impl Iterator<Item = &Vec<Point2>> {
        self.loops.iter().filter(|l| signed_area(l) < 0.0)
    }

    /// Signed total area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.loops.iter().map(|l| signed_area(l)).sum()
    }

    /// Returns `true` if `p` lies in the region.
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        self.outers().any(|o| contains(o, p)) && !self.holes().any(|h| contains(h, p))
    }

    /// The part of the region inside `polygon`.
    #[must_use]
    pub fn intersect(&self, polygon: &[Point2]) -> Self {
        let mut outers = Vec::new();
        for outer in self.outers() {
            outers.extend(boolean(outer, polygon, BooleanOp::Intersection));
        }
        let mut result = Self { loops: outers };
        let holes: Vec<Vec<Point2>> = self.holes().cloned().collect();
        for hole in holes {
            result = result.subtract(&hole);
        }
        result
    }

    /// The region with `polygon` removed.
    #[must_use]
    pub fn subtract(&self, polygon: &[Point2]) -> Self {
        let mut cut = to_ccw(polygon);
        let mut kept_holes = Vec::new();
        for hole in self.holes() {
            let hole = to_ccw(hole);
            if overlaps(&hole, &cut) {
                let mut merged = boolean(&cut, &hole, BooleanOp::Union);
                merged.sort_by(|a, b| signed_area(b).total_cmp(&signed_area(a)));
                if let Some(outer) = merged.into_iter().next() {
                    cut = outer;
                }
            } else {
                kept_holes.push(hole.into_iter().rev().collect());
            }
        }
        let mut loops = Vec::new();
        for outer in self.outers() {
            loops.extend(boolean(outer, &cut, BooleanOp::Difference));
        }
        loops.extend(kept_holes);
        Self { loops }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Vec<Point2> {
        vec![
            Point2::new(x, y),
            Point2::new(x + s, y),
            Point2::new(x + s, y + s),
            Point2::new(x, y + s),
        ]
    }

    #[test]
    fn rect_with_hole() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0));
        let r = Region::rect(&rect).subtract(&square(1.0, 1.0, 1.0));
        assert!((r.area() - 15.0).abs() < 1e-9);
        assert!(r.contains(&Point2::new(3.0, 3.0)));
        assert!(!r.contains(&Point2::new(1.5, 1.5)));
        assert_eq!(r.holes().count(), 1);
    }

    #[test]
    fn overlapping_holes_merge() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0));
        let r = Region::rect(&rect)
            .subtract(&square(1.0, 1.0, 1.0))
            .subtract(&square(1.5, 1.5, 1.0));
        assert_eq!(r.holes().count(), 1);
        assert!((r.area() - (16.0 - 1.75)).abs() < 1e-9);
    }

    #[test]
    fn intersect_keeps_holes() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0));
        let r = Region::rect(&rect)
            .subtract(&square(1.0, 1.0, 1.0))
            .intersect(&square(-1.0, -1.0, 4.0));
        assert!((r.area() - 8.0).abs() < 1e-9);
        assert!(!r.contains(&Point2::new(1.5, 1.5)));
        assert!(!r.is_empty());
    }

    #[test]
    fn hole_cut_open_by_boundary() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0));
        let r = Region::rect(&rect)
            .subtract(&square(1.0, 1.0, 1.0))
            .subtract(&square(1.5, -1.0, 2.2));
        assert_eq!(r.holes().count(), 0);
        // Removed: the first square plus the in-stock part of the second,
        // minus their 0.5 x 0.2 overlap.
        assert!((r.area() - (16.0 - 1.0 - 2.64 + 0.1)).abs() < 1e-9);
    }
}
