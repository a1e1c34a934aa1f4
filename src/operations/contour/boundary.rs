use crate::math::{Point2, Vector2};

/// Axis-aligned rectangle in a 2D frame (stock footprint or UV domain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Rect {
    /// Creates a rectangle from two opposite corners.
    #[must_use]
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Rectangle with the given centre and half extents.
    #[must_use]
    pub fn centered(center: Point2, half: Vector2) -> Self {
        Self::new(center - half, center + half)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Counter-clockwise corner loop starting at `min`.
    #[must_use]
    pub fn corners(&self) -> Vec<Point2> {
        vec![
            self.min,
            Point2::new(self.max.x, self.min.y),
            self.max,
            Point2::new(self.min.x, self.max.y),
        ]
    }

    /// Clamps `p` into the rectangle.
    #[must_use]
    pub fn clamp(&self, p: &Point2) -> Point2 {
        p.sup(&self.min).inf(&self.max)
    }

    /// Returns `true` if `p` lies within `eps` of the rectangle's border.
    #[must_use]
    pub fn on_border(&self, p: &Point2, eps: f64) -> bool {
        let inside = p.x >= self.min.x - eps
            && p.x <= self.max.x + eps
            && p.y >= self.min.y - eps
            && p.y <= self.max.y + eps;
        inside
            && ((p.x - self.min.x).abs() <= eps
                || (p.x - self.max.x).abs() <= eps
                || (p.y - self.min.y).abs() <= eps
                || (p.y - self.max.y).abs() <= eps)
    }

    /// Orthogonal projection onto the nearest side.
    #[must_use]
    pub fn snap_to_border(&self, p: &Point2) -> Point2 {
        let p = self.clamp(p);
        let candidates = [
            (p.x - self.min.x, Point2::new(self.min.x, p.y)),
            (self.max.x - p.x, Point2::new(self.max.x, p.y)),
            (p.y - self.min.y, Point2::new(p.x, self.min.y)),
            (self.max.y - p.y, Point2::new(p.x, self.max.y)),
        ];
        candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(p, |(_, q)| q)
    }

    /// Position of a border point along the perimeter, counter-clockwise
    /// from `min`.
    #[must_use]
    pub fn perimeter_position(&self, p: &Point2) -> f64 {
        let (w, h) = (self.width(), self.height());
        let p = self.snap_to_border(p);
        if (p.y - self.min.y).abs() <= f64::EPSILON && p.x < self.max.x {
            p.x - self.min.x
        } else if (p.x - self.max.x).abs() <= f64::EPSILON && p.y < self.max.y {
            w + (p.y - self.min.y)
        } else if (p.y - self.max.y).abs() <= f64::EPSILON && p.x > self.min.x {
            w + h + (self.max.x - p.x)
        } else {
            2.0 * w + h + (self.max.y - p.y)
        }
    }

    /// Corners passed when walking the border counter-clockwise from `from`
    /// to `to` (both border points, not included).
    #[must_use]
    pub fn walk_ccw(&self, from: &Point2, to: &Point2) -> Vec<Point2> {
        let (w, h) = (self.width(), self.height());
        let perimeter = 2.0 * (w + h);
        let s0 = self.perimeter_position(from);
        let mut s1 = self.perimeter_position(to);
        if s1 <= s0 {
            s1 += perimeter;
        }
        let corners = self.corners();
        let stations = [0.0, w, w + h, 2.0 * w + h];
        let mut out = Vec::new();
        for lap in 0..2 {
            for (k, &s) in stations.iter().enumerate() {
                let s = s + perimeter * f64::from(lap);
                if s > s0 && s < s1 {
                    out.push(corners[k]);
                }
            }
        }
        out
    }

    /// Closes an open curve whose ends lie on the border into the polygon
    /// left of it: the curve followed by the border walked counter-clockwise
    /// from its end back to its start.
    #[must_use]
    pub fn close_left(&self, curve: &[Point2]) -> Vec<Point2> {
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return Vec::new();
        };
        let start = self.snap_to_border(first);
        let end = self.snap_to_border(last);
        let mut poly = Vec::with_capacity(curve.len() + 6);
        poly.push(start);
        poly.extend(curve.iter().map(|p| self.clamp(p)));
        poly.push(end);
        poly.extend(self.walk_ccw(&end, &start));
        poly
    }

    /// The polygon right of an open curve.
    #[must_use]
    pub fn close_right(&self, curve: &[Point2]) -> Vec<Point2> {
        let reversed: Vec<Point2> = curve.iter().rev().copied().collect();
        self.close_left(&reversed)
    }
}
