use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathError, Result};
use crate::geometry::surface::{OffsetSurface, Plane, Surface};
use crate::math::polygon_2d::dedup_closed;
use crate::math::{Point2, Point3, Vector2, FZERO};
use crate::milling::Stock;
use crate::operations::contour::{union_all, Rect};
use crate::operations::intersection::{Intersection, IntersectionParams};
use crate::operations::segment_graph::SegmentGraph;
use crate::scene::Scene;

use super::common::{at_height, finish, join_with_lifts, Toolpath};

/// Extra search seed for one surface, for surfaces whose offset meets the
/// base plane in more than one curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourHint {
    pub surface: String,
    pub point: [f64; 3],
}

/// Parameters of the flat base pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTwoParams {
    /// Radius of the flat cutter.
    pub cutter_radius: f64,
    /// Distance between vertical cutting lines.
    pub line_spacing: f64,
    pub translate_back: bool,
    pub intersection: IntersectionParams,
    /// One search per hint instead of a single unbiased search.
    pub hints: Vec<ContourHint>,
}

impl Default for StageTwoParams {
    fn default() -> Self {
        Self {
            cutter_radius: 5.0,
            line_spacing: 8.0,
            translate_back: false,
            intersection: IntersectionParams::default().with_step(0.2),
            hints: Vec::new(),
        }
    }
}

/// Clears the base plane around the parts with a flat cutter.
#[derive(Debug, Clone, Default)]
pub struct StageTwo {
    params: StageTwoParams,
}

impl StageTwo {
    #[must_use]
    pub fn new(params: StageTwoParams) -> Self {
        Self { params }
    }

    /// Offset contours of every surface crossing the base plane, merged
    /// where they overlap.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::IntersectionNotFound`] when a surface whose
    /// offset bounds straddle the base plane yields no curve.
    pub fn contours(&self, scene: &Scene, stock: &Stock) -> Result<Vec<Vec<Point2>>> {
        let r = self.params.cutter_radius;
        let half = stock.half_extents() + Vector2::repeat(4.0 * r);
        let base = Plane::horizontal(
            Point3::new(stock.center_x, stock.center_y, stock.base_height),
            half.x,
            half.y,
        )?;
        let mut solver = Intersection::new(self.params.intersection.clone());
        let mut curves = Vec::new();

        for (name, surface) in scene.surfaces() {
            let offset = OffsetSurface::new(surface, r);
            let bounds = offset.world_bounds();
            let straddles = bounds.min.z < stock.base_height - FZERO
                && bounds.max.z > stock.base_height + FZERO;
            if !straddles {
                continue;
            }
            let mut hints: Vec<Option<Point3>> = self
                .params
                .hints
                .iter()
                .filter(|h| h.surface == name)
                .map(|h| Some(Point3::from(h.point)))
                .collect();
            if hints.is_empty() {
                hints.push(None);
            }
            for hint in hints {
                let status = solver.find(&offset, &base, hint);
                if !status.is_success() {
                    return Err(PathError::IntersectionNotFound {
                        first: name.to_owned(),
                        second: "base plane".into(),
                        status,
                    }
                    .into());
                }
                let curve: Vec<Point2> = solver
                    .take_points()
                    .iter()
                    .map(|p| Point2::new(p.pos.x, p.pos.y))
                    .collect();
                // An open curve is closed by its chord.
                let curve = dedup_closed(&curve, FZERO);
                debug!(surface = name, points = curve.len(), "base contour");
                if curve.len() >= 3 {
                    curves.push(curve);
                }
            }
        }
        Ok(union_all(&curves))
    }

    /// Generates the base pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a contour cannot be found or the cut graph
    /// cannot be built.
    pub fn execute(&self, scene: &Scene, stock: &Stock) -> Result<Toolpath> {
        let r = self.params.cutter_radius;
        if r <= 0.0 || self.params.line_spacing <= 0.0 {
            return Err(
                PathError::InvalidInput("stage two needs a positive radius and spacing".into())
                    .into(),
            );
        }
        let contours = self.contours(scene, stock)?;
        let rect = Rect::centered(stock.center(), stock.half_extents() + Vector2::repeat(r));
        let xs = cutting_lines(&rect, self.params.line_spacing);
        let graph = SegmentGraph::from_vertical_lines(&rect, &contours, &xs, FZERO)?;

        let z = stock.base_height;
        let mut passes = Vec::new();
        if let Some(start) = graph.nearest_vertex(&rect.min) {
            for walk in graph.traverse_all(start) {
                passes.push(at_height(&graph.walk_points(&walk)?, z));
            }
        }
        for contour in &contours {
            let mut lp: Vec<Point2> = contour.iter().map(|p| rect.clamp(p)).collect();
            if let Some(&first) = lp.first() {
                lp.push(first);
            }
            passes.push(at_height(&lp, z));
        }

        let path = finish(join_with_lifts(&passes, stock), stock, self.params.translate_back);
        info!(
            contours = contours.len(),
            lines = xs.len(),
            points = path.len(),
            "stage two path generated"
        );
        Ok(path)
    }
}

/// Evenly spaced vertical lines kept just inside the rectangle.
fn cutting_lines(rect: &Rect, spacing: f64) -> Vec<f64> {
    let inset = 1e-3;
    let width = rect.width() - 2.0 * inset;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = ((width / spacing).ceil() as usize).max(1);
    (0..=n)
        .map(|k| rect.min.x + inset + width * k as f64 / n as f64)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::BezierSurface;
    use crate::math::polygon_2d::signed_area;
    use crate::scene::Geometry;

    fn stock() -> Stock {
        Stock {
            size_x: 60.0,
            size_y: 60.0,
            ..Stock::default()
        }
    }

    fn cylinder_scene(radius: f64) -> Scene {
        let mut scene = Scene::new();
        let cyl = BezierSurface::cylinder(Point3::new(0.0, 0.0, 5.0), radius, 20.0, 4, 1).unwrap();
        scene.add_named("post", Geometry::Bezier(cyl)).unwrap();
        scene
    }

    #[test]
    fn cutting_lines_cover_rect() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(10.0, 4.0));
        let xs = cutting_lines(&rect, 3.0);
        assert_eq!(xs.len(), 5);
        assert!(xs[0] > 0.0 && xs[4] < 10.0);
        assert!(xs.windows(2).all(|w| w[1] - w[0] <= 3.0));
    }

    #[test]
    fn cylinder_contour_is_offset_circle() {
        let scene = cylinder_scene(10.0);
        let contours = StageTwo::default().contours(&scene, &stock()).unwrap();
        assert_eq!(contours.len(), 1);
        for p in &contours[0] {
            let r = p.coords.norm();
            assert!((r - 15.0).abs() < 0.1, "r = {r}");
        }
        let area = signed_area(&contours[0]).abs();
        assert!((area - std::f64::consts::PI * 225.0).abs() < 5.0);
    }

    #[test]
    fn path_stays_on_base_outside_contour() {
        let s = stock();
        let scene = cylinder_scene(10.0);
        let path = StageTwo::default().execute(&scene, &s).unwrap();
        assert!((path[0].z - s.safe_height()).abs() < 1e-12);
        for p in path.iter().filter(|p| p.z < s.safe_height()) {
            assert!((p.z - s.base_height).abs() < 1e-12);
            assert!(p.coords.xy().norm() > 15.0 - 0.2);
            assert!(p.x.abs() <= 35.0 + 1e-9 && p.y.abs() <= 35.0 + 1e-9);
        }
    }

    #[test]
    fn empty_scene_clears_whole_rect() {
        let s = stock();
        let path = StageTwo::default().execute(&Scene::new(), &s).unwrap();
        let xs: Vec<f64> = path.iter().map(|p| p.x).collect();
        let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(min < -34.9 && max > 34.9);
    }

    #[test]
    fn surface_above_base_is_ignored() {
        let mut scene = Scene::new();
        let flat = BezierSurface::flat(Point3::new(-5.0, -5.0, 40.0), 10.0, 10.0, 1, 1).unwrap();
        scene.add(Geometry::Bezier(flat));
        assert!(StageTwo::default().contours(&scene, &stock()).unwrap().is_empty());
    }
}
