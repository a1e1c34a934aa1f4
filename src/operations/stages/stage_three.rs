use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathError, Result};
use crate::geometry::surface::{OffsetSurface, Plane, Surface, SurfaceDomain};
use crate::math::polygon_2d::signed_area;
use crate::math::{Point2, Point3, Vector2, Vector3, FZERO, FZERO_UV};
use crate::milling::Stock;
use crate::operations::contour::{Rect, Region};
use crate::operations::intersection::{Intersection, IntersectionParams, PointOfIntersection};
use crate::operations::segment_graph::SegmentGraph;
use crate::scene::Scene;

use super::common::{finish, join_with_lifts, remove_collinear, Toolpath};

/// Which parameter stays constant along the cutting lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutDirection {
    #[default]
    ConstantU,
    ConstantV,
}

/// A surface that bounds a part, with an optional seed near the curve
/// where they meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborSpec {
    pub name: String,
    #[serde(default)]
    pub hint: Option<[f64; 3]>,
}

/// One named part to finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    pub name: String,
    /// Number of cutting lines across the parameter domain.
    pub lines: usize,
    #[serde(default)]
    pub direction: CutDirection,
    #[serde(default)]
    pub neighbors: Vec<NeighborSpec>,
}

/// Parameters of the finishing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThreeParams {
    /// Radius of the spherical cutter.
    pub cutter_radius: f64,
    /// Keep the cutter centre at least one radius above the base.
    pub base_plane: bool,
    /// Longest step along a cut, as a fraction of the parameter span.
    pub uv_step: f64,
    pub collinear_area: f64,
    pub translate_back: bool,
    pub intersection: IntersectionParams,
    pub parts: Vec<PartSpec>,
}

impl Default for StageThreeParams {
    fn default() -> Self {
        Self {
            cutter_radius: 4.0,
            base_plane: true,
            uv_step: 0.01,
            collinear_area: 1e-4,
            translate_back: false,
            intersection: IntersectionParams::default().with_step(0.1),
            parts: Vec::new(),
        }
    }
}

/// Finishing: every part is cut along parameter lines inside the region
/// its neighbours leave free.
#[derive(Debug, Clone, Default)]
pub struct StageThree {
    params: StageThreeParams,
}

/// Working plane of a part: parameter space, with the axes swapped when
/// cutting along constant `v`.
#[derive(Debug, Clone, Copy)]
struct Frame {
    swap: bool,
}

impl Frame {
    fn new(direction: CutDirection) -> Self {
        Self {
            swap: direction == CutDirection::ConstantV,
        }
    }

    fn map(self, p: Point2) -> Point2 {
        if self.swap {
            Point2::new(p.y, p.x)
        } else {
            p
        }
    }

    fn rect(self, d: &SurfaceDomain) -> Rect {
        Rect::new(
            self.map(Point2::new(d.u_min, d.v_min)),
            self.map(Point2::new(d.u_max, d.v_max)),
        )
    }
}

/// A stretch of an intersection curve that stays inside the part's domain.
struct Piece {
    points: Vec<PointOfIntersection>,
    is_loop: bool,
}

impl StageThree {
    #[must_use]
    pub fn new(params: StageThreeParams) -> Self {
        Self { params }
    }

    /// Generates the finishing path for every configured part.
    ///
    /// # Errors
    ///
    /// Returns an error if a part or neighbour is missing from the scene,
    /// a neighbour does not meet its part, or nothing of a part is left to
    /// machine.
    pub fn execute(&self, scene: &Scene, stock: &Stock) -> Result<Toolpath> {
        if self.params.cutter_radius <= 0.0 || self.params.uv_step <= 0.0 {
            return Err(PathError::InvalidInput(
                "stage three needs a positive radius and step".into(),
            )
            .into());
        }
        let r = self.params.cutter_radius;
        let half = stock.half_extents() + Vector2::repeat(4.0 * r);
        let base = Plane::horizontal(
            Point3::new(stock.center_x, stock.center_y, stock.base_height),
            half.x,
            half.y,
        )?;
        let mut solver = Intersection::new(self.params.intersection.clone());

        let mut passes = Vec::new();
        for part in &self.params.parts {
            let part_passes = self.part(scene, &base, part, &mut solver)?;
            debug!(part = %part.name, passes = part_passes.len(), "part cut");
            passes.extend(part_passes);
        }
        let path = finish(join_with_lifts(&passes, stock), stock, self.params.translate_back);
        info!(
            parts = self.params.parts.len(),
            points = path.len(),
            "stage three path generated"
        );
        Ok(path)
    }

    /// The machinable region of a part in its working plane.
    fn region(
        &self,
        scene: &Scene,
        base: &Plane,
        part: &PartSpec,
        offset: &OffsetSurface<'_>,
        solver: &mut Intersection,
    ) -> Result<Region> {
        let r = self.params.cutter_radius;
        let frame = Frame::new(part.direction);
        let rect = frame.rect(&offset.domain());
        let mut region = Region::rect(&rect);

        let mut neighbors: Vec<(&str, &dyn Surface, Option<Point3>)> = Vec::new();
        for n in &part.neighbors {
            let surface = scene.surface_by_name(&n.name)?;
            neighbors.push((n.name.as_str(), surface, n.hint.map(Point3::from)));
        }
        if self.params.base_plane {
            let level = base.origin().z + r;
            let bounds = offset.world_bounds();
            if bounds.min.z < level - FZERO && bounds.max.z > level + FZERO {
                neighbors.push(("base plane", base as &dyn Surface, None));
            }
        }

        for (name, surface, hint) in neighbors {
            let other = OffsetSurface::new(surface, r);
            let status = solver.find(offset, &other, hint);
            if !status.is_success() {
                return Err(PathError::IntersectionNotFound {
                    first: part.name.clone(),
                    second: name.to_owned(),
                    status,
                }
                .into());
            }
            let cyclic = solver.is_closed();
            let points = solver.take_points();
            let closed = (offset.is_u_closed(), offset.is_v_closed());
            for piece in split_at_seams(&points, &offset.domain(), closed, cyclic) {
                region = cut_region(&region, &rect, frame, &piece, offset, &other);
            }
            debug!(part = %part.name, neighbor = name, area = region.area(), "region trimmed");
        }
        if region.is_empty() {
            return Err(PathError::InvalidInput(format!(
                "nothing of part {} is left to machine",
                part.name
            ))
            .into());
        }
        Ok(region)
    }

    fn part(
        &self,
        scene: &Scene,
        base: &Plane,
        part: &PartSpec,
        solver: &mut Intersection,
    ) -> Result<Vec<Toolpath>> {
        if part.lines == 0 {
            return Err(
                PathError::InvalidInput(format!("part {} has no cutting lines", part.name)).into(),
            );
        }
        let r = self.params.cutter_radius;
        let surface = scene.surface_by_name(&part.name)?;
        let offset = OffsetSurface::new(surface, r);
        let frame = Frame::new(part.direction);
        let rect = frame.rect(&offset.domain());
        let region = self.region(scene, base, part, &offset, solver)?;

        let lines: Vec<f64> = (0..part.lines)
            .map(|k| rect.min.x + (k as f64 + 0.5) * rect.width() / part.lines as f64)
            .collect();
        let graph = SegmentGraph::from_inner_cuts(&region, &lines, FZERO_UV)?;
        let Some(start) = graph.nearest_vertex(&rect.min) else {
            return Ok(Vec::new());
        };

        let mut passes = Vec::new();
        for walk in graph.traverse_all(start) {
            let flat = densify(&graph.walk_points(&walk)?, &rect, self.params.uv_step);
            let tips: Toolpath = flat
                .iter()
                .map(|w| {
                    let uv = frame.map(*w);
                    offset.point(uv.x, uv.y) - Vector3::z() * r
                })
                .collect();
            passes.push(remove_collinear(&tips, self.params.collinear_area));
        }
        Ok(passes)
    }
}

/// Keeps the side of `piece` that lies outside the neighbour.
///
/// The side is probed just left of the piece's middle point: the probe is
/// outside when it lies on the positive side of the neighbour's normal.
fn cut_region(
    region: &Region,
    rect: &Rect,
    frame: Frame,
    piece: &Piece,
    part: &OffsetSurface<'_>,
    neighbor: &OffsetSurface<'_>,
) -> Region {
    let work: Vec<Point2> = piece.points.iter().map(|p| frame.map(p.first_uv())).collect();
    let m = work.len() / 2;
    let tangent = work[(m + 1).min(work.len() - 1)] - work[m.saturating_sub(1)];
    let Some(dir) = tangent.try_normalize(f64::EPSILON) else {
        return region.clone();
    };
    let left = Vector2::new(-dir.y, dir.x);
    let probe = frame.map(work[m] + left * (1e-3 * rect.width().min(rect.height())));
    let mid = &piece.points[m];
    let outward = neighbor.normal(mid.uvs[2], mid.uvs[3]);
    let keep_left = (part.point(probe.x, probe.y) - mid.pos).dot(&outward) > 0.0;

    if piece.is_loop {
        let keep_inside = keep_left == (signed_area(&work) > 0.0);
        if keep_inside {
            region.intersect(&work)
        } else {
            region.subtract(&work)
        }
    } else {
        // Closing along a slightly larger rectangle keeps the closing edges
        // off the region's own border.
        let pad = Vector2::repeat(0.05 * rect.width().max(rect.height()));
        let outer = Rect::new(rect.min - pad, rect.max + pad);
        let mut work = work;
        let last = work.len() - 1;
        for k in [0, last] {
            let p = work[k];
            if rect.clamp(&p) != p || rect.on_border(&p, FZERO_UV) {
                work[k] = outer.snap_to_border(&p);
            }
        }
        let poly = if keep_left {
            outer.close_left(&work)
        } else {
            outer.close_right(&work)
        };
        region.intersect(&poly)
    }
}

fn lerp(a: &PointOfIntersection, b: &PointOfIntersection, s: f64) -> PointOfIntersection {
    PointOfIntersection {
        pos: a.pos + (b.pos - a.pos) * s,
        uvs: a.uvs + (b.uvs - a.uvs) * s,
    }
}

/// Where the step `a -> b` jumps across a seam of the part: the point on
/// the seam at which the curve leaves, and the same point on the opposite
/// side where it comes back.
fn seam_crossing(
    a: &PointOfIntersection,
    b: &PointOfIntersection,
    d: &SurfaceDomain,
    closed: (bool, bool),
) -> Option<(PointOfIntersection, PointOfIntersection)> {
    let axes = [(closed.0, d.u_min, d.u_max), (closed.1, d.v_min, d.v_max)];
    for (axis, &(is_closed, lo, hi)) in axes.iter().enumerate() {
        let span = hi - lo;
        let (ta, tb) = (a.uvs[axis], b.uvs[axis]);
        if !is_closed || (tb - ta).abs() <= 0.5 * span {
            continue;
        }
        let (unwrapped, exit, entry) = if tb < ta {
            (tb + span, hi, lo)
        } else {
            (tb - span, lo, hi)
        };
        let s = ((exit - ta) / (unwrapped - ta)).clamp(0.0, 1.0);
        let mut end = lerp(a, b, s);
        end.uvs[axis] = exit;
        let mut start = end;
        start.uvs[axis] = entry;
        return Some((end, start));
    }
    None
}

/// Splits a traced curve wherever it wraps around a closed direction of the
/// part. A closed curve without such jumps stays a single loop.
fn split_at_seams(
    points: &[PointOfIntersection],
    d: &SurfaceDomain,
    closed: (bool, bool),
    cyclic: bool,
) -> Vec<Piece> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let n = points.len();
    let segments = if cyclic { n } else { n - 1 };
    let mut pieces = vec![vec![first]];
    let mut crossed = false;
    for k in 0..segments {
        let a = &points[k];
        let b = &points[(k + 1) % n];
        if let Some((end, start)) = seam_crossing(a, b, d, closed) {
            crossed = true;
            if let Some(current) = pieces.last_mut() {
                current.push(end);
            }
            pieces.push(vec![start]);
        }
        if k + 1 < n {
            if let Some(current) = pieces.last_mut() {
                current.push(*b);
            }
        }
    }
    if cyclic && crossed {
        // The stretch after the last jump runs on into the first one.
        if let Some(tail) = pieces.pop() {
            if let Some(head) = pieces.first_mut() {
                let rest = std::mem::take(head);
                *head = tail.into_iter().chain(rest).collect();
            }
        }
    }
    let is_loop = cyclic && !crossed;
    pieces
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|points| Piece { points, is_loop })
        .collect()
}

/// Subdivides a polyline so no step is longer than `step` times the
/// rectangle's extent along either axis.
fn densify(points: &[Point2], rect: &Rect, step: f64) -> Vec<Point2> {
    let mut out = Vec::with_capacity(points.len());
    for w in points.windows(2) {
        let d = w[1] - w[0];
        let reach = (d.x.abs() / rect.width()).max(d.y.abs() / rect.height()) / step;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (reach.ceil() as usize).max(1);
        out.extend((0..n).map(|k| w[0] + d * (k as f64 / n as f64)));
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::BezierSurface;
    use crate::math::Vector4;
    use crate::scene::Geometry;

    fn poi(u: f64, v: f64) -> PointOfIntersection {
        PointOfIntersection {
            pos: Point3::new(u, v, 0.0),
            uvs: Vector4::new(u, v, 0.0, 0.0),
        }
    }

    #[test]
    fn loop_without_jumps_stays_whole() {
        let d = SurfaceDomain::new(0.0, 4.0, 0.0, 1.0);
        let pts = vec![poi(1.0, 0.2), poi(2.0, 0.2), poi(2.0, 0.8), poi(1.0, 0.8)];
        let pieces = split_at_seams(&pts, &d, (true, false), true);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].is_loop);
        assert_eq!(pieces[0].points.len(), 4);
    }

    #[test]
    fn loop_around_seam_becomes_one_open_piece() {
        let d = SurfaceDomain::new(0.0, 4.0, 0.0, 1.0);
        let pts: Vec<PointOfIntersection> =
            [1.0, 2.0, 3.0, 3.8, 0.2].iter().map(|&u| poi(u, 0.5)).collect();
        let pieces = split_at_seams(&pts, &d, (true, false), true);
        assert_eq!(pieces.len(), 1);
        let p = &pieces[0];
        assert!(!p.is_loop);
        assert!((p.points[0].uvs[0] - 0.0).abs() < 1e-12);
        assert!((p.points[p.points.len() - 1].uvs[0] - 4.0).abs() < 1e-12);
        // Seam points interpolate between 3.8 and 4.2.
        let u: Vec<f64> = p.points.iter().map(|q| q.uvs[0]).collect();
        assert_eq!(u, vec![0.0, 0.2, 1.0, 2.0, 3.0, 3.8, 4.0]);
    }

    #[test]
    fn open_curve_splits_at_each_jump() {
        let d = SurfaceDomain::new(0.0, 1.0, 0.0, 1.0);
        let pts = vec![poi(0.5, 0.7), poi(0.5, 0.95), poi(0.5, 0.1), poi(0.5, 0.3)];
        let pieces = split_at_seams(&pts, &d, (false, true), false);
        assert_eq!(pieces.len(), 2);
        assert!((pieces[0].points[2].uvs[1] - 1.0).abs() < 1e-12);
        assert!((pieces[1].points[0].uvs[1] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn densify_limits_steps() {
        let rect = Rect::new(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0));
        let pts = densify(&[Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)], &rect, 0.1);
        assert_eq!(pts.len(), 11);
    }

    fn plate_with_post() -> Scene {
        let mut scene = Scene::new();
        let plate = BezierSurface::flat(Point3::new(-20.0, -20.0, 20.0), 40.0, 40.0, 1, 1).unwrap();
        let post = BezierSurface::cylinder(Point3::new(0.0, 0.0, 0.0), 5.0, 40.0, 4, 1).unwrap();
        scene.add_named("plate", Geometry::Bezier(plate)).unwrap();
        scene.add_named("post", Geometry::Bezier(post)).unwrap();
        scene
    }

    #[test]
    fn plate_is_cut_around_post() {
        let params = StageThreeParams {
            base_plane: false,
            parts: vec![PartSpec {
                name: "plate".into(),
                neighbors: vec![NeighborSpec {
                    name: "post".into(),
                    hint: None,
                }],
                lines: 10,
                direction: CutDirection::ConstantU,
            }],
            ..StageThreeParams::default()
        };
        let stock = Stock::default();
        let path = StageThree::new(params).execute(&plate_with_post(), &stock).unwrap();
        let cutting: Vec<&Point3> = path.iter().filter(|p| p.z < stock.safe_height()).collect();
        assert!(!cutting.is_empty());
        for p in &cutting {
            assert!((p.z - 20.0).abs() < 1e-6);
            assert!(p.coords.xy().norm() > 9.0 - 0.05, "{p}");
        }
        let min_x = cutting.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        assert!(min_x < -17.0);
    }

    #[test]
    fn post_is_cut_above_base() {
        let params = StageThreeParams {
            parts: vec![PartSpec {
                name: "post".into(),
                neighbors: Vec::new(),
                lines: 8,
                direction: CutDirection::ConstantU,
            }],
            ..StageThreeParams::default()
        };
        let stock = Stock::default();
        let path = StageThree::new(params).execute(&plate_with_post(), &stock).unwrap();
        let cutting: Vec<&Point3> = path.iter().filter(|p| p.z < stock.safe_height()).collect();
        assert!(!cutting.is_empty());
        for p in &cutting {
            assert!(p.z >= stock.base_height - 1e-3, "{p}");
            let radial = p.coords.xy().norm();
            assert!((radial - 9.0).abs() < 0.05, "{p}");
        }
    }

    #[test]
    fn missing_neighbor_is_reported() {
        let params = StageThreeParams {
            parts: vec![PartSpec {
                name: "plate".into(),
                neighbors: vec![NeighborSpec {
                    name: "nope".into(),
                    hint: None,
                }],
                lines: 4,
                direction: CutDirection::ConstantV,
            }],
            ..StageThreeParams::default()
        };
        let err = StageThree::new(params).execute(&plate_with_post(), &Stock::default());
        assert!(err.is_err());
    }
}
