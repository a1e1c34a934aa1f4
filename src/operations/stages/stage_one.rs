use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathError, Result};
use crate::math::{Point3, Vector2, FZERO};
use crate::milling::{HeightField, Stock};
use crate::scene::Scene;

use super::common::{finish, join_with_lifts, remove_collinear, Toolpath};

/// Parameters of the roughing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOneParams {
    /// Radius of the spherical cutter.
    pub cutter_radius: f64,
    /// Height map cells along each axis.
    pub resolution: usize,
    /// Parameter samples per direction when rasterizing a surface.
    pub uv_samples: usize,
    /// Material left above the compensated surface.
    pub allowance: f64,
    /// Distance between zig-zag rows.
    pub row_spacing: f64,
    /// Pass heights, highest first.
    pub layers: Vec<f64>,
    /// Steepest rise or drop left in a pass before smoothing raises it.
    pub max_slope: f64,
    pub smoothing_iterations: usize,
    /// Triangle area under which a point counts as collinear.
    pub collinear_area: f64,
    pub translate_back: bool,
}

impl Default for StageOneParams {
    fn default() -> Self {
        Self {
            cutter_radius: 8.0,
            resolution: 150,
            uv_samples: 200,
            allowance: 1.0,
            row_spacing: 8.0,
            layers: vec![35.0, 15.0],
            max_slope: 2.0,
            smoothing_iterations: 50,
            collinear_area: 1e-3,
            translate_back: false,
        }
    }
}

/// Roughing: zig-zag rows over a compensated height map of the scene.
#[derive(Debug, Clone, Default)]
pub struct StageOne {
    params: StageOneParams,
}

impl StageOne {
    #[must_use]
    pub fn new(params: StageOneParams) -> Self {
        Self { params }
    }

    /// Generates the roughing path for every surface in `scene`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidInput`] for a non-positive radius, row
    /// spacing or resolution, or when no pass height is given.
    pub fn execute(&self, scene: &Scene, stock: &Stock) -> Result<Toolpath> {
        let p = &self.params;
        if p.cutter_radius <= 0.0 || p.row_spacing <= 0.0 || p.resolution == 0 {
            return Err(PathError::InvalidInput(
                "stage one needs a positive radius, spacing and resolution".into(),
            )
            .into());
        }
        if p.layers.is_empty() {
            return Err(PathError::InvalidInput("stage one needs at least one layer".into()).into());
        }

        let map = self.height_map(scene, stock);
        let rows = self.rows(&map);
        let compensated = Compensated::new(&map, p.cutter_radius, p.allowance);

        let mut passes = Vec::with_capacity(p.layers.len());
        for &layer in &p.layers {
            let mut pass = zig_zag(&map, &rows, |i, j| compensated.at(i, j).max(layer));
            smooth(&mut pass, p.max_slope, p.smoothing_iterations);
            let pass = remove_collinear(&pass, p.collinear_area);
            debug!(layer, points = pass.len(), "stage one layer");
            passes.push(pass);
        }
        let path = finish(join_with_lifts(&passes, stock), stock, p.translate_back);
        info!(points = path.len(), "stage one path generated");
        Ok(path)
    }

    /// Highest surface sample per cell over the stock grown by the radius.
    /// Empty cells stay at the base height.
    fn height_map(&self, scene: &Scene, stock: &Stock) -> HeightField {
        let r = self.params.cutter_radius;
        let size = Vector2::new(stock.size_x + 2.0 * r, stock.size_y + 2.0 * r);
        let n = self.params.resolution;
        let mut map = HeightField::new(stock.center(), size, n, n, stock.base_height);
        let samples = self.params.uv_samples.max(1);
        for (name, surface) in scene.surfaces() {
            let d = surface.domain();
            for a in 0..=samples {
                let u = d.u_min + d.u_span() * a as f64 / samples as f64;
                for b in 0..=samples {
                    let v = d.v_min + d.v_span() * b as f64 / samples as f64;
                    let pt = surface.point(u, v);
                    if let Some((i, j)) = map.world_to_cell(pt.x, pt.y) {
                        if map.get(i, j).is_some_and(|h| pt.z > h) {
                            map.set(i, j, pt.z);
                        }
                    }
                }
            }
            debug!(surface = name, "rasterized");
        }
        map
    }

    /// Row indices of the zig-zag, always including the last row.
    fn rows(&self, map: &HeightField) -> Vec<usize> {
        let (_, ny) = map.resolution();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = ((self.params.row_spacing / map.cell_size().y).round() as usize).max(1);
        let mut rows: Vec<usize> = (0..ny).step_by(step).collect();
        if rows.last() != Some(&(ny - 1)) {
            rows.push(ny - 1);
        }
        rows
    }
}

/// Tip heights at which a ball of the given radius touches the height map
/// without cutting into it.
struct Compensated<'a> {
    map: &'a HeightField,
    radius: f64,
    allowance: f64,
    reach: (i64, i64),
}

impl<'a> Compensated<'a> {
    fn new(map: &'a HeightField, radius: f64, allowance: f64) -> Self {
        let cell = map.cell_size();
        #[allow(clippy::cast_possible_truncation)]
        let reach = (
            (radius / cell.x).ceil() as i64,
            (radius / cell.y).ceil() as i64,
        );
        Self {
            map,
            radius,
            allowance,
            reach,
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn at(&self, i: usize, j: usize) -> f64 {
        let cell = self.map.cell_size();
        let r2 = self.radius * self.radius;
        let (nx, ny) = self.map.resolution();
        let mut best = f64::NEG_INFINITY;
        let (ci, cj) = (i as i64, j as i64);
        for dj in -self.reach.1..=self.reach.1 {
            for di in -self.reach.0..=self.reach.0 {
                let (qi, qj) = (ci + di, cj + dj);
                if qi < 0 || qj < 0 || qi >= nx as i64 || qj >= ny as i64 {
                    continue;
                }
                let dx = di as f64 * cell.x;
                let dy = dj as f64 * cell.y;
                let d2 = dx * dx + dy * dy;
                if d2 > r2 {
                    continue;
                }
                if let Some(h) = self.map.get(qi as usize, qj as usize) {
                    best = best.max(h + (r2 - d2).sqrt() - self.radius);
                }
            }
        }
        best + self.allowance
    }
}

/// Walks the rows alternately left to right and right to left, following
/// the end column between rows.
fn zig_zag(map: &HeightField, rows: &[usize], height: impl Fn(usize, usize) -> f64) -> Toolpath {
    let (nx, _) = map.resolution();
    let at = |i: usize, j: usize| {
        let c = map.cell_center(i, j);
        Point3::new(c.x, c.y, height(i, j))
    };
    let mut path = Vec::new();
    for (k, &j) in rows.iter().enumerate() {
        let forward = k % 2 == 0;
        if let Some(&prev) = k.checked_sub(1).and_then(|p| rows.get(p)) {
            let i = if forward { 0 } else { nx - 1 };
            path.extend((prev + 1..j).map(|jj| at(i, jj)));
        }
        if forward {
            path.extend((0..nx).map(|i| at(i, j)));
        } else {
            path.extend((0..nx).rev().map(|i| at(i, j)));
        }
    }
    path
}

/// Raises points whose slope to a neighbour exceeds `max_slope` towards the
/// neighbours' average. Heights never drop.
fn smooth(path: &mut [Point3], max_slope: f64, iterations: usize) {
    if path.len() < 3 {
        return;
    }
    for _ in 0..iterations {
        let mut changed = false;
        for k in 1..path.len() - 1 {
            let (prev, cur, next) = (path[k - 1], path[k], path[k + 1]);
            let steep = |other: &Point3| {
                let run = Vector2::new(other.x - cur.x, other.y - cur.y).norm();
                run > FZERO && (other.z - cur.z).abs() / run > max_slope
            };
            if steep(&prev) || steep(&next) {
                let target = 0.5 * (prev.z + next.z);
                if target > cur.z + FZERO {
                    path[k].z = target;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::BezierSurface;
    use crate::scene::Geometry;

    fn small_stock() -> Stock {
        Stock {
            size_x: 40.0,
            size_y: 40.0,
            ..Stock::default()
        }
    }

    fn params() -> StageOneParams {
        StageOneParams {
            cutter_radius: 4.0,
            resolution: 48,
            uv_samples: 60,
            row_spacing: 4.0,
            ..StageOneParams::default()
        }
    }

    #[test]
    fn empty_scene_follows_layers() {
        let stock = small_stock();
        let path = StageOne::new(params()).execute(&Scene::new(), &stock).unwrap();
        assert!((path[0].z - stock.safe_height()).abs() < 1e-12);
        assert!((path[path.len() - 1].z - stock.safe_height()).abs() < 1e-12);
        let cutting: Vec<&Point3> = path.iter().filter(|p| p.z < stock.safe_height()).collect();
        assert!(cutting.iter().all(|p| (p.z - 35.0).abs() < 1e-9 || (p.z - 16.0).abs() < 1e-9));
        // Flat rows collapse to their ends.
        assert!(path.len() < 200);
    }

    #[test]
    fn bump_is_cleared_with_allowance() {
        let stock = small_stock();
        let mut scene = Scene::new();
        let flat = BezierSurface::flat(Point3::new(-5.0, -5.0, 30.0), 10.0, 10.0, 1, 1).unwrap();
        scene.add(Geometry::Bezier(flat));
        let path = StageOne::new(params()).execute(&scene, &stock).unwrap();
        let above: Vec<&Point3> = path
            .iter()
            .filter(|p| p.x.abs() < 4.6 && p.y.abs() < 4.6 && p.z < stock.safe_height())
            .collect();
        assert!(!above.is_empty());
        assert!(above.iter().all(|p| p.z >= 31.0 - 1e-9));
        assert!(path.iter().all(|p| p.z >= stock.base_height));
    }

    #[test]
    fn smoothing_only_raises() {
        let mut pts = vec![
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 10.0),
            Point3::new(3.0, 0.0, 10.0),
        ];
        let before = pts.clone();
        smooth(&mut pts, 1.0, 20);
        assert!(pts.iter().zip(&before).all(|(a, b)| a.z >= b.z));
        assert!(pts[1].z > 0.0);
    }

    #[test]
    fn rejects_missing_layers() {
        let p = StageOneParams {
            layers: Vec::new(),
            ..params()
        };
        assert!(StageOne::new(p).execute(&Scene::new(), &small_stock()).is_err());
    }
}
