use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3};

use super::basis::{bernstein, bernstein_derivative, combine, locate};
use super::{Surface, SurfaceDomain};

/// A C0 surface made of bicubic Bézier patches sharing boundary rows.
///
/// The control net has `3 * patches_u + 1` columns (U direction) and
/// `3 * patches_v + 1` rows (V direction). Patch `(i, j)` uses the 4x4 block
/// starting at column `3i`, row `3j`. The parameter domain is
/// `[0, patches_u] x [0, patches_v]`.
///
/// A closed direction expects its last column (or row) to coincide with the
/// first one.
#[derive(Debug, Clone)]
pub struct BezierSurface {
    points: Vec<Point3>,
    size_u: usize,
    size_v: usize,
    patches_u: usize,
    patches_v: usize,
    u_closed: bool,
    v_closed: bool,
}

impl BezierSurface {
    /// Creates a surface from a control net indexed `net[u][v]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the net is ragged or its sizes are not of the
    /// form `3n + 1` with `n >= 1`.
    pub fn new(net: Vec<Vec<Point3>>, u_closed: bool, v_closed: bool) -> Result<Self> {
        let size_u = net.len();
        let size_v = net.first().map_or(0, Vec::len);
        if size_u < 4 || size_v < 4 || (size_u - 1) % 3 != 0 || (size_v - 1) % 3 != 0 {
            return Err(GeometryError::Degenerate(format!(
                "bezier control net {size_u}x{size_v} is not (3n+1)x(3m+1)"
            ))
            .into());
        }
        if net.iter().any(|col| col.len() != size_v) {
            return Err(GeometryError::Degenerate("ragged bezier control net".into()).into());
        }
        Ok(Self {
            points: net.into_iter().flatten().collect(),
            size_u,
            size_v,
            patches_u: (size_u - 1) / 3,
            patches_v: (size_v - 1) / 3,
            u_closed,
            v_closed,
        })
    }

    /// A flat rectangle in the plane `z = height`, spanning
    /// `[origin.x, origin.x + width] x [origin.y, origin.y + length]`.
    ///
    /// # Errors
    ///
    /// Returns an error if a patch count is zero.
    pub fn flat(
        origin: Point3,
        width: f64,
        length: f64,
        patches_u: usize,
        patches_v: usize,
    ) -> Result<Self> {
        let nu = 3 * patches_u + 1;
        let nv = 3 * patches_v + 1;
        let net = (0..nu)
            .map(|i| {
                (0..nv)
                    .map(|j| {
                        Point3::new(
                            origin.x + width * i as f64 / (nu - 1).max(1) as f64,
                            origin.y + length * j as f64 / (nv - 1).max(1) as f64,
                            origin.z,
                        )
                    })
                    .collect()
            })
            .collect();
        Self::new(net, false, false)
    }

    /// A vertical cylinder around the Z axis through `base`, closed in U.
    ///
    /// Each of the `patches_u` columns is the standard cubic approximation of
    /// a circular arc.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive or a patch count is zero.
    pub fn cylinder(
        base: Point3,
        radius: f64,
        height: f64,
        patches_u: usize,
        patches_v: usize,
    ) -> Result<Self> {
        if radius <= 0.0 {
            return Err(GeometryError::Degenerate("cylinder radius must be positive".into()).into());
        }
        let ring = arc_ring(radius, patches_u);
        let nv = 3 * patches_v + 1;
        let net = ring
            .iter()
            .map(|(x, y)| {
                (0..nv)
                    .map(|j| {
                        Point3::new(
                            base.x + x,
                            base.y + y,
                            base.z + height * j as f64 / (nv - 1).max(1) as f64,
                        )
                    })
                    .collect()
            })
            .collect();
        Self::new(net, true, false)
    }

    /// Control point at column `i`, row `j`.
    #[must_use]
    pub fn control_point(&self, i: usize, j: usize) -> Point3 {
        self.points[i * self.size_v + j]
    }

    /// Number of patches along `(u, v)`.
    #[must_use]
    pub fn patch_count(&self) -> (usize, usize) {
        (self.patches_u, self.patches_v)
    }

    fn patch_ctrl(&self, pu: usize, pv: usize) -> impl Fn(usize, usize) -> Point3 + '_ {
        move |i, j| self.control_point(3 * pu + i, 3 * pv + j)
    }
}

/// Control points of a closed circle built from `segments` cubic arcs,
/// with the first point repeated at the end.
fn arc_ring(radius: f64, segments: usize) -> Vec<(f64, f64)> {
    let segments = segments.max(1);
    let theta = TAU / segments as f64;
    let k = 4.0 / 3.0 * (theta / 4.0).tan() * radius;
    let mut ring = Vec::with_capacity(3 * segments + 1);
    for s in 0..segments {
        let a0 = theta * s as f64;
        let a1 = a0 + theta;
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();
        ring.push((radius * c0, radius * s0));
        ring.push((radius * c0 - k * s0, radius * s0 + k * c0));
        ring.push((radius * c1 + k * s1, radius * s1 - k * c1));
    }
    ring.push(ring[0]);
    ring
}

impl Surface for BezierSurface {
    fn point(&self, u: f64, v: f64) -> Point3 {
        let (pu, lu) = locate(u, self.patches_u, self.u_closed);
        let (pv, lv) = locate(v, self.patches_v, self.v_closed);
        Point3::from(combine(self.patch_ctrl(pu, pv), &bernstein(lu), &bernstein(lv)))
    }

    fn tangents(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let (pu, lu) = locate(u, self.patches_u, self.u_closed);
        let (pv, lv) = locate(v, self.patches_v, self.v_closed);
        let ctrl = self.patch_ctrl(pu, pv);
        let du = combine(&ctrl, &bernstein_derivative(lu), &bernstein(lv));
        let dv = combine(&ctrl, &bernstein(lu), &bernstein_derivative(lv));
        (du, dv)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, self.patches_u as f64, 0.0, self.patches_v as f64)
    }

    fn is_u_closed(&self) -> bool {
        self.u_closed
    }

    fn is_v_closed(&self) -> bool {
        self.v_closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn flat_surface_interpolates_corners() {
        let s = BezierSurface::flat(Point3::new(1.0, 2.0, 3.0), 4.0, 2.0, 2, 1).unwrap();
        assert_abs_diff_eq!(s.point(0.0, 0.0), Point3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
        assert_abs_diff_eq!(s.point(2.0, 1.0), Point3::new(5.0, 4.0, 3.0), epsilon = 1e-6);
        assert_abs_diff_eq!(s.point(1.0, 0.5), Point3::new(3.0, 3.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn flat_surface_normal_is_z() {
        let s = BezierSurface::flat(Point3::origin(), 4.0, 2.0, 2, 2).unwrap();
        let n = s.normal(0.7, 1.3);
        assert_abs_diff_eq!(n, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn patch_boundary_is_finite_and_continuous() {
        let s = BezierSurface::cylinder(Point3::origin(), 2.0, 3.0, 4, 2).unwrap();
        let left = s.point(1.0 - 1e-9, 1.0);
        let at = s.point(1.0, 1.0);
        assert!((left - at).norm() < 1e-6);
        let (du, dv) = s.tangents(1.0, 1.0);
        assert!(du.iter().all(|c| c.is_finite()));
        assert!(dv.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn cylinder_is_periodic_in_u() {
        let s = BezierSurface::cylinder(Point3::origin(), 2.0, 3.0, 4, 1).unwrap();
        assert!(s.is_u_closed());
        let period = s.domain().u_span();
        for k in 0..8 {
            let u = f64::from(k) * 0.5;
            let a = s.point(u, 0.3);
            let b = s.point(u + period, 0.3);
            assert!((a - b).norm() < 1e-9, "u = {u}");
        }
    }

    #[test]
    fn cylinder_stays_close_to_radius() {
        let s = BezierSurface::cylinder(Point3::origin(), 2.0, 3.0, 4, 1).unwrap();
        for k in 0..=40 {
            let p = s.point(f64::from(k) * 0.1, 0.5);
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 2.0).abs() < 2e-3, "r = {r}");
            assert!((p.z - 1.5).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_bad_net() {
        let net = vec![vec![Point3::origin(); 4]; 5];
        assert!(BezierSurface::new(net, false, false).is_err());
    }
}
