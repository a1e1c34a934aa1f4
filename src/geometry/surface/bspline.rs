use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3};

use super::basis::{bspline, bspline_derivative, combine, locate};
use super::{Surface, SurfaceDomain};

/// A uniform bicubic B-spline surface.
///
/// Along an open direction with `n` control points there are `n - 3`
/// patches; along a closed direction the control points wrap around and
/// there are `n` patches. Patch `(i, j)` uses control points
/// `i..i + 4` x `j..j + 4` (taken modulo `n` when closed).
#[derive(Debug, Clone)]
pub struct BSplineSurface {
    points: Vec<Point3>,
    size_u: usize,
    size_v: usize,
    u_closed: bool,
    v_closed: bool,
}

impl BSplineSurface {
    /// Creates a surface from a control net indexed `net[u][v]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the net is ragged or has fewer than four control
    /// points along a direction.
    pub fn new(net: Vec<Vec<Point3>>, u_closed: bool, v_closed: bool) -> Result<Self> {
        let size_u = net.len();
        let size_v = net.first().map_or(0, Vec::len);
        if size_u < 4 || size_v < 4 {
            return Err(GeometryError::Degenerate(format!(
                "b-spline control net {size_u}x{size_v} needs at least 4x4 points"
            ))
            .into());
        }
        if net.iter().any(|col| col.len() != size_v) {
            return Err(GeometryError::Degenerate("ragged b-spline control net".into()).into());
        }
        Ok(Self {
            points: net.into_iter().flatten().collect(),
            size_u,
            size_v,
            u_closed,
            v_closed,
        })
    }

    /// A vertical cylinder around the Z axis through `base`, closed in U.
    ///
    /// The control polygon radius is scaled so that the surface passes
    /// through `radius` at every knot.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive, fewer than 4 columns
    /// are requested or `patches_v` is zero.
    pub fn cylinder(
        base: Point3,
        radius: f64,
        height: f64,
        columns: usize,
        patches_v: usize,
    ) -> Result<Self> {
        if radius <= 0.0 || patches_v == 0 {
            return Err(GeometryError::Degenerate("invalid b-spline cylinder".into()).into());
        }
        let theta = TAU / columns.max(1) as f64;
        let ctrl_radius = radius * 6.0 / (4.0 + 2.0 * theta.cos());
        let dz = height / patches_v as f64;
        let net = (0..columns)
            .map(|i| {
                let (s, c) = (theta * i as f64).sin_cos();
                (0..patches_v + 3)
                    .map(|j| {
                        Point3::new(
                            base.x + ctrl_radius * c,
                            base.y + ctrl_radius * s,
                            base.z + dz * (j as f64 - 1.0),
                        )
                    })
                    .collect()
            })
            .collect();
        Self::new(net, true, false)
    }

    fn patches_u(&self) -> usize {
        if self.u_closed {
            self.size_u
        } else {
            self.size_u - 3
        }
    }

    fn patches_v(&self) -> usize {
        if self.v_closed {
            self.size_v
        } else {
            self.size_v - 3
        }
    }

    /// Control point at column `i`, row `j`, wrapping closed directions.
    #[must_use]
    pub fn control_point(&self, i: usize, j: usize) -> Point3 {
        let i = if self.u_closed { i % self.size_u } else { i };
        let j = if self.v_closed { j % self.size_v } else { j };
        self.points[i * self.size_v + j]
    }

    fn patch_ctrl(&self, pu: usize, pv: usize) -> impl Fn(usize, usize) -> Point3 + '_ {
        move |i, j| self.control_point(pu + i, pv + j)
    }
}

impl Surface for BSplineSurface {
    fn point(&self, u: f64, v: f64) -> Point3 {
        let (pu, lu) = locate(u, self.patches_u(), self.u_closed);
        let (pv, lv) = locate(v, self.patches_v(), self.v_closed);
        Point3::from(combine(self.patch_ctrl(pu, pv), &bspline(lu), &bspline(lv)))
    }

    fn tangents(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let (pu, lu) = locate(u, self.patches_u(), self.u_closed);
        let (pv, lv) = locate(v, self.patches_v(), self.v_closed);
        let ctrl = self.patch_ctrl(pu, pv);
        let du = combine(&ctrl, &bspline_derivative(lu), &bspline(lv));
        let dv = combine(&ctrl, &bspline(lu), &bspline_derivative(lv));
        (du, dv)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, self.patches_u() as f64, 0.0, self.patches_v() as f64)
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

    fn grid(nu: usize, nv: usize) -> Vec<Vec<Point3>> {
        (0..nu)
            .map(|i| {
                (0..nv)
                    .map(|j| Point3::new(i as f64, j as f64, 0.0))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn open_grid_domain_and_linear_precision() {
        let s = BSplineSurface::new(grid(6, 5), false, false).unwrap();
        let d = s.domain();
        assert!((d.u_max - 3.0).abs() < 1e-12);
        assert!((d.v_max - 2.0).abs() < 1e-12);
        // A uniform B-spline reproduces linear data shifted by one knot.
        let p = s.point(0.5, 1.5);
        assert!((p - Point3::new(1.5, 2.5, 0.0)).norm() < 1e-9);
        let (du, dv) = s.tangents(1.2, 0.4);
        assert!((du - Vector3::x()).norm() < 1e-9);
        assert!((dv - Vector3::y()).norm() < 1e-9);
    }

    #[test]
    fn domain_maximum_is_well_defined() {
        let s = BSplineSurface::new(grid(6, 5), false, false).unwrap();
        let p = s.point(3.0, 2.0);
        assert!((p - Point3::new(4.0, 3.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn cylinder_periodic_and_on_radius_at_knots() {
        let s = BSplineSurface::cylinder(Point3::origin(), 3.0, 2.0, 8, 2).unwrap();
        let period = s.domain().u_span();
        assert!((period - 8.0).abs() < 1e-12);
        for k in 0..8 {
            let u = f64::from(k);
            let p = s.point(u, 1.0);
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 3.0).abs() < 1e-9, "r = {r}");
            assert!((p.z - 1.0).abs() < 1e-9);
            let q = s.point(u + 0.37 + period, 1.0);
            assert!((s.point(u + 0.37, 1.0) - q).norm() < 1e-9);
        }
    }
}
