use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Point3, Vector3};

use super::{normalize_or_zero, Surface, SurfaceDomain};

/// How an [`OffsetSurface`] obtains the normal it offsets along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalMode {
    /// Use the base surface's [`Surface::normal`].
    Analytic,
    /// Central differences with a step of `span / steps` in each direction.
    Numeric { steps: usize },
}

impl Default for NormalMode {
    fn default() -> Self {
        Self::Analytic
    }
}

/// Relative parameter step for differentiating the offset normal.
const NORMAL_DERIVATIVE_STEP: f64 = 1e-6;

/// A surface displaced along the normal of a base surface by a fixed radius.
///
/// Used as the locus of the tool centre for a cutter of that radius. The
/// combined tangent, normal, domain and closedness are forwarded from the
/// base. [`Surface::tangents`] returns the partials of the displaced point,
/// `dP/du + r dN/du`, so Newton solves on the offset converge at any radius.
#[derive(Clone, Copy)]
pub struct OffsetSurface<'a> {
    base: &'a dyn Surface,
    radius: f64,
    mode: NormalMode,
}

impl std::fmt::Debug for OffsetSurface<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetSurface")
            .field("radius", &self.radius)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> OffsetSurface<'a> {
    /// Wraps `base`, offsetting it by `radius` along its analytic normal.
    #[must_use]
    pub fn new(base: &'a dyn Surface, radius: f64) -> Self {
        Self {
            base,
            radius,
            mode: NormalMode::Analytic,
        }
    }

    /// Replaces the normal estimation mode.
    #[must_use]
    pub fn with_mode(mut self, mode: NormalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the offset radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Normal used for the displacement at `(u, v)`.
    #[must_use]
    pub fn offset_normal(&self, u: f64, v: f64) -> Vector3 {
        match self.mode {
            NormalMode::Analytic => self.base.normal(u, v),
            NormalMode::Numeric { steps } => self.numeric_normal(u, v, steps.max(2)),
        }
    }

    fn numeric_normal(&self, u: f64, v: f64, steps: usize) -> Vector3 {
        let d = self.base.domain();
        let hu = d.u_span() / steps as f64;
        let hv = d.v_span() / steps as f64;
        let du = self.difference(u, hu, d.u_min, d.u_max, self.base.is_u_closed(), |t| {
            self.base.point(t, v).coords
        });
        let dv = self.difference(v, hv, d.v_min, d.v_max, self.base.is_v_closed(), |t| {
            self.base.point(u, t).coords
        });
        normalize_or_zero(normalize_or_zero(du).cross(&normalize_or_zero(dv)))
    }

    /// `(dN/du, dN/dv)` of the offset normal by central differences,
    /// one-sided at open boundaries.
    fn normal_derivatives(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let d = self.base.domain();
        let hu = NORMAL_DERIVATIVE_STEP * d.u_span();
        let hv = NORMAL_DERIVATIVE_STEP * d.v_span();
        let nu = self.difference(u, hu, d.u_min, d.u_max, self.base.is_u_closed(), |t| {
            self.offset_normal(t, v)
        });
        let nv = self.difference(v, hv, d.v_min, d.v_max, self.base.is_v_closed(), |t| {
            self.offset_normal(u, t)
        });
        (nu, nv)
    }

    fn difference(
        &self,
        t: f64,
        h: f64,
        min: f64,
        max: f64,
        closed: bool,
        eval: impl Fn(f64) -> Vector3,
    ) -> Vector3 {
        let (lo, hi) = if closed {
            (t - h, t + h)
        } else {
            ((t - h).max(min), (t + h).min(max))
        };
        if hi - lo <= 0.0 {
            return Vector3::zeros();
        }
        (eval(hi) - eval(lo)) / (hi - lo)
    }
}

impl Surface for OffsetSurface<'_> {
    fn point(&self, u: f64, v: f64) -> Point3 {
        self.base.point(u, v) + self.offset_normal(u, v) * self.radius
    }

    fn tangents(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let (du, dv) = self.base.tangents(u, v);
        let (nu, nv) = self.normal_derivatives(u, v);
        (du + nu * self.radius, dv + nv * self.radius)
    }

    fn tangent(&self, u: f64, v: f64) -> Vector3 {
        self.base.tangent(u, v)
    }

    fn normal(&self, u: f64, v: f64) -> Vector3 {
        self.base.normal(u, v)
    }

    fn domain(&self) -> SurfaceDomain {
        self.base.domain()
    }

    fn is_u_closed(&self) -> bool {
        self.base.is_u_closed()
    }

    fn is_v_closed(&self) -> bool {
        self.base.is_v_closed()
    }

    fn world_bounds(&self) -> Aabb {
        let b = self.base.world_bounds();
        let r = Vector3::repeat(self.radius.abs());
        Aabb {
            min: b.min - r,
            max: b.max + r,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{BezierSurface, Torus};

    #[test]
    fn analytic_offset_keeps_radius_distance() {
        let torus = Torus::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap();
        let off = OffsetSurface::new(&torus, 0.5);
        for &(u, v) in &[(0.0, 0.0), (1.0, 2.0), (4.0, 5.5)] {
            let d = (off.point(u, v) - torus.point(u, v)).norm();
            assert!((d - 0.5).abs() < 1e-12);
        }
        // Outer equator grows from 4 to 4.5.
        assert!((off.point(0.0, 0.0).x - 4.5).abs() < 1e-12);
    }

    #[test]
    fn numeric_offset_close_to_analytic() {
        let cyl = BezierSurface::cylinder(Point3::origin(), 2.0, 3.0, 4, 1).unwrap();
        let analytic = OffsetSurface::new(&cyl, 0.8);
        let numeric = OffsetSurface::new(&cyl, 0.8).with_mode(NormalMode::Numeric { steps: 2000 });
        for k in 0..20 {
            let u = f64::from(k) * 0.2;
            let a = analytic.point(u, 0.5);
            let n = numeric.point(u, 0.5);
            assert!((a - n).norm() < 1e-3, "u = {u}");
            assert!(((n - cyl.point(u, 0.5)).norm() - 0.8).abs() < 1e-9);
        }
    }

    #[test]
    fn numeric_offset_at_open_boundary() {
        let flat = BezierSurface::flat(Point3::origin(), 2.0, 2.0, 1, 1).unwrap();
        let off = OffsetSurface::new(&flat, 1.0).with_mode(NormalMode::Numeric { steps: 10 });
        let p = off.point(1.0, 1.0);
        assert!((p - Point3::new(2.0, 2.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn tangents_follow_the_displaced_point() {
        let cyl = BezierSurface::cylinder(Point3::origin(), 5.0, 40.0, 4, 1).unwrap();
        for radius in [3.0, 6.0] {
            let off = OffsetSurface::new(&cyl, radius);
            let (u, v, h) = (1.3, 0.6, 1e-5);
            let (du, dv) = off.tangents(u, v);
            let fd_u = (off.point(u + h, v) - off.point(u - h, v)) / (2.0 * h);
            let fd_v = (off.point(u, v + h) - off.point(u, v - h)) / (2.0 * h);
            assert!((du - fd_u).norm() < 1e-3 * fd_u.norm(), "r = {radius}");
            assert!((dv - fd_v).norm() < 1e-3 * fd_v.norm(), "r = {radius}");
            // Outward offset stretches the ring direction by (R + r) / R.
            assert!(du.norm() > cyl.tangents(u, v).0.norm() * (5.0 + radius) / 5.0 * 0.95);
        }
        let off = OffsetSurface::new(&cyl, 6.0);
        assert!((off.normal(1.3, 0.6) - cyl.normal(1.3, 0.6)).norm() < 1e-12);
        assert!((off.tangent(1.3, 0.6) - cyl.tangent(1.3, 0.6)).norm() < 1e-12);
    }

    #[test]
    fn forwards_domain_and_closedness() {
        let cyl = BezierSurface::cylinder(Point3::origin(), 2.0, 3.0, 4, 1).unwrap();
        let off = OffsetSurface::new(&cyl, 0.3);
        assert_eq!(off.domain(), cyl.domain());
        assert!(off.is_u_closed());
        assert!(!off.is_v_closed());
    }
}
