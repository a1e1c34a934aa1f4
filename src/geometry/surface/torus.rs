use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain};

/// A ring torus, closed in both parameters.
///
/// `u` turns around `axis` starting at `ref_dir`, `v` turns around the tube,
/// starting on the outer equator and rising towards `axis`:
///
/// `P(u, v) = center + (R + r cos v) e(u) + r sin v axis`, with
/// `e(u) = cos u ref_dir + sin u (axis x ref_dir)`.
#[derive(Debug, Clone)]
pub struct Torus {
    center: Point3,
    major_radius: f64,
    minor_radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
    side: Vector3,
}

impl Torus {
    /// Creates a torus around `axis`; `ref_dir` is projected onto the plane
    /// normal to the axis.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < minor < major`, or if `axis` is zero or
    /// parallel to `ref_dir`.
    pub fn new(
        center: Point3,
        major_radius: f64,
        minor_radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
    ) -> Result<Self> {
        if minor_radius <= TOLERANCE || minor_radius >= major_radius {
            return Err(GeometryError::Degenerate(format!(
                "torus radii {major_radius} / {minor_radius} do not form a ring"
            ))
            .into());
        }
        let axis = axis
            .try_normalize(TOLERANCE)
            .ok_or(GeometryError::ZeroVector)?;
        let ref_dir = (ref_dir - axis * ref_dir.dot(&axis))
            .try_normalize(TOLERANCE)
            .ok_or_else(|| GeometryError::Degenerate("torus reference direction lies on the axis".into()))?;
        Ok(Self {
            center,
            major_radius,
            minor_radius,
            axis,
            ref_dir,
            side: axis.cross(&ref_dir),
        })
    }

    /// A torus lying flat on the XY plane, its axis along +Z.
    ///
    /// # Errors
    ///
    /// Same radius checks as [`Torus::new`].
    pub fn horizontal(center: Point3, major_radius: f64, minor_radius: f64) -> Result<Self> {
        Self::new(center, major_radius, minor_radius, Vector3::z(), Vector3::x())
    }

    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// `(major, minor)` radii.
    #[must_use]
    pub fn radii(&self) -> (f64, f64) {
        (self.major_radius, self.minor_radius)
    }

    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Radial unit direction `e(u)` and its derivative.
    fn ring_frame(&self, u: f64) -> (Vector3, Vector3) {
        let (s, c) = u.sin_cos();
        (
            self.ref_dir * c + self.side * s,
            self.side * c - self.ref_dir * s,
        )
    }
}

impl Surface for Torus {
    fn point(&self, u: f64, v: f64) -> Point3 {
        let (e, _) = self.ring_frame(u);
        let (s, c) = v.sin_cos();
        self.center + e * (self.major_radius + self.minor_radius * c) + self.axis * (self.minor_radius * s)
    }

    fn tangents(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let (e, de) = self.ring_frame(u);
        let (s, c) = v.sin_cos();
        (
            de * (self.major_radius + self.minor_radius * c),
            (self.axis * c - e * s) * self.minor_radius,
        )
    }

    fn normal(&self, u: f64, v: f64) -> Vector3 {
        let (e, _) = self.ring_frame(u);
        let (s, c) = v.sin_cos();
        e * c + self.axis * s
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, 0.0, TAU)
    }

    fn is_u_closed(&self) -> bool {
        true
    }

    fn is_v_closed(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn ring() -> Torus {
        Torus::horizontal(Point3::new(1.0, -2.0, 5.0), 3.0, 1.0).unwrap()
    }

    #[test]
    fn equators_and_crown() {
        let t = ring();
        assert_abs_diff_eq!(t.point(0.0, 0.0), Point3::new(5.0, -2.0, 5.0), epsilon = 1e-12);
        assert_abs_diff_eq!(t.point(0.0, PI), Point3::new(3.0, -2.0, 5.0), epsilon = 1e-12);
        assert_abs_diff_eq!(t.point(FRAC_PI_2, FRAC_PI_2), Point3::new(1.0, 1.0, 6.0), epsilon = 1e-12);
    }

    #[test]
    fn normal_points_away_from_tube_centre() {
        let t = ring();
        for &(u, v) in &[(0.4, 0.0), (2.0, 1.3), (5.1, 4.0)] {
            let (e, _) = t.ring_frame(u);
            let tube = t.center() + e * 3.0;
            let outward = (t.point(u, v) - tube).normalize();
            assert_abs_diff_eq!(t.normal(u, v), outward, epsilon = 1e-12);
        }
    }

    #[test]
    fn tangents_match_finite_differences() {
        let t = ring();
        let (u, v, h) = (0.8, 2.3, 1e-6);
        let (du, dv) = t.tangents(u, v);
        assert_abs_diff_eq!(du, (t.point(u + h, v) - t.point(u - h, v)) / (2.0 * h), epsilon = 1e-6);
        assert_abs_diff_eq!(dv, (t.point(u, v + h) - t.point(u, v - h)) / (2.0 * h), epsilon = 1e-6);
    }

    #[test]
    fn tilted_reference_is_projected() {
        let t = Torus::new(Point3::origin(), 2.0, 0.5, Vector3::z(), Vector3::new(1.0, 0.0, 3.0)).unwrap();
        assert_abs_diff_eq!(t.point(0.0, 0.0), Point3::new(2.5, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn bounds_cover_the_ring() {
        let b = ring().world_bounds();
        assert!((b.max.x - 5.0).abs() < 1e-2);
        assert!((b.min.z - 4.0).abs() < 1e-2);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Torus::horizontal(Point3::origin(), 1.0, 2.0).is_err());
        assert!(Torus::horizontal(Point3::origin(), 3.0, 0.0).is_err());
        assert!(Torus::new(Point3::origin(), 3.0, 1.0, Vector3::zeros(), Vector3::x()).is_err());
        assert!(Torus::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::z()).is_err());
    }
}
