use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain};

/// A bounded planar rectangle.
///
/// Defined by an origin corner and two edge vectors (`u_axis`, `v_axis`)
/// whose lengths are the rectangle's extents. The normal is
/// `u_axis x v_axis`, normalized.
///
/// Parametric form: `P(u, v) = origin + u * u_axis + v * v_axis`,
/// `u, v` in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_axis: Vector3,
    v_axis: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a new rectangle from an origin corner and two edge vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge vector is zero-length or the two are
    /// parallel.
    pub fn new(origin: Point3, u_axis: Vector3, v_axis: Vector3) -> Result<Self> {
        if u_axis.norm() < TOLERANCE || v_axis.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = u_axis.cross(&v_axis);
        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(
                GeometryError::Degenerate("plane directions are parallel".into()).into(),
            );
        }
        Ok(Self {
            origin,
            u_axis,
            v_axis,
            normal: normal / normal_len,
        })
    }

    /// A horizontal rectangle at height `z` centred on `(center.x, center.y)`
    /// with the given half extents. Its normal points up.
    ///
    /// # Errors
    ///
    /// Returns an error if an extent is zero.
    pub fn horizontal(center: Point3, half_x: f64, half_y: f64) -> Result<Self> {
        Self::new(
            Point3::new(center.x - half_x, center.y - half_y, center.z),
            Vector3::new(2.0 * half_x, 0.0, 0.0),
            Vector3::new(0.0, 2.0 * half_y, 0.0),
        )
    }

    /// Returns the origin corner of the rectangle.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U edge vector.
    #[must_use]
    pub fn u_axis(&self) -> &Vector3 {
        &self.u_axis
    }

    /// Returns the V edge vector.
    #[must_use]
    pub fn v_axis(&self) -> &Vector3 {
        &self.v_axis
    }

    /// Returns the unit normal of the plane.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }
}

impl Surface for Plane {
    fn point(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.u_axis * u + self.v_axis * v
    }

    fn tangents(&self, _u: f64, _v: f64) -> (Vector3, Vector3) {
        (self.u_axis, self.v_axis)
    }

    fn normal(&self, _u: f64, _v: f64) -> Vector3 {
        self.normal
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, 1.0, 0.0, 1.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_plane_corners() {
        let p = Plane::horizontal(Point3::new(1.0, 2.0, 3.0), 5.0, 4.0).unwrap();
        assert!((p.point(0.0, 0.0) - Point3::new(-4.0, -2.0, 3.0)).norm() < TOLERANCE);
        assert!((p.point(1.0, 1.0) - Point3::new(6.0, 6.0, 3.0)).norm() < TOLERANCE);
        assert!((p.normal(0.5, 0.5) - Vector3::z()).norm() < TOLERANCE);
    }

    #[test]
    fn parallel_axes_rejected() {
        let r = Plane::new(Point3::origin(), Vector3::x(), Vector3::x() * 2.0);
        assert!(r.is_err());
    }

    #[test]
    fn zero_axis_rejected() {
        assert!(Plane::new(Point3::origin(), Vector3::zeros(), Vector3::y()).is_err());
    }

    #[test]
    fn bounds_are_exact() {
        let p = Plane::horizontal(Point3::origin(), 2.0, 1.0).unwrap();
        let b = p.world_bounds();
        assert!((b.min - Point3::new(-2.0, -1.0, 0.0)).norm() < TOLERANCE);
        assert!((b.max - Point3::new(2.0, 1.0, 0.0)).norm() < 1e-9);
    }
}
