mod basis;
mod bezier;
mod bspline;
mod offset;
mod plane;
mod torus;

pub use bezier::BezierSurface;
pub use bspline::BSplineSurface;
pub use offset::{NormalMode, OffsetSurface};
pub use plane::Plane;
pub use torus::Torus;

use crate::math::{Aabb, Point3, Vector3};

/// Parameter domain for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// Start of the U parameter range.
    pub u_min: f64,
    /// End of the U parameter range.
    pub u_max: f64,
    /// Start of the V parameter range.
    pub v_min: f64,
    /// End of the V parameter range.
    pub v_max: f64,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    /// Width of the U range.
    #[must_use]
    pub fn u_span(&self) -> f64 {
        self.u_max - self.u_min
    }

    /// Width of the V range.
    #[must_use]
    pub fn v_span(&self) -> f64 {
        self.v_max - self.v_min
    }

    /// Maps `u` into `[u_min, u_max)` by periodic wrapping.
    #[must_use]
    pub fn wrap_u(&self, u: f64) -> f64 {
        self.u_min + (u - self.u_min).rem_euclid(self.u_span())
    }

    /// Maps `v` into `[v_min, v_max)` by periodic wrapping.
    #[must_use]
    pub fn wrap_v(&self, v: f64) -> f64 {
        self.v_min + (v - self.v_min).rem_euclid(self.v_span())
    }

    /// Returns `true` if `(u, v)` lies inside the domain grown by `margin`
    /// on every side.
    #[must_use]
    pub fn contains_with_margin(&self, u: f64, v: f64, margin: f64) -> bool {
        u >= self.u_min - margin
            && u <= self.u_max + margin
            && v >= self.v_min - margin
            && v <= self.v_max + margin
    }

    /// Centre of the parameter rectangle.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.u_min + self.u_max),
            0.5 * (self.v_min + self.v_max),
        )
    }
}

/// Trait for parametric surfaces in 3D space.
///
/// Implementations must return finite values for every `(u, v)` inside
/// [`Surface::domain`], including the shared boundary between adjacent
/// patches. Closed directions must accept wrapped parameters.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`.
    fn point(&self, u: f64, v: f64) -> Point3;

    /// Partial derivatives `(dP/du, dP/dv)` at `(u, v)`.
    fn tangents(&self, u: f64, v: f64) -> (Vector3, Vector3);

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;

    /// Whether the surface wraps around in U.
    fn is_u_closed(&self) -> bool {
        false
    }

    /// Whether the surface wraps around in V.
    fn is_v_closed(&self) -> bool {
        false
    }

    /// Combined tangent direction: the sum of the two individually normalized
    /// partial derivatives, renormalized.
    fn tangent(&self, u: f64, v: f64) -> Vector3 {
        let (du, dv) = self.tangents(u, v);
        normalize_or_zero(normalize_or_zero(du) + normalize_or_zero(dv))
    }

    /// Unit normal: cross product of the individually normalized partials.
    fn normal(&self, u: f64, v: f64) -> Vector3 {
        let (du, dv) = self.tangents(u, v);
        normalize_or_zero(normalize_or_zero(du).cross(&normalize_or_zero(dv)))
    }

    /// Axis-aligned world-space bounds, estimated from a parameter grid.
    fn world_bounds(&self) -> Aabb {
        const SAMPLES: usize = 24;
        let d = self.domain();
        let mut aabb = Aabb::empty();
        for i in 0..=SAMPLES {
            let u = d.u_min + d.u_span() * i as f64 / SAMPLES as f64;
            for j in 0..=SAMPLES {
                let v = d.v_min + d.v_span() * j as f64 / SAMPLES as f64;
                aabb.include(&self.point(u, v));
            }
        }
        aabb
    }

    /// Brings `(u, v)` back into the domain along closed directions.
    fn wrap(&self, u: f64, v: f64) -> (f64, f64) {
        let d = self.domain();
        let u = if self.is_u_closed() { d.wrap_u(u) } else { u };
        let v = if self.is_v_closed() { d.wrap_v(v) } else { v };
        (u, v)
    }
}

/// Normalizes `v`, returning the zero vector for degenerate input.
#[must_use]
pub fn normalize_or_zero(v: Vector3) -> Vector3 {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_periodic() {
        let d = SurfaceDomain::new(0.0, 4.0, -1.0, 1.0);
        assert!((d.wrap_u(5.0) - 1.0).abs() < 1e-12);
        assert!((d.wrap_u(-0.5) - 3.5).abs() < 1e-12);
        assert!((d.wrap_v(1.5) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn margin_containment() {
        let d = SurfaceDomain::new(0.0, 1.0, 0.0, 1.0);
        assert!(d.contains_with_margin(1.05, 0.5, 0.1));
        assert!(!d.contains_with_margin(1.2, 0.5, 0.1));
    }
}
