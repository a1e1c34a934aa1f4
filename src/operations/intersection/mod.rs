//! Surface-surface intersection: coarse grid search, gradient refinement and
//! Newton marching along the curve.

mod coarse;
mod gradient;
mod newton;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::surface::Surface;
use crate::math::{Point2, Point3, Vector4, FZERO_UV};

/// Outcome of an intersection search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntersectionStatus {
    Success,
    /// The gradient phase did not reach a common point.
    BadGradient,
    /// The Newton phase could not march away from the seed.
    BadNewton,
}

impl IntersectionStatus {
    /// Numeric status code (`0`, `1` or `2`).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::BadGradient => 1,
            Self::BadNewton => 2,
        }
    }

    /// Returns `true` for [`IntersectionStatus::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for IntersectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::BadGradient => "bad gradient parameters",
            Self::BadNewton => "bad newton parameters",
        };
        f.write_str(text)
    }
}

/// One point of an intersection curve with its parameters on both surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOfIntersection {
    /// World position (evaluated on the first surface).
    pub pos: Point3,
    /// `(u1, v1, u2, v2)`.
    pub uvs: Vector4,
}

impl PointOfIntersection {
    /// Parameters on the first surface.
    #[must_use]
    pub fn first_uv(&self) -> Point2 {
        Point2::new(self.uvs[0], self.uvs[1])
    }

    /// Parameters on the second surface.
    #[must_use]
    pub fn second_uv(&self) -> Point2 {
        Point2::new(self.uvs[2], self.uvs[3])
    }
}

/// Tuning constants for [`Intersection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionParams {
    /// Samples per parameter direction in the coarse search.
    pub grid_samples: usize,
    /// Distance at which the gradient phase stops.
    pub gradient_tolerance: f64,
    /// Iteration cap of the gradient phase.
    pub gradient_max_iterations: usize,
    /// Initial gradient step length.
    pub gradient_initial_step: f64,
    /// Marching step along the curve (world units).
    pub step: f64,
    /// Residual at which a Newton solve is accepted.
    pub newton_tolerance: f64,
    /// Iteration cap of a single Newton solve.
    pub newton_max_iterations: usize,
    /// How far open parameters may leave their domain.
    pub domain_margin: f64,
    /// Maximum number of points on a curve.
    pub max_points: usize,
    /// Points required before the closing test is applied.
    pub min_loop_points: usize,
    /// Distance to the first point that closes a loop; defaults to `step`.
    pub closing_distance: Option<f64>,
}

impl Default for IntersectionParams {
    fn default() -> Self {
        Self {
            grid_samples: 10,
            gradient_tolerance: 1e-6,
            gradient_max_iterations: 5000,
            gradient_initial_step: 0.01,
            step: 0.05,
            newton_tolerance: 1e-9,
            newton_max_iterations: 32,
            domain_margin: 1e-3,
            max_points: 4000,
            min_loop_points: 4,
            closing_distance: None,
        }
    }
}

impl IntersectionParams {
    /// Same parameters with a different marching step.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    fn closing_distance(&self) -> f64 {
        self.closing_distance.unwrap_or(self.step)
    }
}

/// Two surfaces seen as one function of `(u1, v1, u2, v2)`.
#[derive(Clone, Copy)]
pub(crate) struct SurfacePair<'a> {
    pub(crate) first: &'a dyn Surface,
    pub(crate) second: &'a dyn Surface,
    pub(crate) same: bool,
}

impl SurfacePair<'_> {
    pub(crate) fn positions(&self, x: &Vector4) -> (Point3, Point3) {
        (self.first.point(x[0], x[1]), self.second.point(x[2], x[3]))
    }

    pub(crate) fn wrap(&self, x: Vector4) -> Vector4 {
        let (u1, v1) = self.first.wrap(x[0], x[1]);
        let (u2, v2) = self.second.wrap(x[2], x[3]);
        Vector4::new(u1, v1, u2, v2)
    }

    /// Whether every open parameter lies within `margin` of its domain.
    pub(crate) fn inside(&self, x: &Vector4, margin: f64) -> bool {
        inside_one(self.first, x[0], x[1], margin) && inside_one(self.second, x[2], x[3], margin)
    }

    /// For a self-intersection: both parameter pairs denote the same point.
    pub(crate) fn coincident(&self, x: &Vector4) -> bool {
        if !self.same {
            return false;
        }
        let d = self.first.domain();
        let du = periodic_gap(x[0] - x[2], d.u_span(), self.first.is_u_closed());
        let dv = periodic_gap(x[1] - x[3], d.v_span(), self.first.is_v_closed());
        du.hypot(dv) < FZERO_UV
    }
}

fn inside_one(s: &dyn Surface, u: f64, v: f64, margin: f64) -> bool {
    let d = s.domain();
    let u_ok = s.is_u_closed() || (u >= d.u_min - margin && u <= d.u_max + margin);
    let v_ok = s.is_v_closed() || (v >= d.v_min - margin && v <= d.v_max + margin);
    u_ok && v_ok
}

fn periodic_gap(delta: f64, period: f64, closed: bool) -> f64 {
    if closed {
        let r = delta.rem_euclid(period);
        r.min(period - r)
    } else {
        delta.abs()
    }
}

/// Intersection solver and the curve it last produced.
///
/// Each search clears the previous result. The solver is not meant to be
/// shared between concurrent searches.
#[derive(Debug, Clone, Default)]
pub struct Intersection {
    params: IntersectionParams,
    points: Vec<PointOfIntersection>,
    closed: bool,
}

impl Intersection {
    /// Creates a solver with the given parameters.
    #[must_use]
    pub fn new(params: IntersectionParams) -> Self {
        Self {
            params,
            points: Vec::new(),
            closed: false,
        }
    }

    /// Solver parameters.
    #[must_use]
    pub fn params(&self) -> &IntersectionParams {
        &self.params
    }

    /// Points of the last curve, ordered along the curve.
    #[must_use]
    pub fn points(&self) -> &[PointOfIntersection] {
        &self.points
    }

    /// Whether the last curve closed on itself.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Moves the points of the last curve out of the solver.
    pub fn take_points(&mut self) -> Vec<PointOfIntersection> {
        std::mem::take(&mut self.points)
    }

    /// Forgets the last curve.
    pub fn clear(&mut self) {
        self.points.clear();
        self.closed = false;
    }

    /// Traces one intersection curve between `first` and `second`.
    ///
    /// `hint` biases the coarse search towards curves near a point. Passing
    /// the same surface twice searches for a self-intersection.
    pub fn find(
        &mut self,
        first: &dyn Surface,
        second: &dyn Surface,
        hint: Option<Point3>,
    ) -> IntersectionStatus {
        let same = std::ptr::addr_eq(first as *const dyn Surface, second as *const dyn Surface);
        self.run(SurfacePair { first, second, same }, hint)
    }

    /// Traces a self-intersection curve of `surface`.
    pub fn find_self(&mut self, surface: &dyn Surface, hint: Option<Point3>) -> IntersectionStatus {
        self.run(
            SurfacePair {
                first: surface,
                second: surface,
                same: true,
            },
            hint,
        )
    }

    fn run(&mut self, pair: SurfacePair<'_>, hint: Option<Point3>) -> IntersectionStatus {
        self.clear();
        let seed = coarse::search(&pair, self.params.grid_samples, hint.as_ref());
        let Some(seed) = gradient::refine(&pair, seed, &self.params) else {
            debug!("gradient phase failed");
            return IntersectionStatus::BadGradient;
        };
        if pair.coincident(&seed) {
            debug!("self-intersection seed collapsed onto a single point");
            return IntersectionStatus::BadGradient;
        }
        match newton::trace(&pair, seed, &self.params) {
            Some(curve) => {
                self.points = curve.points;
                self.closed = curve.closed;
                debug!(
                    points = self.points.len(),
                    closed = self.closed,
                    "intersection traced"
                );
                IntersectionStatus::Success
            }
            None => {
                warn!("newton phase failed to march from the seed");
                IntersectionStatus::BadNewton
            }
        }
    }
}
