//! Cubic basis functions shared by the patch-based surfaces.

use crate::math::{Point3, Vector3};

/// Distance kept from the upper end of an open domain so that the patch
/// lookup never selects a patch past the last one.
pub(crate) const PARAM_EPS: f64 = 1e-9;

/// Cubic Bernstein polynomials at `t`.
pub(crate) fn bernstein(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

/// Derivatives of the cubic Bernstein polynomials at `t`.
pub(crate) fn bernstein_derivative(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [
        -3.0 * s * s,
        3.0 * s * s - 6.0 * t * s,
        6.0 * t * s - 3.0 * t * t,
        3.0 * t * t,
    ]
}

/// Uniform cubic B-spline basis at local parameter `t`.
pub(crate) fn bspline(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    let t2 = t * t;
    let t3 = t2 * t;
    [
        s * s * s / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

/// Derivatives of the uniform cubic B-spline basis at `t`.
pub(crate) fn bspline_derivative(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    let t2 = t * t;
    [
        -0.5 * s * s,
        0.5 * (3.0 * t2 - 4.0 * t),
        0.5 * (-3.0 * t2 + 2.0 * t + 1.0),
        0.5 * t2,
    ]
}

/// Splits a global parameter into `(patch_index, local_parameter)`.
///
/// Closed directions are wrapped first; every value is then clamped into
/// `[PARAM_EPS, patches - PARAM_EPS]` so both domain ends resolve to a patch
/// interior.
pub(crate) fn locate(param: f64, patches: usize, closed: bool) -> (usize, f64) {
    let max = patches as f64;
    let p = if closed { param.rem_euclid(max) } else { param };
    let p = p.clamp(PARAM_EPS, max - PARAM_EPS);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (p.floor() as usize).min(patches - 1);
    (index, p - index as f64)
}

/// Evaluates a tensor-product patch: `sum_ij bu[i] * bv[j] * P(i, j)`.
pub(crate) fn combine(ctrl: impl Fn(usize, usize) -> Point3, bu: &[f64; 4], bv: &[f64; 4]) -> Vector3 {
    let mut acc = Vector3::zeros();
    for (i, wu) in bu.iter().enumerate() {
        for (j, wv) in bv.iter().enumerate() {
            acc += ctrl(i, j).coords * (wu * wv);
        }
    }
    acc
}
