use crate::math::Vector4;

use super::{IntersectionParams, SurfacePair};

/// Smallest step length before a trial that keeps leaving the domain is
/// given up on.
const MIN_STEP: f64 = 1e-14;

fn squared_gap(pair: &SurfacePair<'_>, x: &Vector4) -> f64 {
    let (p1, p2) = pair.positions(x);
    (p1 - p2).norm_squared()
}

fn gradient(pair: &SurfacePair<'_>, x: &Vector4) -> Vector4 {
    let (p1, p2) = pair.positions(x);
    let diff = p1 - p2;
    let (d1u, d1v) = pair.first.tangents(x[0], x[1]);
    let (d2u, d2v) = pair.second.tangents(x[2], x[3]);
    Vector4::new(diff.dot(&d1u), diff.dot(&d1v), -diff.dot(&d2u), -diff.dot(&d2v)) * 2.0
}

/// Minimizes `|S1(u1, v1) - S2(u2, v2)|^2` from `seed` by gradient descent
/// with an adaptive step.
///
/// Returns `None` if the iteration cap is hit before the distance drops
/// below the tolerance, or if the parameters cannot stay inside the
/// margin-padded domain.
pub(super) fn refine(
    pair: &SurfacePair<'_>,
    seed: Vector4,
    params: &IntersectionParams,
) -> Option<Vector4> {
    let tol2 = params.gradient_tolerance * params.gradient_tolerance;
    let mut x = seed;
    let mut f = squared_gap(pair, &x);
    let mut step = params.gradient_initial_step;

    for _ in 0..params.gradient_max_iterations {
        if f < tol2 {
            return Some(x);
        }
        let g = gradient(pair, &x);
        if g.norm_squared() == 0.0 {
            return None;
        }
        let trial = pair.wrap(x - g * step);
        if !pair.inside(&trial, params.domain_margin) {
            step *= 0.5;
            if step < MIN_STEP {
                return None;
            }
            continue;
        }
        let f_trial = squared_gap(pair, &trial);
        if f_trial < f {
            x = trial;
            f = f_trial;
            step *= 1.5;
        } else {
            step *= 0.5;
        }
    }
    (f < tol2).then_some(x)
}
