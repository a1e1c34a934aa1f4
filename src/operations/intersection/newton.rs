use nalgebra::{Matrix2, Matrix3};
use tracing::debug;

use crate::geometry::surface::Surface;
use crate::math::{Matrix4, Point3, Vector2, Vector3, Vector4, FZERO};

use super::{IntersectionParams, PointOfIntersection, SurfacePair};

pub(super) struct TracedCurve {
    pub(super) points: Vec<PointOfIntersection>,
    pub(super) closed: bool,
}

enum Step {
    Done(Vector4),
    /// Converged, but past an open edge of the domain.
    OutOfDomain(Vector4),
    Failed,
}

#[derive(Debug, PartialEq, Eq)]
enum MarchEnd {
    Closed,
    Boundary,
    Failed,
    Exhausted,
}

/// Unit direction of the curve at `x`: orthogonal to both tangent planes.
fn march_direction(pair: &SurfacePair<'_>, x: &Vector4) -> Option<Vector3> {
    let n1 = pair.first.normal(x[0], x[1]);
    let n2 = pair.second.normal(x[2], x[3]);
    n1.cross(&n2).try_normalize(1e-12)
}

/// Parameter increment that moves `surface` by `delta` to first order, in
/// the least-squares sense.
fn parameter_step(surface: &dyn Surface, u: f64, v: f64, delta: &Vector3) -> Vector2 {
    let (du, dv) = surface.tangents(u, v);
    let gram = Matrix2::new(du.dot(&du), du.dot(&dv), du.dot(&dv), dv.dot(&dv));
    let rhs = Vector2::new(du.dot(delta), dv.dot(delta));
    gram.try_inverse().map_or_else(Vector2::zeros, |inv| inv * rhs)
}

/// Solves `S1 - S2 = 0`, `(S1 - prev) . t = dist` by Newton iteration.
fn solve(
    pair: &SurfacePair<'_>,
    start: Vector4,
    prev: &Point3,
    t: &Vector3,
    dist: f64,
    params: &IntersectionParams,
) -> Option<Vector4> {
    let mut x = start;
    for _ in 0..params.newton_max_iterations {
        let (p1, p2) = pair.positions(&x);
        let gap = p1 - p2;
        let f = Vector4::new(gap.x, gap.y, gap.z, (p1 - prev).dot(t) - dist);
        if f.norm() < params.newton_tolerance {
            return Some(x);
        }
        let (a_u, a_v) = pair.first.tangents(x[0], x[1]);
        let (b_u, b_v) = pair.second.tangents(x[2], x[3]);
        #[rustfmt::skip]
        let jacobian = Matrix4::new(
            a_u.x, a_v.x, -b_u.x, -b_v.x,
            a_u.y, a_v.y, -b_u.y, -b_v.y,
            a_u.z, a_v.z, -b_u.z, -b_v.z,
            a_u.dot(t), a_v.dot(t), 0.0, 0.0,
        );
        let inverse = jacobian.try_inverse()?;
        x = pair.wrap(x - inverse * f);
        if !x.iter().all(|c| c.is_finite()) {
            return None;
        }
    }
    let (p1, p2) = pair.positions(&x);
    ((p1 - p2).norm() < params.newton_tolerance).then_some(x)
}

fn step(
    pair: &SurfacePair<'_>,
    from: &Vector4,
    sign: f64,
    dist: f64,
    params: &IntersectionParams,
) -> Step {
    let Some(t) = march_direction(pair, from).map(|t| t * sign) else {
        return Step::Failed;
    };
    let prev = pair.first.point(from[0], from[1]);
    let s1 = parameter_step(pair.first, from[0], from[1], &(t * dist));
    let s2 = parameter_step(pair.second, from[2], from[3], &(t * dist));
    let guess = pair.wrap(from + Vector4::new(s1.x, s1.y, s2.x, s2.y));
    match solve(pair, guess, &prev, &t, dist, params) {
        Some(x) if pair.coincident(&x) => Step::Failed,
        Some(x) if pair.inside(&x, params.domain_margin) => Step::Done(x),
        Some(x) => Step::OutOfDomain(x),
        None => Step::Failed,
    }
}

/// Open parameters as `(index into (u1, v1, u2, v2), min, max)`.
fn open_bounds(pair: &SurfacePair<'_>) -> Vec<(usize, f64, f64)> {
    let mut bounds = Vec::with_capacity(4);
    for (offset, surface) in [(0, pair.first), (2, pair.second)] {
        let d = surface.domain();
        if !surface.is_u_closed() {
            bounds.push((offset, d.u_min, d.u_max));
        }
        if !surface.is_v_closed() {
            bounds.push((offset + 1, d.v_min, d.v_max));
        }
    }
    bounds
}

/// The point where the curve between `from` (inside) and `out` (past the
/// domain) meets the first open edge it crosses.
///
/// The crossed parameter is pinned to its edge and the remaining three are
/// solved from `S1 - S2 = 0`.
fn clamp_to_boundary(
    pair: &SurfacePair<'_>,
    from: &Vector4,
    out: &Vector4,
    params: &IntersectionParams,
) -> Option<Vector4> {
    let mut crossing: Option<(f64, usize, f64)> = None;
    for (k, lo, hi) in open_bounds(pair) {
        let edge = if out[k] < lo {
            lo
        } else if out[k] > hi {
            hi
        } else {
            continue;
        };
        let span = out[k] - from[k];
        let s = if span.abs() < f64::EPSILON {
            0.0
        } else {
            ((edge - from[k]) / span).clamp(0.0, 1.0)
        };
        let earlier = match crossing {
            Some((best, _, _)) => s < best,
            None => true,
        };
        if earlier {
            crossing = Some((s, k, edge));
        }
    }
    let (s, fixed, edge) = crossing?;

    // Closed directions may have wrapped between `from` and `out`.
    let mut delta = out - from;
    for (k, surface) in [(0, pair.first), (2, pair.second)] {
        let d = surface.domain();
        for (i, closed, span) in [
            (k, surface.is_u_closed(), d.u_span()),
            (k + 1, surface.is_v_closed(), d.v_span()),
        ] {
            if closed && delta[i].abs() > 0.5 * span {
                delta[i] -= span.copysign(delta[i]);
            }
        }
    }
    let mut x = pair.wrap(from + delta * s);
    x[fixed] = edge;
    let free: Vec<usize> = (0..4).filter(|&k| k != fixed).collect();
    for _ in 0..params.newton_max_iterations {
        let (p1, p2) = pair.positions(&x);
        let gap = p1 - p2;
        if gap.norm() < params.newton_tolerance {
            break;
        }
        let (a_u, a_v) = pair.first.tangents(x[0], x[1]);
        let (b_u, b_v) = pair.second.tangents(x[2], x[3]);
        let columns = [a_u, a_v, -b_u, -b_v];
        let jacobian = Matrix3::from_columns(&[columns[free[0]], columns[free[1]], columns[free[2]]]);
        let delta = jacobian.try_inverse()? * gap;
        for (i, &k) in free.iter().enumerate() {
            x[k] -= delta[i];
        }
        x = pair.wrap(x);
        if !x.iter().all(|c| c.is_finite()) {
            return None;
        }
    }
    let (p1, p2) = pair.positions(&x);
    ((p1 - p2).norm() < params.newton_tolerance && pair.inside(&x, params.domain_margin))
        .then_some(x)
}

fn make_point(pair: &SurfacePair<'_>, uvs: Vector4) -> PointOfIntersection {
    PointOfIntersection {
        pos: pair.first.point(uvs[0], uvs[1]),
        uvs,
    }
}

/// Marches from the last point of `points` in direction `sign`.
fn march(
    pair: &SurfacePair<'_>,
    points: &mut Vec<PointOfIntersection>,
    sign: f64,
    budget: usize,
    close: bool,
    params: &IntersectionParams,
) -> MarchEnd {
    let origin = points[0].pos;
    let closing = params.closing_distance();
    while points.len() < budget {
        let Some(last) = points.last().map(|p| p.uvs) else {
            return MarchEnd::Failed;
        };
        let mut result = step(pair, &last, sign, params.step, params);
        if !matches!(result, Step::Done(_)) {
            let retry = step(pair, &last, sign, 0.5 * params.step, params);
            if !matches!(retry, Step::Failed) {
                result = retry;
            }
        }
        match result {
            Step::Done(x) => {
                let p = make_point(pair, x);
                if close
                    && points.len() >= params.min_loop_points
                    && (p.pos - origin).norm() < closing
                {
                    return MarchEnd::Closed;
                }
                points.push(p);
            }
            Step::OutOfDomain(out) => {
                if let Some(edge) = clamp_to_boundary(pair, &last, &out, params) {
                    let p = make_point(pair, edge);
                    // An end point already on the edge is replaced, not doubled.
                    if points.last().is_some_and(|q| (q.pos - p.pos).norm() < FZERO) {
                        points.pop();
                    }
                    points.push(p);
                }
                return MarchEnd::Boundary;
            }
            Step::Failed => return MarchEnd::Failed,
        }
    }
    MarchEnd::Exhausted
}

/// Polishes `seed` onto the curve and traces the curve in both directions.
///
/// Returns `None` if the seed cannot be projected or no step can be taken
/// away from it.
pub(super) fn trace(
    pair: &SurfacePair<'_>,
    seed: Vector4,
    params: &IntersectionParams,
) -> Option<TracedCurve> {
    let t = march_direction(pair, &seed)?;
    let seed_pos = pair.first.point(seed[0], seed[1]);
    let seed = solve(pair, seed, &seed_pos, &t, 0.0, params)?;

    let mut forward = vec![make_point(pair, seed)];
    let end = march(pair, &mut forward, 1.0, params.max_points, true, params);
    debug!(?end, points = forward.len(), "forward march finished");
    if end == MarchEnd::Closed {
        return Some(TracedCurve {
            points: forward,
            closed: true,
        });
    }

    let mut backward = vec![forward[0]];
    if end != MarchEnd::Exhausted {
        let budget = params.max_points.saturating_sub(forward.len()) + 1;
        let back_end = march(pair, &mut backward, -1.0, budget, false, params);
        debug!(?back_end, points = backward.len(), "backward march finished");
    }
    if forward.len() == 1 && backward.len() == 1 {
        return None;
    }

    backward.reverse();
    backward.extend(forward.into_iter().skip(1));
    Some(TracedCurve {
        points: backward,
        closed: false,
    })
}
