use crate::geometry::surface::Surface;
use crate::math::{Point3, Vector4};

use super::SurfacePair;

struct Sample {
    cell: (usize, usize),
    u: f64,
    v: f64,
    pos: Point3,
}

fn sample(surface: &dyn Surface, n: usize) -> Vec<Sample> {
    let d = surface.domain();
    let du = d.u_span() / n as f64;
    let dv = d.v_span() / n as f64;
    let mut out = Vec::with_capacity(n * n);
    for i in 0..n {
        let u = d.u_min + du * (i as f64 + 0.5);
        for j in 0..n {
            let v = d.v_min + dv * (j as f64 + 0.5);
            out.push(Sample {
                cell: (i, j),
                u,
                v,
                pos: surface.point(u, v),
            });
        }
    }
    out
}

/// Cells closer than one step apart, counting across closed seams.
fn neighbours(a: usize, b: usize, n: usize, closed: bool) -> bool {
    let d = a.abs_diff(b);
    d <= 1 || (closed && d == n - 1)
}

/// Picks the pair of cell centres whose sampled points are closest,
/// optionally weighted by their distances to `hint`.
///
/// For a self-intersection the same and adjacent cells are skipped, since
/// they trivially meet.
pub(super) fn search(pair: &SurfacePair<'_>, n: usize, hint: Option<&Point3>) -> Vector4 {
    let n = n.max(1);
    let first = sample(pair.first, n);
    let second = if pair.same {
        None
    } else {
        Some(sample(pair.second, n))
    };
    let second_ref = second.as_deref().unwrap_or(&first);
    let u_closed = pair.first.is_u_closed();
    let v_closed = pair.first.is_v_closed();

    let mut best = f64::INFINITY;
    let mut seed = Vector4::new(first[0].u, first[0].v, second_ref[0].u, second_ref[0].v);
    for a in &first {
        let bias_a = hint.map_or(0.0, |h| (a.pos - h).norm());
        for b in second_ref {
            if pair.same
                && neighbours(a.cell.0, b.cell.0, n, u_closed)
                && neighbours(a.cell.1, b.cell.1, n, v_closed)
            {
                continue;
            }
            let bias = bias_a + hint.map_or(0.0, |h| (b.pos - h).norm());
            let cost = (a.pos - b.pos).norm() + bias;
            if cost < best {
                best = cost;
                seed = Vector4::new(a.u, a.v, b.u, b.v);
            }
        }
    }
    seed
}
