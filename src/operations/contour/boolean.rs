use std::collections::HashMap;

use tracing::warn;

use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::polygon_2d::{contains, dedup_closed, signed_area, to_ccw};
use crate::math::{Point2, TOLERANCE};

/// Boolean operation on two closed polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Intersection,
    /// First minus second.
    Difference,
}

struct Node {
    p: Point2,
    crossing: Option<usize>,
}

struct Fragment {
    start: usize,
    end: usize,
    points: Vec<Point2>,
}

impl Fragment {
    fn probe(&self) -> Point2 {
        Point2::from((self.points[0].coords + self.points[1].coords) * 0.5)
    }

    fn reversed(mut self) -> Self {
        self.points.reverse();
        Self {
            start: self.end,
            end: self.start,
            points: self.points,
        }
    }
}

/// Crossing points of the boundaries of `a` and `b`, plus for every edge of
/// each polygon the `(edge parameter, crossing id)` pairs along it.
#[allow(clippy::type_complexity)]
fn crossings(a: &[Point2], b: &[Point2]) -> (usize, Vec<Vec<(f64, usize)>>, Vec<Vec<(f64, usize)>>) {
    let mut points: Vec<Point2> = Vec::new();
    let mut on_a = vec![Vec::new(); a.len()];
    let mut on_b = vec![Vec::new(); b.len()];
    for i in 0..a.len() {
        let a0 = &a[i];
        let a1 = &a[(i + 1) % a.len()];
        for j in 0..b.len() {
            let b0 = &b[j];
            let b1 = &b[(j + 1) % b.len()];
            let Some((p, t, u)) = segment_segment_intersect_2d(a0, a1, b0, b1) else {
                continue;
            };
            // Half-open edges so a crossing at a shared vertex counts once.
            if t >= 1.0 || u >= 1.0 {
                continue;
            }
            if points.iter().any(|q| (q - p).norm() < TOLERANCE) {
                continue;
            }
            let id = points.len();
            points.push(p);
            on_a[i].push((t, id));
            on_b[j].push((u, id));
        }
    }
    for list in on_a.iter_mut().chain(on_b.iter_mut()) {
        list.sort_by(|x, y| x.0.total_cmp(&y.0));
    }
    (points.len(), on_a, on_b)
}

fn augment(poly: &[Point2], per_edge: &[Vec<(f64, usize)>]) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(poly.len() * 2);
    for (i, list) in per_edge.iter().enumerate() {
        nodes.push(Node {
            p: poly[i],
            crossing: None,
        });
        let a = poly[i];
        let d = poly[(i + 1) % poly.len()] - a;
        for &(t, id) in list {
            nodes.push(Node {
                p: a + d * t,
                crossing: Some(id),
            });
        }
    }
    nodes
}

/// Splits the augmented boundary at its crossings.
fn fragments(nodes: &[Node]) -> Vec<Fragment> {
    let marks: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.crossing.map(|_| i))
        .collect();
    let n = nodes.len();
    let mut out = Vec::with_capacity(marks.len());
    for (k, &s) in marks.iter().enumerate() {
        let e = marks[(k + 1) % marks.len()];
        let mut points = vec![nodes[s].p];
        let mut i = (s + 1) % n;
        loop {
            points.push(nodes[i].p);
            if i == e {
                break;
            }
            i = (i + 1) % n;
        }
        let (Some(start), Some(end)) = (nodes[s].crossing, nodes[e].crossing) else {
            continue;
        };
        out.push(Fragment { start, end, points });
    }
    out
}

fn chain(kept: Vec<Fragment>) -> Vec<Vec<Point2>> {
    let mut by_start: HashMap<usize, usize> = HashMap::new();
    for (i, f) in kept.iter().enumerate() {
        if by_start.insert(f.start, i).is_some() {
            warn!(crossing = f.start, "two boundary pieces leave the same crossing");
        }
    }
    let mut used = vec![false; kept.len()];
    let mut loops = Vec::new();
    for first in 0..kept.len() {
        if used[first] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = first;
        let closed = loop {
            used[current] = true;
            let f = &kept[current];
            ring.extend_from_slice(&f.points[..f.points.len() - 1]);
            match by_start.get(&f.end) {
                Some(&next) if next == first => break true,
                Some(&next) if !used[next] => current = next,
                _ => break false,
            }
        };
        if !closed {
            warn!("discarding an unclosed boolean result loop");
            continue;
        }
        let ring = dedup_closed(&ring, TOLERANCE);
        if ring.len() >= 3 && signed_area(&ring).abs() > TOLERANCE {
            loops.push(ring);
        }
    }
    loops
}

fn without_crossings(a: Vec<Point2>, b: Vec<Point2>, op: BooleanOp) -> Vec<Vec<Point2>> {
    let a_in_b = contains(&b, &a[0]);
    let b_in_a = contains(&a, &b[0]);
    match op {
        BooleanOp::Union if a_in_b => vec![b],
        BooleanOp::Union if b_in_a => vec![a],
        BooleanOp::Union => vec![a, b],
        BooleanOp::Intersection if a_in_b => vec![a],
        BooleanOp::Intersection if b_in_a => vec![b],
        BooleanOp::Intersection => Vec::new(),
        BooleanOp::Difference if a_in_b => Vec::new(),
        BooleanOp::Difference if b_in_a => vec![a, b.into_iter().rev().collect()],
        BooleanOp::Difference => vec![a],
    }
}

/// Applies `op` to two simple closed polygons.
///
/// Inputs may have either orientation. Result loops are counter-clockwise
/// for material and clockwise for holes.
#[must_use]
pub fn boolean(a: &[Point2], b: &[Point2], op: BooleanOp) -> Vec<Vec<Point2>> {
    let a = to_ccw(&dedup_closed(a, TOLERANCE));
    let b = to_ccw(&dedup_closed(b, TOLERANCE));
    if a.len() < 3 || b.len() < 3 {
        return match op {
            BooleanOp::Union => [a, b].into_iter().filter(|p| p.len() >= 3).collect(),
            BooleanOp::Intersection => Vec::new(),
            BooleanOp::Difference => [a].into_iter().filter(|p| p.len() >= 3).collect(),
        };
    }

    let (count, on_a, on_b) = crossings(&a, &b);
    if count < 2 {
        return without_crossings(a, b, op);
    }

    let frags_a = fragments(&augment(&a, &on_a));
    let frags_b = fragments(&augment(&b, &on_b));
    let mut kept = Vec::new();
    for f in frags_a {
        let inside = contains(&b, &f.probe());
        let keep = match op {
            BooleanOp::Union | BooleanOp::Difference => !inside,
            BooleanOp::Intersection => inside,
        };
        if keep {
            kept.push(f);
        }
    }
    for f in frags_b {
        let inside = contains(&a, &f.probe());
        match op {
            BooleanOp::Union if !inside => kept.push(f),
            BooleanOp::Intersection if inside => kept.push(f),
            BooleanOp::Difference if inside => kept.push(f.reversed()),
            _ => {}
        }
    }
    chain(kept)
}

/// Returns `true` if the two polygons share any area.
#[must_use]
pub fn overlaps(a: &[Point2], b: &[Point2]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    let (count, _, _) = crossings(a, b);
    count >= 2 || contains(b, &a[0]) || contains(a, &b[0])
}

/// Merges overlapping polygons. Disjoint inputs are kept separate.
///
/// Output loops follow the orientation convention of [`boolean`].
#[must_use]
pub fn union_all(polygons: &[Vec<Point2>]) -> Vec<Vec<Point2>> {
    let mut acc: Vec<Vec<Point2>> = Vec::new();
    for poly in polygons {
        let mut current = to_ccw(poly);
        if current.len() < 3 {
            continue;
        }
        let mut rest = Vec::new();
        for other in acc.drain(..) {
            if signed_area(&other) < 0.0 || !overlaps(&current, &other) {
                rest.push(other);
                continue;
            }
            let mut merged = boolean(&current, &other, BooleanOp::Union);
            merged.sort_by(|x, y| signed_area(y).total_cmp(&signed_area(x)));
            let mut pieces = merged.into_iter();
            if let Some(outer) = pieces.next() {
                current = outer;
            }
            rest.extend(pieces);
        }
        rest.push(current);
        acc = rest;
    }
    acc
}
