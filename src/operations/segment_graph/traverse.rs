use tracing::debug;

use super::{EdgeId, SegmentGraph, VertexId};

/// Score added for an edge that still has to be covered.
const IMPORTANT_BONUS: f64 = 1000.0;

/// A walk through the graph: `edges[k]` joins `vertices[k]` and
/// `vertices[k + 1]`. Backtracking hops are part of the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traversal {
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
}

struct Coverage {
    visited: Vec<bool>,
    covered: Vec<bool>,
    remaining: usize,
}

impl SegmentGraph {
    /// Walks the component of `start`, trying to cover every important edge.
    ///
    /// Greedy depth-first search: from the vertex on top of the stack, move
    /// to the best neighbour that is either unvisited or reached through an
    /// uncovered important edge. Scores are a large bonus for an uncovered
    /// important edge plus the inverse edge length; the first neighbour in
    /// adjacency order wins ties. With no candidate left the walk steps back
    /// to the previous stack entry. It ends once every important edge is
    /// covered or the stack is empty.
    #[must_use]
    pub fn traverse(&self, start: VertexId) -> Traversal {
        let mut coverage = self.fresh_coverage();
        self.walk_from(start, &mut coverage)
    }

    /// Like [`SegmentGraph::traverse`], restarting in another component
    /// while important edges remain uncovered.
    #[must_use]
    pub fn traverse_all(&self, start: VertexId) -> Vec<Traversal> {
        let mut coverage = self.fresh_coverage();
        let mut walks = Vec::new();
        let mut next = Some(start);
        while let Some(v) = next {
            let walk = self.walk_from(v, &mut coverage);
            if !walk.vertices.is_empty() {
                walks.push(walk);
            }
            next = (coverage.remaining > 0)
                .then(|| {
                    self.edges
                        .iter()
                        .enumerate()
                        .find(|(i, e)| e.kind.is_important() && !coverage.covered[*i])
                        .map(|(_, e)| e.from)
                })
                .flatten();
        }
        debug!(walks = walks.len(), "graph traversal finished");
        walks
    }

    fn fresh_coverage(&self) -> Coverage {
        Coverage {
            visited: vec![false; self.vertices.len()],
            covered: vec![false; self.edges.len()],
            remaining: self.important_edges().len(),
        }
    }

    fn walk_from(&self, start: VertexId, cov: &mut Coverage) -> Traversal {
        let mut walk = Traversal::default();
        if start >= self.vertices.len() {
            return walk;
        }
        cov.visited[start] = true;
        walk.vertices.push(start);
        let mut stack: Vec<(VertexId, Option<EdgeId>)> = vec![(start, None)];

        while cov.remaining > 0 {
            let Some(&(v, _)) = stack.last() else {
                break;
            };
            let mut best: Option<(f64, VertexId, EdgeId)> = None;
            for &(n, e) in self.neighbors(v) {
                let edge = &self.edges[e];
                let open = edge.kind.is_important() && !cov.covered[e];
                if cov.visited[n] && !open {
                    continue;
                }
                let bonus = if open { IMPORTANT_BONUS } else { 0.0 };
                let score = bonus + 1.0 / edge.length;
                if best.is_none_or(|(s, _, _)| score > s) {
                    best = Some((score, n, e));
                }
            }

            if let Some((_, n, e)) = best {
                if self.edges[e].kind.is_important() && !cov.covered[e] {
                    cov.covered[e] = true;
                    cov.remaining -= 1;
                }
                cov.visited[n] = true;
                stack.push((n, Some(e)));
                walk.vertices.push(n);
                walk.edges.push(e);
            } else if let Some((_, arrived)) = stack.pop() {
                if let (Some(e), Some(&(top, _))) = (arrived, stack.last()) {
                    walk.vertices.push(top);
                    walk.edges.push(e);
                }
            }
        }
        walk
    }
}
