//! Graph of cut segments and the covering walk over it.

mod build;
mod traverse;

pub use traverse::Traversal;

use crate::error::GraphError;
use crate::math::polygon_2d::polyline_length;
use crate::math::Point2;

/// Index of a vertex in a [`SegmentGraph`].
pub type VertexId = usize;

/// Index of an edge in a [`SegmentGraph`].
pub type EdgeId = usize;

/// Where an edge comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Piece of a cutting line in the stock plane.
    Vertical,
    /// Piece of the stock rectangle's border.
    Horizontal,
    /// Piece of a contour between two cutting-line crossings.
    Contour,
    /// Piece of a cutting line in a surface's parameter plane.
    Inner,
}

impl EdgeKind {
    /// Edges the traversal has to cover.
    #[must_use]
    pub fn is_important(self) -> bool {
        matches!(self, Self::Vertical | Self::Inner)
    }
}

/// Graph vertex: a crossing between a cutting line and a boundary loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub pos: Point2,
    /// Index of the cutting line, if the vertex lies on one.
    pub line: Option<usize>,
    /// Index of the boundary loop the vertex lies on.
    pub contour: Option<usize>,
}

/// Undirected edge with the polyline it stands for, stored from `from` to `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: VertexId,
    pub to: VertexId,
    pub points: Vec<Point2>,
    pub length: f64,
}

impl Edge {
    /// The vertex at the other end.
    #[must_use]
    pub fn other(&self, v: VertexId) -> VertexId {
        if v == self.from {
            self.to
        } else {
            self.from
        }
    }

    /// The polyline oriented to start at `v`.
    #[must_use]
    pub fn points_from(&self, v: VertexId) -> Vec<Point2> {
        if v == self.from {
            self.points.clone()
        } else {
            self.points.iter().rev().copied().collect()
        }
    }
}

/// Adjacency-list graph over cut segments.
///
/// Every edge is stored once and referenced from both end vertices, so
/// looking it up from either side yields the same [`EdgeId`].
#[derive(Debug, Clone)]
pub struct SegmentGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<(VertexId, EdgeId)>>,
    eps: f64,
}

impl SegmentGraph {
    /// Creates an empty graph that merges vertices closer than `eps`.
    #[must_use]
    pub fn new(eps: f64) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            eps,
        }
    }

    /// Adds a vertex, or returns the existing one at the same position.
    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        if let Some(id) = self
            .vertices
            .iter()
            .position(|v| (v.pos - vertex.pos).norm() < self.eps)
        {
            return id;
        }
        self.vertices.push(vertex);
        self.adjacency.push(Vec::new());
        self.vertices.len() - 1
    }

    /// Adds an undirected edge along `points`.
    ///
    /// Zero-length edges and edges duplicating an existing one (same kind
    /// and the same polyline in either direction) are skipped and yield
    /// `None`.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        kind: EdgeKind,
        points: Vec<Point2>,
    ) -> Option<EdgeId> {
        let length = polyline_length(&points);
        if length < self.eps || from >= self.vertices.len() || to >= self.vertices.len() {
            return None;
        }
        let duplicate = self.adjacency[from].iter().any(|&(n, e)| {
            let edge = &self.edges[e];
            n == to && edge.kind == kind && same_polyline(&edge.points, &points, self.eps)
        });
        if duplicate {
            return None;
        }
        let id = self.edges.len();
        self.edges.push(Edge {
            kind,
            from,
            to,
            points,
            length,
        });
        self.adjacency[from].push((to, id));
        if from != to {
            self.adjacency[to].push((from, id));
        }
        Some(id)
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Neighbours of `v` with the connecting edge, in insertion order.
    #[must_use]
    pub fn neighbors(&self, v: VertexId) -> &[(VertexId, EdgeId)] {
        self.adjacency.get(v).map_or(&[], Vec::as_slice)
    }

    /// Ids of all edges the traversal has to cover.
    #[must_use]
    pub fn important_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.kind.is_important().then_some(i))
            .collect()
    }

    /// Vertex closest to `p`.
    #[must_use]
    pub fn nearest_vertex(&self, p: &Point2) -> Option<VertexId> {
        self.vertices
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1.pos - p).norm().total_cmp(&(b.1.pos - p).norm()))
            .map(|(i, _)| i)
    }

    /// Expands a traversal into the polyline it walks.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingEdge`] if a recorded edge does not join
    /// the two vertices it was recorded between.
    pub fn walk_points(&self, walk: &Traversal) -> Result<Vec<Point2>, GraphError> {
        let mut out: Vec<Point2> = Vec::new();
        if let Some(v) = walk.vertices.first().and_then(|&v| self.vertex(v)) {
            out.push(v.pos);
        }
        for (k, &edge_id) in walk.edges.iter().enumerate() {
            let from = walk.vertices[k];
            let to = walk.vertices[k + 1];
            let edge = self
                .edge(edge_id)
                .filter(|e| (e.from == from && e.to == to) || (e.from == to && e.to == from))
                .ok_or(GraphError::MissingEdge {
                    edge: edge_id,
                    from,
                    to,
                })?;
            out.extend(edge.points_from(from).into_iter().skip(1));
        }
        Ok(out)
    }
}

fn same_polyline(a: &[Point2], b: &[Point2], eps: f64) -> bool {
    let close = |p: &Point2, q: &Point2| (p - q).norm() < eps;
    a.len() == b.len()
        && (a.iter().zip(b).all(|(p, q)| close(p, q))
            || a.iter().zip(b.iter().rev()).all(|(p, q)| close(p, q)))
}
