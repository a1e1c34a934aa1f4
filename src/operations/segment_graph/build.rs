use tracing::debug;

use crate::error::GraphError;
use crate::math::intersect_2d::crossing_with_vertical;
use crate::math::Point2;
use crate::operations::contour::{Rect, Region};

use super::{EdgeKind, SegmentGraph, Vertex, VertexId};

/// A crossing of a cutting line with a boundary loop.
struct Hit {
    y: f64,
    contour: usize,
    edge: usize,
    t: f64,
}

/// Where a vertex sits on its loop.
#[derive(Clone, Copy)]
struct LoopStop {
    edge: usize,
    t: f64,
    vertex: VertexId,
}

impl SegmentGraph {
    /// Builds the graph of a stock rectangle with `contours` cut out of it,
    /// sliced by vertical lines at `xs`.
    ///
    /// Line pieces outside every contour become [`EdgeKind::Vertical`]
    /// edges, border pieces between lines become [`EdgeKind::Horizontal`]
    /// edges and contour pieces become [`EdgeKind::Contour`] edges.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no lines or nothing is left of the
    /// rectangle.
    pub fn from_vertical_lines(
        stock: &Rect,
        contours: &[Vec<Point2>],
        xs: &[f64],
        eps: f64,
    ) -> Result<Self, GraphError> {
        let mut region = Region::rect(stock);
        for contour in contours {
            region = region.subtract(contour);
        }
        build(region.loops(), xs, EdgeKind::Vertical, Some(stock), eps)
    }

    /// Builds the graph of a region in a surface's parameter plane, sliced
    /// by lines of constant first coordinate at `us`.
    ///
    /// Line pieces inside the region become [`EdgeKind::Inner`] edges and
    /// boundary pieces become [`EdgeKind::Contour`] edges.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no lines or the region is empty.
    pub fn from_inner_cuts(region: &Region, us: &[f64], eps: f64) -> Result<Self, GraphError> {
        build(region.loops(), us, EdgeKind::Inner, None, eps)
    }
}

fn build(
    loops: &[Vec<Point2>],
    lines: &[f64],
    line_kind: EdgeKind,
    border: Option<&Rect>,
    eps: f64,
) -> Result<SegmentGraph, GraphError> {
    if lines.is_empty() {
        return Err(GraphError::InvalidInput("no cutting lines".into()));
    }
    if loops.is_empty() {
        return Err(GraphError::InvalidInput("empty region".into()));
    }

    let mut graph = SegmentGraph::new(eps);
    let mut stops: Vec<Vec<LoopStop>> = vec![Vec::new(); loops.len()];

    for (line, &x) in lines.iter().enumerate() {
        let mut hits = Vec::new();
        for (contour, lp) in loops.iter().enumerate() {
            for edge in 0..lp.len() {
                let a = &lp[edge];
                let b = &lp[(edge + 1) % lp.len()];
                if let Some(t) = crossing_with_vertical(a, b, x) {
                    hits.push(Hit {
                        y: a.y + (b.y - a.y) * t,
                        contour,
                        edge,
                        t,
                    });
                }
            }
        }
        hits.sort_by(|a, b| a.y.total_cmp(&b.y));

        let mut ids = Vec::with_capacity(hits.len());
        for hit in &hits {
            let vertex = graph.add_vertex(Vertex {
                pos: Point2::new(x, hit.y),
                line: Some(line),
                contour: Some(hit.contour),
            });
            stops[hit.contour].push(LoopStop {
                edge: hit.edge,
                t: hit.t,
                vertex,
            });
            ids.push((vertex, hit.y));
        }
        // Even-odd: the line is inside between the 1st and 2nd hit, the
        // 3rd and 4th, and so on.
        for pair in ids.chunks_exact(2) {
            let (a, ya) = pair[0];
            let (b, yb) = pair[1];
            graph.add_edge(
                a,
                b,
                line_kind,
                vec![Point2::new(x, ya), Point2::new(x, yb)],
            );
        }
    }

    for (contour, lp) in loops.iter().enumerate() {
        let list = &mut stops[contour];
        list.sort_by(|a, b| a.edge.cmp(&b.edge).then(a.t.total_cmp(&b.t)));
        for k in 0..list.len() {
            let from = list[k];
            let to = list[(k + 1) % list.len()];
            let points = loop_piece(lp, from, to, &graph);
            let kind = match border {
                Some(rect) if along_border(rect, &points, eps) => EdgeKind::Horizontal,
                _ => EdgeKind::Contour,
            };
            graph.add_edge(from.vertex, to.vertex, kind, points);
        }
    }

    debug!(
        vertices = graph.vertices().len(),
        edges = graph.edges().len(),
        "segment graph built"
    );
    Ok(graph)
}

/// The part of loop `lp` running forward from one stop to the next.
fn loop_piece(lp: &[Point2], from: LoopStop, to: LoopStop, graph: &SegmentGraph) -> Vec<Point2> {
    let pos = |s: LoopStop| graph.vertex(s.vertex).map_or(lp[s.edge], |v| v.pos);
    let mut points = vec![pos(from)];
    if !(to.edge == from.edge && to.t > from.t) {
        let n = lp.len();
        let mut i = (from.edge + 1) % n;
        loop {
            points.push(lp[i]);
            if i == to.edge {
                break;
            }
            i = (i + 1) % n;
        }
    }
    points.push(pos(to));
    points
}

fn along_border(rect: &Rect, points: &[Point2], eps: f64) -> bool {
    points.iter().all(|p| rect.on_border(p, eps))
        && points
            .windows(2)
            .all(|w| rect.on_border(&Point2::from((w[0].coords + w[1].coords) * 0.5), eps))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Vec<Point2> {
        vec![
            Point2::new(x, y),
            Point2::new(x + s, y),
            Point2::new(x + s, y + s),
            Point2::new(x, y + s),
        ]
    }

    fn count(g: &SegmentGraph, kind: EdgeKind) -> usize {
        g.edges().iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn stock_with_pocket() {
        let stock = Rect::new(Point2::new(0.0, 0.0), Point2::new(10.0, 6.0));
        let g = SegmentGraph::from_vertical_lines(
            &stock,
            &[square(4.0, 2.0, 2.0)],
            &[1.0, 3.0, 5.0, 7.0, 9.0],
            1e-6,
        )
        .unwrap();
        assert_eq!(count(&g, EdgeKind::Vertical), 6);
        assert_eq!(count(&g, EdgeKind::Contour), 2);
        // Border pieces between the ten border vertices.
        assert_eq!(count(&g, EdgeKind::Horizontal), 10);
        for e in g.edges().iter().filter(|e| e.kind == EdgeKind::Vertical) {
            let mid = Point2::from((e.points[0].coords + e.points[1].coords) * 0.5);
            assert!(!(mid.x > 4.0 && mid.x < 6.0 && mid.y > 2.0 && mid.y < 4.0));
        }
    }

    #[test]
    fn unit_square_ladder() {
        let region = Region::from_loops(vec![square(0.0, 0.0, 1.0)]);
        let g = SegmentGraph::from_inner_cuts(&region, &[0.25, 0.5, 0.75], 1e-9).unwrap();
        assert_eq!(g.vertices().len(), 6);
        assert_eq!(count(&g, EdgeKind::Inner), 3);
        assert_eq!(count(&g, EdgeKind::Contour), 6);
        let total: f64 = g
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Contour)
            .map(|e| e.length)
            .sum();
        assert!((total - 4.0).abs() < 1e-12);
    }

    #[test]
    fn no_lines_is_an_error() {
        let region = Region::from_loops(vec![square(0.0, 0.0, 1.0)]);
        assert!(SegmentGraph::from_inner_cuts(&region, &[], 1e-9).is_err());
    }
}
