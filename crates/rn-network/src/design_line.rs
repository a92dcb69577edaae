//! Design-line assembly: the centre line of a Link, trimmed where the road
//! surface meets the footprint of its end Nodes.
//!
//! # Trimming
//!
//! For each end whose Node has a circle (the `to` end first, then the
//! `from` end) the boundary segment nearest that end is intersected with
//! the circle (see [`Circle::entry_fraction`]).  The entry point is put in
//! the line next to the end point, after removing interior vertices that
//! lie closer to both the entry point and the end point than those two are
//! to each other.  An entry point within the snap tolerance of the adjacent
//! vertex replaces that vertex instead of duplicating it.
//!
//! A Link that is too short for the footprint, or whose boundary segment
//! is degenerate, keeps its raw geometry at that end.

use tracing::debug;

use rn_core::geom::polyline_length;
use rn_core::{Circle, Vertex};

use crate::link::{Link, LinkState};
use crate::node::Node;

/// The untrimmed sequence `[from] + intermediate + [to]`.
pub fn raw_vertices(from: Vertex, intermediate: &[Vertex], to: Vertex) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(intermediate.len() + 2);
    out.push(from);
    out.extend_from_slice(intermediate);
    out.push(to);
    out
}

/// Trim `raw` (at least two points) against the optional end-Node circles.
pub fn trim(
    mut vertices:   Vec<Vertex>,
    from_circle:    Option<Circle>,
    to_circle:      Option<Circle>,
    snap_tolerance: f64,
) -> Vec<Vertex> {
    if vertices.len() < 2 {
        return vertices;
    }

    if let Some(circle) = to_circle {
        let n = vertices.len();
        let (inner, end) = (vertices[n - 2], vertices[n - 1]);
        match circle.entry_fraction(inner, end) {
            Some(t) => {
                let entry = Vertex::weighted(t, inner, end);
                delete_vertices_between(&mut vertices, entry, end);
                let n = vertices.len();
                if vertices[n - 2].distance(entry) < snap_tolerance {
                    vertices[n - 2] = entry;
                } else {
                    vertices.insert(n - 1, entry);
                }
            }
            None => debug!(%end, radius = circle.radius, "design line does not reach the to-node circle"),
        }
    }

    if let Some(circle) = from_circle {
        let (inner, end) = (vertices[1], vertices[0]);
        match circle.entry_fraction(inner, end) {
            Some(t) => {
                let exit = Vertex::weighted(t, inner, end);
                delete_vertices_between(&mut vertices, end, exit);
                if vertices[1].distance(exit) < snap_tolerance {
                    vertices[1] = exit;
                } else {
                    vertices.insert(1, exit);
                }
            }
            None => debug!(%end, radius = circle.radius, "design line does not reach the from-node circle"),
        }
    }

    vertices
}

/// Remove interior vertices that are closer to both `a` and `b` than `a`
/// and `b` are to each other.  The first and last vertex are never removed.
fn delete_vertices_between(vertices: &mut Vec<Vertex>, a: Vertex, b: Vertex) {
    let span = a.distance(b);
    let mut i = vertices.len().saturating_sub(1);
    while i > 1 {
        i -= 1;
        let v = vertices[i];
        if v.distance(a) < span && v.distance(b) < span {
            vertices.remove(i);
        }
    }
}

impl Link {
    /// The untrimmed vertex sequence between the two end Nodes.
    pub fn raw_vertices(&self, from: &Node, to: &Node) -> Vec<Vertex> {
        raw_vertices(from.position(), &self.intermediate, to.position())
    }

    /// The trimmed design line, computed from the given end Nodes.
    pub fn design_line(&self, from: &Node, to: &Node, snap_tolerance: f64) -> Vec<Vertex> {
        trim(self.raw_vertices(from, to), from.circle(), to.circle(), snap_tolerance)
    }

    /// Recompute the cached length: arc length over the raw vertices,
    /// regardless of any trimming.
    pub fn calculate_length(&mut self, from: &Node, to: &Node) {
        self.length = polyline_length(&self.raw_vertices(from, to));
    }

    /// Recompute length and cached design line.
    pub(crate) fn compute_geometry(&mut self, from: &Node, to: &Node, snap_tolerance: f64) {
        self.calculate_length(from, to);
        self.design_line = self.design_line(from, to, snap_tolerance);
        self.state = LinkState::GeometryComputed;
        debug!(link = %self.name, length = self.length, vertices = self.design_line.len(), "geometry computed");
    }
}
