//! Virtual elements (C2): points lying on target vertices or edges.
//!
//! A tagged sum type, matched on at each use site rather than modeled as a
//! class hierarchy (per the design notes). `λ = 0` / `λ = 1` normalize to the
//! incident vertex variant in the constructor so equality never has to
//! special-case the boundary.

use crate::error::{LayoutEmbeddingError, Result};
use crate::mesh::halfedge::{dist, EdgeId, HalfEdgeMesh, VertexId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VirtualVertex {
    OnVertex(VertexId),
    /// A point on edge `e` at parameter `λ ∈ (0,1)`, measured from
    /// `origin(edge_halfedges(e)[0])`.
    OnEdge(EdgeId, f64),
}

impl VirtualVertex {
    /// Builds a `VirtualVertex` on an edge, normalizing `λ` at the
    /// boundary to the incident vertex variant.
    pub fn on_edge(mesh: &HalfEdgeMesh, e: EdgeId, lambda: f64) -> Self {
        if lambda <= 0.0 {
            let [he, _] = mesh.edge_halfedges(e);
            VirtualVertex::OnVertex(mesh.origin(he))
        } else if lambda >= 1.0 {
            let [_, twin] = mesh.edge_halfedges(e);
            VirtualVertex::OnVertex(mesh.origin(twin))
        } else {
            VirtualVertex::OnEdge(e, lambda)
        }
    }

    pub fn on_vertex(v: VertexId) -> Self {
        VirtualVertex::OnVertex(v)
    }

    pub fn as_vertex(&self) -> Option<VertexId> {
        match self {
            VirtualVertex::OnVertex(v) => Some(*v),
            VirtualVertex::OnEdge(..) => None,
        }
    }

    /// Linear interpolation of the 3D position.
    pub fn pos3(&self, mesh: &HalfEdgeMesh) -> [f64; 3] {
        match *self {
            VirtualVertex::OnVertex(v) => mesh.pos(v),
            VirtualVertex::OnEdge(e, lambda) => {
                let [he, _] = mesh.edge_halfedges(e);
                let a = mesh.pos(mesh.origin(he));
                let b = mesh.pos(mesh.dest(he));
                [
                    a[0] + (b[0] - a[0]) * lambda,
                    a[1] + (b[1] - a[1]) * lambda,
                    a[2] + (b[2] - a[2]) * lambda,
                ]
            }
        }
    }
}

/// Ordered sequence of [`VirtualVertex`] realizing one layout edge.
///
/// Invariants (checked by [`VirtualPath::validate`]): endpoints are target
/// vertices, each consecutive pair is connected by a half-edge traversal
/// (vertex-to-vertex adjacent; vertex-to-edge requires the edge to be
/// incident to the vertex; edge-to-edge requires a shared face), and the
/// path is simple (no repeated vertex or edge).
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualPath {
    pub vertices: Vec<VirtualVertex>,
}

impl VirtualPath {
    pub fn new(vertices: Vec<VirtualVertex>) -> Self {
        VirtualPath { vertices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 2
    }

    pub fn length(&self, mesh: &HalfEdgeMesh) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| dist(w[0].pos3(mesh), w[1].pos3(mesh)))
            .sum()
    }

    pub fn reversed(&self) -> VirtualPath {
        let mut vs = self.vertices.clone();
        vs.reverse();
        VirtualPath { vertices: vs }
    }

    /// A path made only of target vertices (the common case: the oracle
    /// only ever returns such paths; edge-interior points are introduced by
    /// the smoothing post-process).
    pub fn from_vertices(vs: Vec<VertexId>) -> Self {
        VirtualPath {
            vertices: vs.into_iter().map(VirtualVertex::OnVertex).collect(),
        }
    }

    pub fn as_vertex_chain(&self) -> Option<Vec<VertexId>> {
        self.vertices.iter().map(|vv| vv.as_vertex()).collect()
    }

    /// Checks the invariants documented on this type against `mesh`:
    /// endpoints are target vertices, each consecutive pair is connected by
    /// a half-edge traversal, and the path is simple (no repeated vertex or
    /// edge). Returns the first invariant violation found, if any.
    pub fn validate(&self, mesh: &HalfEdgeMesh) -> Result<()> {
        if self.vertices.len() < 2 {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path must have at least two virtual vertices".into(),
            ));
        }
        if self.vertices[0].as_vertex().is_none() || self.vertices.last().unwrap().as_vertex().is_none() {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path endpoints must be target vertices".into(),
            ));
        }

        for w in self.vertices.windows(2) {
            match (w[0], w[1]) {
                (VirtualVertex::OnVertex(a), VirtualVertex::OnVertex(b)) => {
                    if mesh.edge_between(a, b).is_none() {
                        return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                            "{a:?} and {b:?} are not adjacent in the target mesh"
                        )));
                    }
                }
                (VirtualVertex::OnVertex(a), VirtualVertex::OnEdge(e, _))
                | (VirtualVertex::OnEdge(e, _), VirtualVertex::OnVertex(a)) => {
                    if !edge_incident_to_vertex(mesh, e, a) {
                        return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                            "edge {e:?} is not incident to {a:?}"
                        )));
                    }
                }
                (VirtualVertex::OnEdge(e1, _), VirtualVertex::OnEdge(e2, _)) => {
                    if e1 == e2 {
                        return Err(LayoutEmbeddingError::ConstraintViolation(
                            "path revisits the same edge consecutively".into(),
                        ));
                    }
                    if !edges_share_face(mesh, e1, e2) {
                        return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                            "edges {e1:?} and {e2:?} share no target face"
                        )));
                    }
                }
            }
        }

        let mut seen_vertices: hashbrown::HashSet<VertexId> = hashbrown::HashSet::new();
        let mut seen_edges: hashbrown::HashSet<EdgeId> = hashbrown::HashSet::new();
        for vv in &self.vertices {
            match vv {
                VirtualVertex::OnVertex(v) => {
                    if !seen_vertices.insert(*v) {
                        return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                            "path repeats vertex {v:?}"
                        )));
                    }
                }
                VirtualVertex::OnEdge(e, _) => {
                    if !seen_edges.insert(*e) {
                        return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                            "path repeats edge {e:?}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn edge_incident_to_vertex(mesh: &HalfEdgeMesh, e: EdgeId, v: VertexId) -> bool {
    let [he, twin] = mesh.edge_halfedges(e);
    mesh.origin(he) == v || mesh.dest(he) == v || mesh.origin(twin) == v || mesh.dest(twin) == v
}

fn edges_share_face(mesh: &HalfEdgeMesh, e1: EdgeId, e2: EdgeId) -> bool {
    let [he1, twin1] = mesh.edge_halfedges(e1);
    let [he2, twin2] = mesh.edge_halfedges(e2);
    let faces1 = [mesh.face(he1), mesh.face(twin1)];
    let faces2 = [mesh.face(he2), mesh.face(twin2)];
    faces1.iter().any(|f| faces2.contains(f))
}
