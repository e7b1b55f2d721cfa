//! Half-edge surface mesh (C1).
//!
//! Connectivity is stored as flat `Vec`-indexed tables addressed by
//! strongly-typed index wrappers, the same shape the rest of this crate's
//! graph-combinatorics modules use for adjacency (`Vec<usize>` arrays keyed
//! by a newtype id rather than pointer-chasing structs).
//!
//! Both the layout mesh `L` (arbitrary polygon faces) and the target mesh
//! `T` (triangles) are represented by this one type; `T` additionally
//! requires all faces to have exactly 3 vertices, checked by
//! [`HalfEdgeMesh::from_faces`]'s caller.
//!
//! We only support closed manifold surfaces (every edge borders exactly two
//! faces): both the cube/tetrahedron test scenarios and the `pig_union.obj`
//! driver target are closed, and supporting open boundary loops would add
//! machinery spec.md never exercises. An edge with a single incident face is
//! reported as [`LayoutEmbeddingError::InvalidInput`].

use hashbrown::HashMap;

use crate::error::{LayoutEmbeddingError, Result};

macro_rules! index_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

index_id!(VertexId);
index_id!(HalfEdgeId);
index_id!(EdgeId);
index_id!(FaceId);

#[derive(Clone, Debug)]
pub struct Vertex {
    pub pos: [f64; 3],
    pub half_edge: HalfEdgeId,
}

#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// Vertex this half-edge leaves from.
    pub origin: VertexId,
    pub twin: HalfEdgeId,
    pub next: HalfEdgeId,
    pub prev: HalfEdgeId,
    pub face: FaceId,
    pub edge: EdgeId,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub half_edges: [HalfEdgeId; 2],
}

#[derive(Clone, Debug)]
pub struct Face {
    pub half_edge: HalfEdgeId,
    pub degree: usize,
}

/// A manifold, oriented half-edge surface.
#[derive(Clone, Debug, Default)]
pub struct HalfEdgeMesh {
    pub vertices: Vec<Vertex>,
    pub half_edges: Vec<HalfEdge>,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
}

impl HalfEdgeMesh {
    /// Builds a mesh from vertex positions and a list of polygonal faces
    /// (CCW vertex index loops). Fails with [`LayoutEmbeddingError::InvalidInput`]
    /// if any oriented edge is duplicated (inconsistent orientation / repeated
    /// face) or any edge has fewer than two incident faces (open boundary).
    pub fn from_faces(positions: Vec<[f64; 3]>, faces: Vec<Vec<usize>>) -> Result<Self> {
        let mut vertices: Vec<Vertex> = positions
            .iter()
            .map(|&pos| Vertex {
                pos,
                half_edge: HalfEdgeId(usize::MAX),
            })
            .collect();

        let mut half_edges: Vec<HalfEdge> = Vec::new();
        let mut faces_out: Vec<Face> = Vec::new();
        let mut directed: HashMap<(usize, usize), HalfEdgeId> = HashMap::new();

        for face_verts in &faces {
            let k = face_verts.len();
            if k < 3 {
                return Err(LayoutEmbeddingError::InvalidInput(format!(
                    "face with fewer than 3 vertices: {face_verts:?}"
                )));
            }
            let face_id = FaceId(faces_out.len());
            let start = half_edges.len();
            for (i, &v) in face_verts.iter().enumerate() {
                let u = face_verts[i];
                let w = face_verts[(i + 1) % k];
                if u >= vertices.len() || w >= vertices.len() {
                    return Err(LayoutEmbeddingError::InvalidInput(format!(
                        "face references out-of-range vertex {u} or {w}"
                    )));
                }
                let he_id = HalfEdgeId(half_edges.len());
                if directed.insert((u, w), he_id).is_some() {
                    return Err(LayoutEmbeddingError::InvalidInput(format!(
                        "duplicate oriented edge ({u},{w}): mesh is non-manifold or inconsistently oriented"
                    )));
                }
                half_edges.push(HalfEdge {
                    origin: VertexId(v),
                    twin: HalfEdgeId(usize::MAX),
                    next: HalfEdgeId(usize::MAX),
                    prev: HalfEdgeId(usize::MAX),
                    face: face_id,
                    edge: EdgeId(usize::MAX),
                });
                vertices[v].half_edge = he_id;
            }
            for i in 0..k {
                let cur = HalfEdgeId(start + i);
                let nxt = HalfEdgeId(start + (i + 1) % k);
                half_edges[cur.0].next = nxt;
                half_edges[nxt.0].prev = cur;
            }
            faces_out.push(Face {
                half_edge: HalfEdgeId(start),
                degree: k,
            });
        }

        let mut edges: Vec<Edge> = Vec::new();
        let mut seen: hashbrown::HashSet<(usize, usize)> = hashbrown::HashSet::new();
        for (&(u, w), &he_id) in directed.iter() {
            if seen.contains(&(u, w)) {
                continue;
            }
            let twin_id = match directed.get(&(w, u)) {
                Some(&id) => id,
                None => {
                    return Err(LayoutEmbeddingError::InvalidInput(format!(
                        "edge ({u},{w}) has only one incident face: target/layout mesh must be closed and manifold"
                    )));
                }
            };
            let edge_id = EdgeId(edges.len());
            half_edges[he_id.0].twin = twin_id;
            half_edges[twin_id.0].twin = he_id;
            half_edges[he_id.0].edge = edge_id;
            half_edges[twin_id.0].edge = edge_id;
            edges.push(Edge {
                half_edges: [he_id, twin_id],
            });
            seen.insert((u, w));
            seen.insert((w, u));
        }

        Ok(HalfEdgeMesh {
            vertices,
            half_edges,
            edges,
            faces: faces_out,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn pos(&self, v: VertexId) -> [f64; 3] {
        self.vertices[v.0].pos
    }

    pub fn origin(&self, he: HalfEdgeId) -> VertexId {
        self.half_edges[he.0].origin
    }

    pub fn dest(&self, he: HalfEdgeId) -> VertexId {
        self.origin(self.twin(he))
    }

    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.half_edges[he.0].twin
    }

    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.half_edges[he.0].next
    }

    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.half_edges[he.0].prev
    }

    pub fn face(&self, he: HalfEdgeId) -> FaceId {
        self.half_edges[he.0].face
    }

    pub fn edge_of(&self, he: HalfEdgeId) -> EdgeId {
        self.half_edges[he.0].edge
    }

    pub fn edge_halfedges(&self, e: EdgeId) -> [HalfEdgeId; 2] {
        self.edges[e.0].half_edges
    }

    pub fn other_vertex(&self, e: EdgeId, v: VertexId) -> VertexId {
        let [a, b] = self.edge_halfedges(e);
        if self.origin(a) == v {
            self.origin(b)
        } else {
            self.origin(a)
        }
    }

    pub fn edge_between(&self, u: VertexId, v: VertexId) -> Option<EdgeId> {
        self.outgoing(u)
            .find(|&he| self.dest(he) == v)
            .map(|he| self.edge_of(he))
    }

    pub fn face_degree(&self, f: FaceId) -> usize {
        self.faces[f.0].degree
    }

    /// The next outgoing half-edge when rotating around `origin(he)`,
    /// obtained from the axiom `origin(twin(prev(he))) == origin(he)`:
    /// `prev(he)` is the half-edge arriving at `origin(he)` within the same
    /// face, and its twin leaves `origin(he)` into the neighboring face.
    pub fn rotate_outgoing(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.twin(self.prev(he))
    }

    /// All half-edges leaving `v`, in one consistent rotational order.
    pub fn outgoing(&self, v: VertexId) -> OutgoingIter<'_> {
        let start = self.vertices[v.0].half_edge;
        OutgoingIter {
            mesh: self,
            start,
            current: Some(start),
        }
    }

    pub fn face_halfedges(&self, f: FaceId) -> FaceCycleIter<'_> {
        let start = self.faces[f.0].half_edge;
        FaceCycleIter {
            mesh: self,
            start,
            current: Some(start),
        }
    }

    pub fn face_vertices(&self, f: FaceId) -> Vec<VertexId> {
        self.face_halfedges(f).map(|he| self.origin(he)).collect()
    }

    pub fn euclidean_length(&self, e: EdgeId) -> f64 {
        let [he, _] = self.edge_halfedges(e);
        let a = self.pos(self.origin(he));
        let b = self.pos(self.dest(he));
        dist(a, b)
    }
}

pub fn dist(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

pub struct OutgoingIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
}

impl Iterator for OutgoingIter<'_> {
    type Item = HalfEdgeId;
    fn next(&mut self) -> Option<HalfEdgeId> {
        let he = self.current?;
        let nxt = self.mesh.rotate_outgoing(he);
        self.current = if nxt == self.start { None } else { Some(nxt) };
        Some(he)
    }
}

pub struct FaceCycleIter<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
}

impl Iterator for FaceCycleIter<'_> {
    type Item = HalfEdgeId;
    fn next(&mut self) -> Option<HalfEdgeId> {
        let he = self.current?;
        let nxt = self.mesh.next(he);
        self.current = if nxt == self.start { None } else { Some(nxt) };
        Some(he)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> HalfEdgeMesh {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = vec![
            vec![0, 2, 1],
            vec![0, 1, 3],
            vec![1, 2, 3],
            vec![2, 0, 3],
        ];
        HalfEdgeMesh::from_faces(positions, faces).unwrap()
    }

    #[test]
    fn tetrahedron_euler_characteristic() {
        let m = tetrahedron();
        assert_eq!(m.num_vertices(), 4);
        assert_eq!(m.num_edges(), 6);
        assert_eq!(m.num_faces(), 4);
        assert_eq!(m.num_vertices() as i64 - m.num_edges() as i64 + m.num_faces() as i64, 2);
    }

    #[test]
    fn twin_is_involution() {
        let m = tetrahedron();
        for he in 0..m.half_edges.len() {
            let he = HalfEdgeId(he);
            assert_eq!(m.twin(m.twin(he)), he);
            assert_ne!(m.twin(he), he);
        }
    }

    #[test]
    fn outgoing_rotation_returns_to_start_and_shares_origin() {
        let m = tetrahedron();
        for v in 0..m.num_vertices() {
            let v = VertexId(v);
            let outs: Vec<_> = m.outgoing(v).collect();
            assert_eq!(outs.len(), 3, "tetrahedron vertices have degree 3");
            for &he in &outs {
                assert_eq!(m.origin(he), v);
            }
        }
    }

    #[test]
    fn face_cycle_has_correct_degree() {
        let m = tetrahedron();
        for f in 0..m.num_faces() {
            let f = FaceId(f);
            let hes: Vec<_> = m.face_halfedges(f).collect();
            assert_eq!(hes.len(), 3);
            assert_eq!(hes.len(), m.face_degree(f));
        }
    }

    #[test]
    fn open_boundary_is_rejected() {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let faces = vec![vec![0, 1, 2]];
        let err = HalfEdgeMesh::from_faces(positions, faces).unwrap_err();
        assert!(matches!(err, LayoutEmbeddingError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_oriented_edge_is_rejected() {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.2, 0.2, 1.0]];
        let faces = vec![vec![0, 1, 2], vec![0, 1, 3]];
        let err = HalfEdgeMesh::from_faces(positions, faces).unwrap_err();
        assert!(matches!(err, LayoutEmbeddingError::InvalidInput(_)));
    }
}
