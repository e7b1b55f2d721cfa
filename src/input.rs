//! `EmbeddingInput`: the raw layout/target meshes plus the landmark
//! correspondence `μ: V(L) → V(T)`, before an [`crate::embedding::EmbeddingState`]
//! is built from them.

use hashbrown::HashSet;

use crate::error::{LayoutEmbeddingError, Result};
use crate::mesh::halfedge::{FaceId, HalfEdgeMesh, VertexId};

#[derive(Clone, Debug)]
pub struct EmbeddingInput {
    pub layout: HalfEdgeMesh,
    pub target: HalfEdgeMesh,
    /// `landmarks[l_v.index()]` is the target vertex matching layout vertex `l_v`.
    pub landmarks: Vec<VertexId>,
}

impl EmbeddingInput {
    /// Validates that `landmarks` is a well-formed injective partial map
    /// covering every layout vertex (spec.md requires all layout vertices to
    /// have a landmark) before accepting the input.
    pub fn new(layout: HalfEdgeMesh, target: HalfEdgeMesh, landmarks: Vec<VertexId>) -> Result<Self> {
        if landmarks.len() != layout.num_vertices() {
            return Err(LayoutEmbeddingError::InvalidInput(format!(
                "expected a landmark for each of {} layout vertices, got {}",
                layout.num_vertices(),
                landmarks.len()
            )));
        }
        let mut seen = HashSet::new();
        for (i, &v_t) in landmarks.iter().enumerate() {
            if v_t.index() >= target.num_vertices() {
                return Err(LayoutEmbeddingError::InvalidInput(format!(
                    "landmark for layout vertex {i} references out-of-range target vertex {v_t:?}"
                )));
            }
            if !seen.insert(v_t) {
                return Err(LayoutEmbeddingError::InvalidInput(format!(
                    "target vertex {v_t:?} is the landmark of more than one layout vertex"
                )));
            }
        }
        for h_l in 0..layout.num_vertices() {
            let v_l = VertexId(h_l);
            for he in layout.outgoing(v_l) {
                let u = landmarks[layout.origin(he).index()];
                let w = landmarks[layout.dest(he).index()];
                if u == w {
                    return Err(LayoutEmbeddingError::InvalidInput(
                        "a layout edge has coincident landmark endpoints (zero-length path)"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(EmbeddingInput {
            layout,
            target,
            landmarks,
        })
    }

    pub fn landmark_of(&self, l_v: VertexId) -> VertexId {
        self.landmarks[l_v.index()]
    }

    /// Scales target vertex positions so the target mesh's surface area is 1.
    pub fn normalize_surface_area(&mut self) {
        let area = mesh_surface_area(&self.target);
        if area <= 0.0 {
            return;
        }
        let scale = 1.0 / area.sqrt();
        for v in &mut self.target.vertices {
            v.pos[0] *= scale;
            v.pos[1] *= scale;
            v.pos[2] *= scale;
        }
    }

    /// Translates the target mesh so its vertex centroid sits at the origin.
    pub fn center_translation(&mut self) {
        let n = self.target.num_vertices() as f64;
        if n == 0.0 {
            return;
        }
        let mut c = [0.0; 3];
        for v in &self.target.vertices {
            c[0] += v.pos[0];
            c[1] += v.pos[1];
            c[2] += v.pos[2];
        }
        c = [c[0] / n, c[1] / n, c[2] / n];
        for v in &mut self.target.vertices {
            v.pos[0] -= c[0];
            v.pos[1] -= c[1];
            v.pos[2] -= c[2];
        }
    }

    /// Flips the orientation of every layout face.
    ///
    /// This rebuilds half-edge/edge indices from scratch, so any cached
    /// `FaceId`/`EdgeId`/`HalfEdgeId` derived from the old layout mesh is
    /// invalidated. It also clears `landmarks`: the correspondence is keyed
    /// by layout *vertex* index, which survives the rebuild, but whether
    /// that correspondence should still hold is a modeling decision left to
    /// the caller (see DESIGN.md, open question (c)) — callers must re-bind
    /// landmarks after calling this.
    pub fn invert_layout(&mut self) -> Result<()> {
        let positions: Vec<[f64; 3]> = self.layout.vertices.iter().map(|v| v.pos).collect();
        let faces: Vec<Vec<usize>> = (0..self.layout.num_faces())
            .map(|f| {
                let mut vs: Vec<usize> = self
                    .layout
                    .face_vertices(FaceId(f))
                    .into_iter()
                    .map(|v| v.index())
                    .collect();
                vs.reverse();
                vs
            })
            .collect();
        self.layout = HalfEdgeMesh::from_faces(positions, faces)?;
        self.landmarks.clear();
        Ok(())
    }
}

/// Surface area of a (possibly non-triangular) closed mesh, via fan
/// triangulation of each face from its first vertex.
pub fn mesh_surface_area(mesh: &HalfEdgeMesh) -> f64 {
    let mut area = 0.0;
    for f in 0..mesh.num_faces() {
        let vs = mesh.face_vertices(FaceId(f));
        if vs.len() < 3 {
            continue;
        }
        let p0 = mesh.pos(vs[0]);
        for w in vs[1..].windows(2) {
            let p1 = mesh.pos(w[0]);
            let p2 = mesh.pos(w[1]);
            area += triangle_area(p0, p1, p2);
        }
    }
    area
}

pub fn triangle_area(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let u = sub(b, a);
    let v = sub(c, a);
    let cr = cross(u, v);
    0.5 * (cr[0] * cr[0] + cr[1] * cr[1] + cr[2] * cr[2]).sqrt()
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> HalfEdgeMesh {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
        HalfEdgeMesh::from_faces(positions, faces).unwrap()
    }

    #[test]
    fn rejects_duplicate_landmark() {
        let layout = tetra();
        let target = tetra();
        let landmarks = vec![VertexId(0), VertexId(0), VertexId(2), VertexId(3)];
        assert!(EmbeddingInput::new(layout, target, landmarks).is_err());
    }

    #[test]
    fn rejects_missing_landmark_count() {
        let layout = tetra();
        let target = tetra();
        let landmarks = vec![VertexId(0), VertexId(1)];
        assert!(EmbeddingInput::new(layout, target, landmarks).is_err());
    }

    #[test]
    fn normalize_surface_area_sets_area_to_one() {
        let layout = tetra();
        let target = tetra();
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let mut input = EmbeddingInput::new(layout, target, landmarks).unwrap();
        input.normalize_surface_area();
        assert!((mesh_surface_area(&input.target) - 1.0).abs() < 1e-9);
    }
}
