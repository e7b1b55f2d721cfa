//! Path post-smoothing and target-mesh subdivision (C7, "external
//! collaborators"). Both operations consume a completed [`EmbeddingState`]
//! and return a new one — they never mutate the core search, matching
//! spec §1's framing of smoothing/subdivision as declared-but-external
//! collaborators the core only exposes an interface to.

use hashbrown::HashMap;

use crate::embedding::EmbeddingState;
use crate::error::{LayoutEmbeddingError, Result};
use crate::input::EmbeddingInput;
use crate::mesh::halfedge::{EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
use crate::mesh::virtual_vertex::{VirtualPath, VirtualVertex};

/// One level of Loop subdivision of the target mesh, with every embedded
/// path remapped onto the new mesh (each old edge the path crossed now
/// passes through that edge's new midpoint vertex) and re-embedded in
/// canonical edge order.
pub fn subdivide(state: &EmbeddingState) -> Result<EmbeddingState> {
    if !state.is_complete() {
        return Err(LayoutEmbeddingError::ConstraintViolation(
            "subdivide requires a complete embedding to remap paths".into(),
        ));
    }
    let t = state.target();
    let n = t.num_vertices();

    let mut new_positions = vec![[0.0; 3]; n + t.num_edges()];
    for v in 0..n {
        new_positions[v] = loop_even_vertex_position(t, VertexId(v));
    }
    let mut midpoint_of_edge = vec![VertexId(0); t.num_edges()];
    for e in 0..t.num_edges() {
        let mid = VertexId(n + e);
        midpoint_of_edge[e] = mid;
        new_positions[mid.index()] = loop_odd_vertex_position(t, EdgeId(e));
    }

    let mut new_faces = Vec::with_capacity(t.num_faces() * 4);
    for f in 0..t.num_faces() {
        let hes: Vec<HalfEdgeId> = t.face_halfedges(FaceId(f)).collect();
        debug_assert_eq!(hes.len(), 3, "target mesh must be triangulated");
        let v = [t.origin(hes[0]), t.origin(hes[1]), t.origin(hes[2])];
        let m = [
            midpoint_of_edge[t.edge_of(hes[0]).index()],
            midpoint_of_edge[t.edge_of(hes[1]).index()],
            midpoint_of_edge[t.edge_of(hes[2]).index()],
        ];
        // v0 m0 v1 m1 v2 m2, split into corner triangles + the center one.
        new_faces.push(vec![v[0].index(), m[0].index(), m[2].index()]);
        new_faces.push(vec![m[0].index(), v[1].index(), m[1].index()]);
        new_faces.push(vec![m[2].index(), m[1].index(), v[2].index()]);
        new_faces.push(vec![m[0].index(), m[1].index(), m[2].index()]);
    }

    let new_target = HalfEdgeMesh::from_faces(new_positions, new_faces)?;
    let new_input = EmbeddingInput::new(state.layout().clone(), new_target, state.input.landmarks.clone())?;
    let mut new_state = EmbeddingState::new(new_input);

    for h_l in crate::greedy::canonical_directions(new_state.layout()) {
        let old_path = state.get_embedded_path(h_l).expect("complete embedding");
        let mut remapped = Vec::with_capacity(old_path.vertices.len() * 2);
        remapped.push(old_path.vertices[0]);
        for w in old_path.vertices.windows(2) {
            let e = state.target().edge_between(w[0], w[1]).expect("path step is a target edge");
            remapped.push(midpoint_of_edge[e.index()]);
            remapped.push(w[1]);
        }
        new_state.embed_path(h_l, &VirtualPath::from_vertices(remapped))?;
    }

    Ok(new_state)
}

fn loop_beta(valence: usize) -> f64 {
    let n = valence as f64;
    if valence == 3 {
        3.0 / 16.0
    } else {
        let inner = 3.0 / 8.0 + (2.0 * std::f64::consts::PI / n).cos() / 4.0;
        (5.0 / 8.0 - inner * inner) / n
    }
}

fn loop_even_vertex_position(t: &HalfEdgeMesh, v: VertexId) -> [f64; 3] {
    let neighbors: Vec<VertexId> = t.outgoing(v).map(|he| t.dest(he)).collect();
    let n = neighbors.len();
    let beta = loop_beta(n);
    let old = t.pos(v);
    let mut sum = [0.0; 3];
    for &u in &neighbors {
        let p = t.pos(u);
        sum[0] += p[0];
        sum[1] += p[1];
        sum[2] += p[2];
    }
    [
        (1.0 - n as f64 * beta) * old[0] + beta * sum[0],
        (1.0 - n as f64 * beta) * old[1] + beta * sum[1],
        (1.0 - n as f64 * beta) * old[2] + beta * sum[2],
    ]
}

/// Closed manifold mesh: every edge has exactly two incident faces, so the
/// interior Loop mask `3/8*(p0+p1) + 1/8*(pa+pb)` always applies.
fn loop_odd_vertex_position(t: &HalfEdgeMesh, e: EdgeId) -> [f64; 3] {
    let [he, twin] = t.edge_halfedges(e);
    let p0 = t.pos(t.origin(he));
    let p1 = t.pos(t.dest(he));
    let pa = t.pos(t.origin(t.prev(he)));
    let pb = t.pos(t.origin(t.prev(twin)));
    let mut out = [0.0; 3];
    for i in 0..3 {
        out[i] = 0.375 * (p0[i] + p1[i]) + 0.125 * (pa[i] + pb[i]);
    }
    out
}

/// Replaces sharp corners with an edge-interior shortcut point, for every
/// embedded path in `state` (or, with the slice overload, for a
/// caller-supplied subset of layout half-edges). Only smooths a corner
/// `A -> B -> C` when `A`, `B`, `C` bound a single target face (the common
/// case on a reasonably fine target mesh); other corners are left as-is —
/// a true multi-triangle geodesic unfolding is out of scope for this
/// post-process. `quad_flap_to_rectangle` selects the chord-projection
/// placement (closer to where an unfolded-flap straight line would cross)
/// over a plain edge midpoint.
pub fn smooth_paths(state: &EmbeddingState, quad_flap_to_rectangle: bool) -> Result<HashMap<HalfEdgeId, VirtualPath>> {
    let all: Vec<HalfEdgeId> = crate::greedy::canonical_directions(state.layout());
    smooth_paths_subset(state, &all, quad_flap_to_rectangle)
}

pub fn smooth_paths_subset(
    state: &EmbeddingState,
    edges: &[HalfEdgeId],
    quad_flap_to_rectangle: bool,
) -> Result<HashMap<HalfEdgeId, VirtualPath>> {
    if !state.is_complete() {
        return Err(LayoutEmbeddingError::ConstraintViolation(
            "smooth_paths requires a complete embedding".into(),
        ));
    }
    let t = state.target();
    let mut out = HashMap::new();
    for &h_l in edges {
        let path = state.get_embedded_path(h_l).expect("complete embedding");
        let vs = &path.vertices;
        let mut smoothed: Vec<VirtualVertex> = vec![VirtualVertex::OnVertex(vs[0])];
        let mut i = 1;
        while i < vs.len() - 1 {
            let a = vs[i - 1];
            let b = vs[i];
            let c = vs[i + 1];
            if let Some(e_ac) = shared_face_opposite_edge(t, a, b, c) {
                let lambda = if quad_flap_to_rectangle {
                    chord_projection_lambda(t, e_ac, b)
                } else {
                    0.5
                };
                smoothed.push(VirtualVertex::on_edge(t, e_ac, lambda));
            } else {
                smoothed.push(VirtualVertex::OnVertex(b));
            }
            i += 1;
        }
        smoothed.push(VirtualVertex::OnVertex(*vs.last().unwrap()));
        let smoothed_path = VirtualPath::new(smoothed);
        smoothed_path.validate(t)?;
        out.insert(h_l, smoothed_path);
    }
    Ok(out)
}

/// If `a`, `b`, `c` are the three vertices of one target face, the edge
/// opposite `b` (i.e. between `a` and `c`); `None` otherwise.
fn shared_face_opposite_edge(t: &HalfEdgeMesh, a: VertexId, b: VertexId, c: VertexId) -> Option<EdgeId> {
    let e_ac = t.edge_between(a, c)?;
    let [he, twin] = t.edge_halfedges(e_ac);
    for he in [he, twin] {
        let f = t.face(he);
        if t.face_vertices(f).contains(&b) {
            return Some(e_ac);
        }
    }
    None
}

/// Parameter along edge `e` (measured from its first half-edge's origin)
/// of `b`'s projection onto the edge, clamped to `[0, 1]`.
fn chord_projection_lambda(t: &HalfEdgeMesh, e: EdgeId, b: VertexId) -> f64 {
    let [he, _] = t.edge_halfedges(e);
    let p0 = t.pos(t.origin(he));
    let p1 = t.pos(t.dest(he));
    let pb = t.pos(b);
    let d = sub(p1, p0);
    let len2 = dot(d, d);
    if len2 < 1e-12 {
        return 0.5;
    }
    (dot(sub(pb, p0), d) / len2).clamp(0.0, 1.0)
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::halfedge::HalfEdgeMesh;

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

    fn identity_complete_state() -> EmbeddingState {
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let input = EmbeddingInput::new(tetra(), tetra(), landmarks).unwrap();
        let mut state = EmbeddingState::new(input);
        let mut seen = hashbrown::HashSet::new();
        for v in 0..state.layout().num_vertices() {
            for he in state.layout().outgoing(VertexId(v)) {
                let e = state.layout().edge_of(he);
                if seen.insert(e) {
                    let path = VirtualPath::from_vertices(vec![state.layout().origin(he), state.layout().dest(he)]);
                    state.embed_path(he, &path).unwrap();
                }
            }
        }
        state
    }

    #[test]
    fn subdivide_preserves_completeness_and_vertex_count() {
        let state = identity_complete_state();
        let subdivided = subdivide(&state).unwrap();
        assert!(subdivided.is_complete());
        assert_eq!(
            subdivided.target().num_vertices(),
            state.target().num_vertices() + state.target().num_edges()
        );
    }

    #[test]
    fn smooth_paths_returns_one_entry_per_layout_edge() {
        let state = identity_complete_state();
        let smoothed = smooth_paths(&state, true).unwrap();
        assert_eq!(smoothed.len(), state.layout().num_edges());
        for path in smoothed.values() {
            assert!(!path.is_empty());
        }
    }
}
