//! Adapted from scenario 2 ("coarse-in-fine" embedding where each layout
//! edge traces a short multi-edge path along a finer target mesh). The
//! spec's literal fixture is a cube embedded in a twice-subdivided cube; we
//! build the equivalent relationship from a tetrahedron and one level of
//! this crate's own Loop subdivision (`smoothing::subdivide`), so the test
//! needs no external mesh fixtures. Expected: greedy and branch-and-bound
//! agree on cost to within a small tolerance, and every layout edge embeds
//! as a two-target-edge path through the new edge midpoint.

use layout_embedding::bnb::{self, BranchAndBoundSettings};
use layout_embedding::greedy;
use layout_embedding::input::EmbeddingInput;
use layout_embedding::mesh::halfedge::{EdgeId, HalfEdgeMesh, VertexId};
use layout_embedding::mesh::virtual_vertex::VirtualPath;
use layout_embedding::smoothing;
use layout_embedding::EmbeddingState;

fn tetrahedron() -> HalfEdgeMesh {
    let positions = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
    HalfEdgeMesh::from_faces(positions, faces).unwrap()
}

fn finer_target() -> EmbeddingInput {
    let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
    let input = EmbeddingInput::new(tetrahedron(), tetrahedron(), landmarks).unwrap();
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
    let subdivided = smoothing::subdivide(&state).unwrap();
    subdivided.input.clone()
}

#[test]
fn layout_edges_trace_two_edge_paths_on_the_subdivided_target() {
    let input = finer_target();

    let greedy_results = greedy::embed_competitors(&input);
    let greedy_winner = greedy::best(&greedy_results).expect("at least one greedy variant completes");

    let bnb_result = bnb::search(input.clone(), BranchAndBoundSettings::default()).unwrap();

    assert!(
        (greedy_winner.cost() - bnb_result.cost).abs() < 1e-4,
        "greedy ({}) and branch-and-bound ({}) should agree to within a small tolerance",
        greedy_winner.cost(),
        bnb_result.cost
    );

    let mut state = EmbeddingState::new(input);
    layout_embedding::insertion_sequence::apply(&bnb_result.sequence, &mut state).unwrap();
    assert!(state.is_complete());
    for e in 0..state.layout().num_edges() {
        let [he, _] = state.layout().edge_halfedges(EdgeId(e));
        let path = state.get_embedded_path(he).unwrap();
        assert_eq!(path.vertices.len(), 3, "each layout edge should cross exactly one new midpoint vertex");
    }
}
