//! Scenario 4 from the spec's testable-properties section, adapted: rather
//! than enclosing one layout edge's sector with already-fixed paths (a
//! fragile construction to hand-build), we force infeasibility the
//! unambiguous way — landmarking layout vertices into two target
//! components that share no edge at all. Any layout edge crossing the two
//! components then has no feasible path by construction, not by a subtle
//! geometric coincidence. Expected: greedy leaves that edge unembedded
//! (`cost == +inf`), and branch-and-bound reports `Infeasible` at the root.

use layout_embedding::bnb::{self, BranchAndBoundSettings};
use layout_embedding::greedy;
use layout_embedding::input::EmbeddingInput;
use layout_embedding::mesh::halfedge::{HalfEdgeMesh, VertexId};
use layout_embedding::LayoutEmbeddingError;

fn tetrahedron_faces_at(offset: usize) -> Vec<Vec<usize>> {
    vec![
        vec![offset, offset + 2, offset + 1],
        vec![offset, offset + 1, offset + 3],
        vec![offset + 1, offset + 2, offset + 3],
        vec![offset + 2, offset, offset + 3],
    ]
}

fn two_disjoint_tetrahedra() -> HalfEdgeMesh {
    let mut positions = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    positions.extend(vec![
        [10.0, 0.0, 0.0],
        [11.0, 0.0, 0.0],
        [10.0, 1.0, 0.0],
        [10.0, 0.0, 1.0],
    ]);
    let mut faces = tetrahedron_faces_at(0);
    faces.extend(tetrahedron_faces_at(4));
    HalfEdgeMesh::from_faces(positions, faces).unwrap()
}

fn layout_tetrahedron() -> HalfEdgeMesh {
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
fn layout_edge_spanning_disconnected_target_components_is_infeasible() {
    // Layout vertices 0,1 land in the first tetrahedron, 2,3 in the
    // second; every pair of layout vertices is connected (K4), so several
    // layout edges necessarily cross between target components.
    let landmarks = vec![VertexId(0), VertexId(1), VertexId(4), VertexId(5)];
    let input = EmbeddingInput::new(layout_tetrahedron(), two_disjoint_tetrahedra(), landmarks).unwrap();

    let greedy_results = greedy::embed_competitors(&input);
    for r in &greedy_results {
        assert!(!r.is_complete(), "{} should not be able to complete a disconnected embedding", r.name);
        assert!(!r.failed_edges.is_empty());
        assert_eq!(r.cost(), f64::INFINITY);
    }

    let err = bnb::search(input, BranchAndBoundSettings::default()).unwrap_err();
    match err {
        LayoutEmbeddingError::Infeasible(_) => {}
        other => panic!("expected Infeasible at the root, got {other:?}"),
    }
}
