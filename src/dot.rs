//! Graphviz visualization of a completed (or in-progress) embedding.
//!
//! Builds the target mesh's vertex graph as a `petgraph::Graph` and renders
//! it with `petgraph::dot::Dot`: landmark vertices are filled, edges that
//! lie on some embedded layout path are solid, everything else is dashed.

use petgraph::dot::{Config, Dot};
use petgraph::graph::UnGraph;

use crate::embedding::EmbeddingState;
use crate::mesh::halfedge::VertexId;

pub fn to_dot_str(state: &EmbeddingState) -> String {
    let t = state.target();
    let mut graph = UnGraph::<usize, bool>::with_capacity(t.num_vertices(), t.num_edges());
    let nodes: Vec<_> = (0..t.num_vertices()).map(|v| graph.add_node(v)).collect();

    let mut on_path = hashbrown::HashSet::new();
    for h_l in crate::greedy::canonical_directions(state.layout()) {
        if let Some(path) = state.get_embedded_path(h_l) {
            for w in path.vertices.windows(2) {
                if let Some(e) = t.edge_between(w[0], w[1]) {
                    on_path.insert(e);
                }
            }
        }
    }

    for e in 0..t.num_edges() {
        let e = crate::mesh::halfedge::EdgeId(e);
        let [he, _] = t.edge_halfedges(e);
        let a = t.origin(he);
        let b = t.dest(he);
        graph.add_edge(nodes[a.index()], nodes[b.index()], on_path.contains(&e));
    }

    Dot::with_attr_getters(
        &graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, edge_ref| {
            if *edge_ref.weight() {
                "style=solid, penwidth=2".to_string()
            } else {
                "style=dashed, color=gray".to_string()
            }
        },
        &|_, node_ref| {
            let v = VertexId(*node_ref.1);
            if state.is_landmark_vertex(v) {
                format!("label=\"{}\", style=filled, fillcolor=lightblue", v.index())
            } else {
                format!("label=\"{}\"", v.index())
            }
        },
    )
    .to_string()
}

pub fn to_dot_file(state: &EmbeddingState, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
    std::fs::write(path, to_dot_str(state))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::EmbeddingInput;
    use crate::mesh::halfedge::HalfEdgeMesh;
    use crate::mesh::virtual_vertex::VirtualPath;

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
    fn renders_landmarks_and_path_edges() {
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let input = EmbeddingInput::new(tetra(), tetra(), landmarks).unwrap();
        let mut state = EmbeddingState::new(input);
        let h = state
            .layout()
            .edge_between(VertexId(0), VertexId(1))
            .map(|e| state.layout().edge_halfedges(e)[0])
            .unwrap();
        state
            .embed_path(h, &VirtualPath::from_vertices(vec![VertexId(0), VertexId(1)]))
            .unwrap();

        let dot = to_dot_str(&state);
        assert!(dot.contains("digraph") || dot.contains("graph"));
        assert!(dot.contains("fillcolor=lightblue"));
        assert!(dot.contains("penwidth=2"));
    }
}
