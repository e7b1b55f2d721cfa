//! The order layout edges were embedded in, replayable against a fresh
//! state. Greedy and branch-and-bound both produce one of these; storing the
//! order (not the realized paths) keeps replay honest — it must re-derive
//! the same paths via the oracle, not merely copy them back in.

use crate::embedding::EmbeddingState;
use crate::error::{LayoutEmbeddingError, Result};
use crate::mesh::halfedge::HalfEdgeId;
use crate::oracle::{self, Metric};

#[derive(Clone, Debug)]
pub struct InsertionSequence {
    pub steps: Vec<HalfEdgeId>,
    pub metric: Metric,
}

impl InsertionSequence {
    pub fn new(metric: Metric) -> Self {
        InsertionSequence {
            steps: Vec::new(),
            metric,
        }
    }

    pub fn push(&mut self, h_l: HalfEdgeId) {
        self.steps.push(h_l);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Re-embeds every step of `sequence`, in order, into `state` by re-querying
/// the oracle — not by replaying cached paths. Fails with
/// [`LayoutEmbeddingError::Infeasible`] at the first step with no feasible
/// path (the sector/block state the sequence was recorded against may no
/// longer hold if `state` isn't genuinely fresh).
pub fn apply(sequence: &InsertionSequence, state: &mut EmbeddingState) -> Result<()> {
    for &h_l in &sequence.steps {
        let path = oracle::shortest_path_for_layout_halfedge(state, h_l, sequence.metric)
            .ok_or(LayoutEmbeddingError::Infeasible(h_l))?;
        state.embed_path(h_l, &path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::EmbeddingInput;
    use crate::mesh::halfedge::{HalfEdgeMesh, VertexId};

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
    fn replay_reaches_the_same_completeness() {
        let layout = tetra();
        let target = tetra();
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let input = EmbeddingInput::new(layout, target, landmarks).unwrap();
        let mut state = EmbeddingState::new(input.clone());

        let mut seq = InsertionSequence::new(Metric::Geodesic);
        let mut seen_edges = hashbrown::HashSet::new();
        for v in 0..state.layout().num_vertices() {
            for he in state.layout().outgoing(VertexId(v)) {
                let e = state.layout().edge_of(he);
                if seen_edges.insert(e) {
                    let path = oracle::shortest_path_for_layout_halfedge(&state, he, Metric::Geodesic).unwrap();
                    state.embed_path(he, &path).unwrap();
                    seq.push(he);
                }
            }
        }
        assert!(state.is_complete());

        let mut replayed = EmbeddingState::new(input);
        apply(&seq, &mut replayed).unwrap();
        assert!(replayed.is_complete());
        assert!((replayed.total_embedded_path_length() - state.total_embedded_path_length()).abs() < 1e-9);
    }
}
