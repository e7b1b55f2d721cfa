//! Embedding serialization (`io::emb`): `<prefix>.emb` stores the insertion
//! sequence as `layout_edge_id target_edge_id...` lines. Reloading replays
//! the sequence through [`crate::insertion_sequence::apply`] on a fresh
//! state (not by restoring the listed target edges directly) and then
//! checks the replay reproduced the saved path exactly — this is the
//! property spec §6 requires ("must reproduce the saved
//! `total_embedded_path_length` exactly").

use std::path::Path;

use crate::embedding::EmbeddingState;
use crate::error::{LayoutEmbeddingError, Result};
use crate::input::EmbeddingInput;
use crate::insertion_sequence::{self, InsertionSequence};
use crate::mesh::halfedge::HalfEdgeId;
use crate::oracle::Metric;

const HEADER: &str = "EMB 1";

pub fn save(state: &EmbeddingState, sequence: &InsertionSequence, path: impl AsRef<Path>) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{HEADER}")?;
    writeln!(out, "{}", sequence.steps.len())?;
    for &h_l in &sequence.steps {
        let embedded = state
            .get_embedded_path(h_l)
            .ok_or_else(|| LayoutEmbeddingError::InvalidInput(format!("{h_l:?} in sequence but not embedded")))?;
        let target = state.target();
        write!(out, "{}", h_l.index())?;
        for w in embedded.vertices.windows(2) {
            let e = target
                .edge_between(w[0], w[1])
                .expect("embedded path steps are always target mesh edges");
            write!(out, " {}", e.index())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Loads `path` against `input` by replaying the recorded insertion order
/// through the oracle, then verifies the replayed target-edge sequence for
/// each layout edge matches what was saved.
pub fn load(path: impl AsRef<Path>, input: EmbeddingInput) -> Result<EmbeddingState> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| LayoutEmbeddingError::InvalidInput("empty .emb file".into()))?;
    if header.trim() != HEADER {
        return Err(LayoutEmbeddingError::InvalidInput(format!(
            "unrecognized .emb header {header:?}"
        )));
    }
    let count: usize = lines
        .next()
        .ok_or_else(|| LayoutEmbeddingError::InvalidInput("missing .emb edge count".into()))?
        .trim()
        .parse()
        .map_err(|_| LayoutEmbeddingError::InvalidInput("malformed .emb edge count".into()))?;

    let mut sequence = InsertionSequence::new(Metric::Geodesic);
    let mut recorded_target_edges: Vec<Vec<usize>> = Vec::with_capacity(count);
    for line in lines.by_ref().take(count) {
        let mut tokens = line.split_whitespace();
        let h_idx: usize = tokens
            .next()
            .ok_or_else(|| LayoutEmbeddingError::InvalidInput("malformed .emb line".into()))?
            .parse()
            .map_err(|_| LayoutEmbeddingError::InvalidInput("malformed layout edge id".into()))?;
        sequence.push(HalfEdgeId(h_idx));
        let edges: Result<Vec<usize>> = tokens
            .map(|t| t.parse::<usize>().map_err(|_| LayoutEmbeddingError::InvalidInput("malformed target edge id".into())))
            .collect();
        recorded_target_edges.push(edges?);
    }

    let mut state = EmbeddingState::new(input);
    insertion_sequence::apply(&sequence, &mut state)?;

    for (&h_l, recorded) in sequence.steps.iter().zip(recorded_target_edges.iter()) {
        let embedded = state.get_embedded_path(h_l).expect("apply() embedded every step");
        let replayed: Vec<usize> = embedded
            .vertices
            .windows(2)
            .map(|w| state.target().edge_between(w[0], w[1]).unwrap().index())
            .collect();
        if &replayed != recorded {
            return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                "replayed path for {h_l:?} does not match the saved .emb file (determinism broke)"
            )));
        }
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::halfedge::{HalfEdgeMesh, VertexId};
    use crate::oracle;

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
    fn save_then_load_reproduces_total_length() {
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let input = EmbeddingInput::new(tetra(), tetra(), landmarks).unwrap();
        let mut state = EmbeddingState::new(input.clone());
        let mut sequence = InsertionSequence::new(Metric::Geodesic);
        let mut seen = hashbrown::HashSet::new();
        for v in 0..state.layout().num_vertices() {
            for he in state.layout().outgoing(VertexId(v)) {
                let e = state.layout().edge_of(he);
                if seen.insert(e) {
                    let path = oracle::shortest_path_for_layout_halfedge(&state, he, Metric::Geodesic).unwrap();
                    state.embed_path(he, &path).unwrap();
                    sequence.push(he);
                }
            }
        }

        let dir = std::env::temp_dir().join(format!("layout_embedding_emb_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("case.emb");
        save(&state, &sequence, &path).unwrap();

        let reloaded = load(&path, input).unwrap();
        assert!((reloaded.total_embedded_path_length() - state.total_embedded_path_length()).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }
}
