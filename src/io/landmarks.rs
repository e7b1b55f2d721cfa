//! Landmark file parser (`io::landmarks`): one entry per layout vertex, in
//! either of two line formats (spec §6):
//!
//! - `id`: a single target vertex index.
//! - `id_x_y_z`: the same index plus a redundant 3D position, checked
//!   against the target mesh's actual vertex position. A mismatch is
//!   `log::warn!`, never an error — the position is a consistency check,
//!   not the source of truth.

use std::path::Path;

use crate::error::{LayoutEmbeddingError, Result};
use crate::mesh::halfedge::{dist, HalfEdgeMesh, VertexId};

/// Positions differing by more than this are reported via `log::warn!`.
const POSITION_MISMATCH_TOLERANCE: f64 = 1e-4;

pub fn read_landmarks(path: impl AsRef<Path>, target: &HalfEdgeMesh) -> Result<Vec<VertexId>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let mut landmarks = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let parse_err = |detail: &str| {
            LayoutEmbeddingError::InvalidInput(format!(
                "{}:{}: {detail}",
                path.as_ref().display(),
                lineno + 1
            ))
        };
        let idx: usize = tokens
            .first()
            .ok_or_else(|| parse_err("empty landmark line"))?
            .parse()
            .map_err(|_| parse_err("landmark id is not an integer"))?;
        if idx >= target.num_vertices() {
            return Err(parse_err("landmark id is out of range for the target mesh"));
        }
        let v = VertexId(idx);

        if tokens.len() >= 4 {
            let coords: Result<Vec<f64>> = tokens[1..4]
                .iter()
                .map(|t| t.parse::<f64>().map_err(|_| parse_err("malformed landmark position")))
                .collect();
            let coords = coords?;
            let declared = [coords[0], coords[1], coords[2]];
            let actual = target.pos(v);
            if dist(declared, actual) > POSITION_MISMATCH_TOLERANCE {
                log::warn!(
                    "landmark file {}:{}: declared position {declared:?} does not match target vertex {idx} position {actual:?}",
                    path.as_ref().display(),
                    lineno + 1
                );
            }
        }

        landmarks.push(v);
    }

    Ok(landmarks)
}

pub fn write_landmarks(landmarks: &[VertexId], target: &HalfEdgeMesh, path: impl AsRef<Path>) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for &v in landmarks {
        let p = target.pos(v);
        writeln!(out, "{} {} {} {}", v.index(), p[0], p[1], p[2])?;
    }
    Ok(())
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
    fn parses_plain_id_format() {
        let dir = std::env::temp_dir().join(format!("layout_embedding_lmk_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("a.lmk");
        std::fs::write(&path, "0\n1\n2\n3\n").unwrap();

        let t = tetra();
        let landmarks = read_landmarks(&path, &t).unwrap();
        assert_eq!(landmarks, vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn parses_id_with_position_and_round_trips() {
        let dir = std::env::temp_dir().join(format!("layout_embedding_lmk_test2_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("b.lmk");

        let t = tetra();
        let landmarks = vec![VertexId(0), VertexId(2), VertexId(1), VertexId(3)];
        write_landmarks(&landmarks, &t, &path).unwrap();
        let reloaded = read_landmarks(&path, &t).unwrap();
        assert_eq!(reloaded, landmarks);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_out_of_range_id() {
        let dir = std::env::temp_dir().join(format!("layout_embedding_lmk_test3_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("c.lmk");
        std::fs::write(&path, "99\n").unwrap();

        let t = tetra();
        assert!(read_landmarks(&path, &t).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
