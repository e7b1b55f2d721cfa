//! Minimal Wavefront OBJ reader/writer: positions and face connectivity
//! only. `vt`/`vn`/`usemtl`/`#`/anything else is silently skipped on read,
//! matching "the core consumes positions and connectivity only" (spec §6).

use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::{LayoutEmbeddingError, Result};
use crate::mesh::halfedge::HalfEdgeMesh;

pub fn read_obj(path: impl AsRef<Path>) -> Result<HalfEdgeMesh> {
    let file = std::fs::File::open(path.as_ref())?;
    let reader = std::io::BufReader::new(file);
    let mut positions = Vec::new();
    let mut faces = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| {
                        t.parse::<f64>().map_err(|_| {
                            LayoutEmbeddingError::InvalidInput(format!(
                                "{}:{}: malformed vertex coordinate {t:?}",
                                path.as_ref().display(),
                                lineno + 1
                            ))
                        })
                    })
                    .collect::<Result<_>>()?;
                if coords.len() != 3 {
                    return Err(LayoutEmbeddingError::InvalidInput(format!(
                        "{}:{}: vertex line needs 3 coordinates",
                        path.as_ref().display(),
                        lineno + 1
                    )));
                }
                positions.push([coords[0], coords[1], coords[2]]);
            }
            Some("f") => {
                let idx: Vec<usize> = tokens
                    .map(|t| {
                        let vi = t.split('/').next().unwrap_or(t);
                        vi.parse::<usize>()
                            .map(|i| i - 1)
                            .map_err(|_| {
                                LayoutEmbeddingError::InvalidInput(format!(
                                    "{}:{}: malformed face index {t:?}",
                                    path.as_ref().display(),
                                    lineno + 1
                                ))
                            })
                    })
                    .collect::<Result<_>>()?;
                faces.push(idx);
            }
            _ => continue, // vt, vn, usemtl, o, g, s, ...
        }
    }

    HalfEdgeMesh::from_faces(positions, faces)
}

pub fn write_obj(mesh: &HalfEdgeMesh, path: impl AsRef<Path>) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.pos[0], v.pos[1], v.pos[2])?;
    }
    for f in 0..mesh.num_faces() {
        let vs = mesh.face_vertices(crate::mesh::halfedge::FaceId(f));
        write!(out, "f")?;
        for v in vs {
            write!(out, " {}", v.index() + 1)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_tetrahedron() {
        let dir = std::env::temp_dir().join(format!("layout_embedding_obj_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tetra.obj");

        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
        let mesh = HalfEdgeMesh::from_faces(positions, faces).unwrap();

        write_obj(&mesh, &path).unwrap();
        let reloaded = read_obj(&path).unwrap();
        assert_eq!(reloaded.num_vertices(), mesh.num_vertices());
        assert_eq!(reloaded.num_faces(), mesh.num_faces());
        assert_eq!(reloaded.num_edges(), mesh.num_edges());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn skips_vt_and_vn_and_comments() {
        let dir = std::env::temp_dir().join(format!("layout_embedding_obj_test2_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tetra_with_extras.obj");
        std::fs::write(
            &path,
            "# a comment\n\
             v 0 0 0\n\
             vt 0 0\n\
             v 1 0 0\n\
             vn 0 0 1\n\
             v 0 1 0\n\
             v 0 0 1\n\
             f 1 3 2\n\
             f 1 2 4\n\
             f 2 3 4\n\
             f 3 1 4\n",
        )
        .unwrap();

        let mesh = read_obj(&path).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);

        std::fs::remove_dir_all(&dir).ok();
    }
}
