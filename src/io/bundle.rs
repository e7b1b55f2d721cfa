//! Input bundle (`io::bundle`): a directory/prefix grouping
//! `<prefix>_layout.obj`, `<prefix>_target.obj`, `<prefix>.lmk`, and a small
//! whitespace key/value `<prefix>.manifest` text file. Save/load are
//! inverses modulo the vertex/face renumbering OBJ re-reading induces
//! (spec §6: "modulo mesh index renumbering").

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{LayoutEmbeddingError, Result};
use crate::input::EmbeddingInput;
use crate::io::{landmarks, obj};

fn paths(prefix: impl AsRef<Path>) -> (PathBuf, PathBuf, PathBuf, PathBuf) {
    let prefix = prefix.as_ref();
    let stem = prefix.to_string_lossy().into_owned();
    (
        PathBuf::from(format!("{stem}_layout.obj")),
        PathBuf::from(format!("{stem}_target.obj")),
        PathBuf::from(format!("{stem}.lmk")),
        PathBuf::from(format!("{stem}.manifest")),
    )
}

impl EmbeddingInput {
    pub fn load_bundle(prefix: impl AsRef<Path>) -> Result<Self> {
        let (layout_path, target_path, lmk_path, _manifest_path) = paths(&prefix);
        let layout = obj::read_obj(&layout_path)?;
        let target = obj::read_obj(&target_path)?;
        let landmarks = landmarks::read_landmarks(&lmk_path, &target)?;
        EmbeddingInput::new(layout, target, landmarks)
    }

    pub fn save_bundle(&self, prefix: impl AsRef<Path>) -> Result<()> {
        let (layout_path, target_path, lmk_path, manifest_path) = paths(&prefix);
        obj::write_obj(&self.layout, &layout_path)?;
        obj::write_obj(&self.target, &target_path)?;
        landmarks::write_landmarks(&self.landmarks, &self.target, &lmk_path)?;

        let mut manifest = BTreeMap::new();
        manifest.insert("layout_vertices".to_string(), self.layout.num_vertices().to_string());
        manifest.insert("layout_faces".to_string(), self.layout.num_faces().to_string());
        manifest.insert("target_vertices".to_string(), self.target.num_vertices().to_string());
        manifest.insert("target_faces".to_string(), self.target.num_faces().to_string());
        write_manifest(&manifest, &manifest_path)?;
        Ok(())
    }
}

fn write_manifest(manifest: &BTreeMap<String, String>, path: &Path) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (k, v) in manifest {
        writeln!(out, "{k} {v}")?;
    }
    Ok(())
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let mut manifest = BTreeMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let key = parts.next().ok_or_else(|| {
            LayoutEmbeddingError::InvalidInput(format!(
                "{}:{}: malformed manifest line",
                path.as_ref().display(),
                lineno + 1
            ))
        })?;
        let value = parts.next().unwrap_or("").trim();
        manifest.insert(key.to_string(), value.to_string());
    }
    Ok(manifest)
}
