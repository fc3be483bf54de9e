//! On-disk index storage.
//!
//! A persist directory holds the two artifacts of one index:
//!
//! | File | Contents |
//! |------|----------|
//! | `index.bin` | encoded vectors (see [`ragchat_core::storage`]) |
//! | `metadata.json` | [`IndexMetadata`]: counts, model, checksum, chunks |
//!
//! Both files are first staged as temporary siblings. Only once both are
//! fully written are they renamed into place, so a failed write leaves the
//! previous pair loadable. A crash between the two renames leaves a pair
//! whose checksum does not match, which `load` rejects.

use std::fs;
use std::path::{Path, PathBuf};

use ragchat_core::storage::{IndexMetadata, IndexSnapshot, IndexStorage};
use ragchat_core::{RagError, Result};

pub const VECTORS_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

impl IndexStorage for DirStorage {
    fn exists(&self) -> bool {
        self.vectors_path().is_file() && self.metadata_path().is_file()
    }

    fn write(&self, snapshot: &IndexSnapshot) -> Result<()> {
        let build_err =
            |what: &str, e: &dyn std::fmt::Display| RagError::IndexBuild(format!("{}: {}", what, e));

        fs::create_dir_all(&self.dir)
            .map_err(|e| build_err(&format!("creating {}", self.dir.display()), &e))?;
        let metadata = serde_json::to_vec_pretty(&snapshot.metadata)
            .map_err(|e| build_err("serializing metadata", &e))?;

        let staged = [
            (self.vectors_path(), snapshot.vectors.as_slice()),
            (self.metadata_path(), metadata.as_slice()),
        ];
        for (i, (path, bytes)) in staged.iter().enumerate() {
            if let Err(e) = fs::write(staging_path(path), bytes) {
                for (written, _) in &staged[..i] {
                    let _ = fs::remove_file(staging_path(written));
                }
                return Err(build_err(&format!("writing {}", path.display()), &e));
            }
        }
        for (path, _) in &staged {
            fs::rename(staging_path(path), path)
                .map_err(|e| build_err(&format!("replacing {}", path.display()), &e))?;
        }
        Ok(())
    }

    fn read(&self) -> Result<IndexSnapshot> {
        let vectors_path = self.vectors_path();
        let metadata_path = self.metadata_path();
        match (vectors_path.is_file(), metadata_path.is_file()) {
            (true, true) => {}
            (false, false) => {
                return Err(RagError::IndexLoad(format!(
                    "no persisted index in {}",
                    self.dir.display()
                )))
            }
            (true, false) | (false, true) => {
                let missing = if vectors_path.is_file() {
                    &metadata_path
                } else {
                    &vectors_path
                };
                return Err(RagError::IndexLoad(format!(
                    "inconsistent index: {} is missing",
                    missing.display()
                )));
            }
        }

        let vectors = fs::read(&vectors_path).map_err(|e| {
            RagError::IndexLoad(format!("reading {}: {}", vectors_path.display(), e))
        })?;
        let raw = fs::read(&metadata_path).map_err(|e| {
            RagError::IndexLoad(format!("reading {}: {}", metadata_path.display(), e))
        })?;
        let metadata: IndexMetadata = serde_json::from_slice(&raw).map_err(|e| {
            RagError::IndexLoad(format!("parsing {}: {}", metadata_path.display(), e))
        })?;

        Ok(IndexSnapshot { vectors, metadata })
    }
}
