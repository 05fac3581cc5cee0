//! On-disk persistence of global model snapshots.
//!
//! Checkpoints are bincode-serialized and LZ4-compressed.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{now, Error, Result, Timestamp};
use crate::model::tensor::ParameterSnapshot;

/// A persisted global snapshot with its round of origin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Round the snapshot was taken after
    pub round: usize,
    /// Creation timestamp
    pub created: Timestamp,
    /// The full parameter state
    pub snapshot: ParameterSnapshot,
}

impl Checkpoint {
    /// Capture a snapshot as a checkpoint.
    pub fn new(round: usize, snapshot: ParameterSnapshot) -> Self {
        Self {
            round,
            created: now(),
            snapshot,
        }
    }
}

/// Directory-backed checkpoint store.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.ckpt", name))
    }

    /// Persist a checkpoint under `name`, returning the written path.
    pub fn save(&self, name: &str, checkpoint: &Checkpoint) -> Result<PathBuf> {
        let encoded = bincode::serialize(checkpoint)?;
        let compressed = compress_prepend_size(&encoded);
        let path = self.path_for(name);
        fs::write(&path, compressed)?;
        Ok(path)
    }

    /// Load the checkpoint stored under `name`.
    pub fn load(&self, name: &str) -> Result<Checkpoint> {
        let compressed = fs::read(self.path_for(name))?;
        let encoded = decompress_size_prepended(&compressed)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
        Ok(bincode::deserialize(&encoded)?)
    }

    /// Names of all stored checkpoints.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("ckpt") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
