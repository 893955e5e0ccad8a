//! Content-addressed persistence of uploaded layouts.
//!
//! Every artifact is keyed by `LayoutHash`: the layout itself lives at
//! `⟨hash⟩.h5`, its metadata sidecar at `⟨hash⟩_metadata.json`, and a small
//! pointer file records which hash is "current". Writes go to a temp file
//! and get renamed into place so a crash mid-write never leaves a
//! `⟨hash⟩.h5` that doesn't actually hash to `hash`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{EngineError, Result};
use crate::grid::Grid;
use crate::hash::LayoutHash;
use crate::layout::format;

const CURRENT_POINTER_FILE: &str = "current.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CurrentPointer {
    layout_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayoutMetadata {
    uploaded_at: String,
    rows: usize,
    cols: usize,
    edge_length_cm: f64,
    zone_count: usize,
}

#[derive(Debug, Clone)]
pub struct SaveStats {
    pub bytes_written: usize,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub hash: LayoutHash,
    pub rows: usize,
    pub cols: usize,
    pub edge_length_cm: f64,
    pub updated: bool,
    pub stats: SaveStats,
}

/// Owns every on-disk layout file and the current-hash pointer.
pub struct LayoutStore {
    cache_dir: PathBuf,
}

impl LayoutStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn layout_path(&self, hash: LayoutHash) -> PathBuf {
        self.cache_dir.join(format!("{hash}.h5"))
    }

    pub fn svg_path(&self, hash: LayoutHash) -> PathBuf {
        self.cache_dir.join(format!("{hash}.svg"))
    }

    fn metadata_path(&self, hash: LayoutHash) -> PathBuf {
        self.cache_dir.join(format!("{hash}_metadata.json"))
    }

    fn current_pointer_path(&self) -> PathBuf {
        self.cache_dir.join(CURRENT_POINTER_FILE)
    }

    /// Write `contents` to `path` atomically: write to a sibling temp file,
    /// then rename over the destination. A rename within the same directory
    /// is atomic on every platform this runs on.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let tmp_path = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
        ));
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Decode, validate, hash, and persist a raw layout payload (the bytes
    /// of a `⟨hash⟩.h5` file). Returns `updated=false` without touching
    /// disk if the computed hash matches the current one.
    pub fn save(&self, raw_payload: &[u8]) -> Result<SaveOutcome> {
        let grid = format::decode(raw_payload)?;
        let hash = LayoutHash::compute(&grid);

        if let Some(current) = self.current_hash()? {
            if current == hash {
                debug!(%hash, "save: content unchanged, skipping write");
                return Ok(SaveOutcome {
                    hash,
                    rows: grid.rows(),
                    cols: grid.cols(),
                    edge_length_cm: grid.edge_length_cm().get(),
                    updated: false,
                    stats: SaveStats { bytes_written: 0 },
                });
            }
        }

        let layout_path = self.layout_path(hash);
        self.write_atomic(&layout_path, raw_payload)?;

        let metadata = LayoutMetadata {
            uploaded_at: Utc::now().to_rfc3339(),
            rows: grid.rows(),
            cols: grid.cols(),
            edge_length_cm: grid.edge_length_cm().get(),
            zone_count: grid.zones().len(),
        };
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;
        self.write_atomic(&self.metadata_path(hash), &metadata_bytes)?;

        let pointer = CurrentPointer {
            layout_hash: hash.to_hex(),
        };
        let pointer_bytes = serde_json::to_vec_pretty(&pointer)?;
        self.write_atomic(&self.current_pointer_path(), &pointer_bytes)?;

        info!(%hash, rows = grid.rows(), cols = grid.cols(), "saved new layout");

        Ok(SaveOutcome {
            hash,
            rows: grid.rows(),
            cols: grid.cols(),
            edge_length_cm: grid.edge_length_cm().get(),
            updated: true,
            stats: SaveStats {
                bytes_written: raw_payload.len(),
            },
        })
    }

    /// The hash currently considered "current", if any has been uploaded.
    pub fn current_hash(&self) -> Result<Option<LayoutHash>> {
        let pointer_path = self.current_pointer_path();
        if !pointer_path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&pointer_path)?;
        let pointer: CurrentPointer = serde_json::from_slice(&bytes)?;
        Ok(LayoutHash::from_hex(&pointer.layout_hash))
    }

    pub fn load(&self, hash: LayoutHash) -> Result<Grid> {
        let path = self.layout_path(hash);
        if !path.exists() {
            return Err(EngineError::NoLayout);
        }
        let bytes = fs::read(&path)?;
        format::decode(&bytes)
    }

    pub fn load_current(&self) -> Result<(Grid, LayoutHash)> {
        let hash = self.current_hash()?.ok_or(EngineError::NoLayout)?;
        let grid = self.load(hash)?;
        Ok((grid, hash))
    }

    /// Remove the on-disk artifacts for a hash. Not wired to any HTTP route
    /// (cache purge is out of scope per spec §1); exposed for admin tooling.
    pub fn purge(&self, hash: LayoutHash) -> Result<()> {
        for path in [
            self.layout_path(hash),
            self.svg_path(hash),
            self.metadata_path(hash),
        ] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use tempfile::tempdir;

    fn sample_payload() -> Vec<u8> {
        let grid = Grid::new(vec![0, 0, 0, 0], 2, 2, 100.0, vec![]).unwrap();
        format::encode(&grid, None).unwrap()
    }

    #[test]
    fn save_then_load_current_round_trips() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();

        let payload = sample_payload();
        let outcome = store.save(&payload).unwrap();
        assert!(outcome.updated);

        let (grid, hash) = store.load_current().unwrap();
        assert_eq!(hash, outcome.hash);
        assert_eq!(grid.rows(), 2);
    }

    #[test]
    fn re_uploading_identical_bytes_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();

        let payload = sample_payload();
        let first = store.save(&payload).unwrap();
        assert!(first.updated);

        let layout_path = store.layout_path(first.hash);
        let mtime_before = fs::metadata(&layout_path).unwrap().modified().unwrap();

        let second = store.save(&payload).unwrap();
        assert!(!second.updated);
        assert_eq!(second.hash, first.hash);

        let mtime_after = fs::metadata(&layout_path).unwrap().modified().unwrap();
        assert_eq!(mtime_before, mtime_after);
    }

    #[test]
    fn load_current_without_upload_is_no_layout() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let err = store.load_current().unwrap_err();
        assert_eq!(err.kind(), "NoLayout");
    }

    #[test]
    fn invalid_cell_codes_are_rejected() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();

        // A grid with an illegal cell code can't even be built, so hand the
        // store raw junk bytes instead to exercise the decode-failure path.
        let err = store.save(b"not a real layout payload").unwrap_err();
        assert_eq!(err.kind(), "InvalidLayout");
    }

    #[test]
    fn purge_removes_layout_and_sidecar_files() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let outcome = store.save(&sample_payload()).unwrap();

        store.purge(outcome.hash).unwrap();
        assert!(store.load(outcome.hash).is_err());
    }
}
