//! Lazy SVG (re)generation keyed to layout content hash.
//!
//! `ensure_svg` regenerates iff the hash changed since the last call or the
//! SVG file is missing. The one-writer-per-hash discipline is a mutex-
//! guarded "in progress" marker set: whichever caller wins the race
//! generates once, the rest block on the same mutex and then observe the
//! winner's file already on disk.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use tracing::{debug, info};

use crate::errors::Result;
use crate::grid::Grid;
use crate::hash::LayoutHash;
use crate::layout::store::LayoutStore;
use crate::svg::SvgRenderer;

pub struct LayoutManager {
    last_seen_hash: Mutex<Option<LayoutHash>>,
    in_progress: Mutex<HashSet<LayoutHash>>,
    in_progress_done: Condvar,
}

impl Default for LayoutManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EnsureSvgOutcome {
    pub hash: LayoutHash,
    pub svg_path: std::path::PathBuf,
    pub regenerated: bool,
}

impl LayoutManager {
    pub fn new() -> Self {
        Self {
            last_seen_hash: Mutex::new(None),
            in_progress: Mutex::new(HashSet::new()),
            in_progress_done: Condvar::new(),
        }
    }

    /// Regenerate the SVG for `grid` iff its hash differs from the last one
    /// this manager observed, or the SVG file is absent.
    pub fn ensure_svg(
        &self,
        store: &LayoutStore,
        grid: &Grid,
        hash: LayoutHash,
    ) -> Result<EnsureSvgOutcome> {
        let svg_path = store.svg_path(hash);

        let needs_regeneration = {
            let mut last_seen = self.last_seen_hash.lock().unwrap();
            let stale = *last_seen != Some(hash) || !svg_path.exists();
            if !stale {
                false
            } else {
                *last_seen = Some(hash);
                true
            }
        };

        if !needs_regeneration {
            debug!(%hash, "ensure_svg: already current");
            return Ok(EnsureSvgOutcome {
                hash,
                svg_path,
                regenerated: false,
            });
        }

        // At most one generation per hash in flight: lose the race and wait
        // on the condvar for the winner instead of generating twice.
        {
            let mut in_progress = self.in_progress.lock().unwrap();
            while in_progress.contains(&hash) {
                in_progress = self.in_progress_done.wait(in_progress).unwrap();
            }
            if svg_path.exists() {
                return Ok(EnsureSvgOutcome {
                    hash,
                    svg_path,
                    regenerated: false,
                });
            }
            in_progress.insert(hash);
        }

        let result = SvgRenderer::render_to_file(grid, &svg_path);

        self.in_progress.lock().unwrap().remove(&hash);
        self.in_progress_done.notify_all();

        result?;
        info!(%hash, path = %svg_path.display(), "regenerated SVG");

        Ok(EnsureSvgOutcome {
            hash,
            svg_path,
            regenerated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::layout::store::LayoutStore;
    use tempfile::tempdir;

    #[test]
    fn generates_once_then_skips_on_unchanged_hash() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let manager = LayoutManager::new();
        let grid = Grid::new(vec![0, 0, 0, 0], 2, 2, 100.0, vec![]).unwrap();
        let hash = LayoutHash::compute(&grid);

        let first = manager.ensure_svg(&store, &grid, hash).unwrap();
        assert!(first.regenerated);

        let second = manager.ensure_svg(&store, &grid, hash).unwrap();
        assert!(!second.regenerated);
    }

    #[test]
    fn regenerates_when_hash_changes() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let manager = LayoutManager::new();

        let grid_a = Grid::new(vec![0, 0, 0, 0], 2, 2, 100.0, vec![]).unwrap();
        let hash_a = LayoutHash::compute(&grid_a);
        manager.ensure_svg(&store, &grid_a, hash_a).unwrap();

        let grid_b = Grid::new(vec![0, 0, 0, -1], 2, 2, 100.0, vec![]).unwrap();
        let hash_b = LayoutHash::compute(&grid_b);
        let outcome = manager.ensure_svg(&store, &grid_b, hash_b).unwrap();
        assert!(outcome.regenerated);
    }
}
