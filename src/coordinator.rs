//! The Coordinator: drives the full `/optimize_path` pipeline end to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembler::PathAssembler;
use crate::errors::{EngineError, Result};
use crate::grid::{grid_to_real, PhysicalPoint};
use crate::layout::{LayoutManager, LayoutStore};
use crate::pathfinding::{compute_all_paths, resolve_algorithm};
use crate::poi::{POIMapper, POIValidation};
use crate::sequencer;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);
static PROCESS_START_UNIX: OnceLock<u64> = OnceLock::new();

fn next_request_id() -> String {
    let start = *PROCESS_START_UNIX.get_or_init(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{start:x}-{seq}")
}

fn default_distance_threshold_cm() -> f64 {
    2000.0
}

fn default_max_runtime_s() -> f64 {
    60.0
}

fn default_algorithm() -> String {
    "astar".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRequest {
    pub poi_coordinates: Vec<PhysicalPoint>,
    #[serde(default = "default_distance_threshold_cm")]
    pub distance_threshold_cm: f64,
    #[serde(default = "default_max_runtime_s")]
    pub max_runtime_s: f64,
    #[serde(default)]
    pub include_return_to_start: bool,
    #[serde(default = "default_algorithm")]
    pub pathfinding_algorithm: String,
    #[serde(default)]
    pub diagonal_movement: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationStats {
    pub algorithm: String,
    pub diagonal_movement: bool,
    pub paths_computed: usize,
    pub paths_failed: usize,
    pub paths_skipped_threshold: usize,
    pub success_rate: f64,
    pub average_path_length: f64,
    pub pathfinding_wall_time_ms: f64,
    pub sequencer_backend: String,
    pub algorithm_substituted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackPathfindingSummary {
    pub calls: usize,
    pub successes: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathSummary {
    pub total_points: usize,
    pub segments: usize,
    pub fallback_pathfinding: FallbackPathfindingSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub total_distance: f64,
    pub visiting_order: Vec<usize>,
    pub complete_path: Vec<(f64, f64)>,
    pub poi_count: usize,
    pub computation_time: f64,
    pub layout_hash: String,
    pub generated_layout_svg: bool,
    pub optimization_stats: OptimizationStats,
    pub path_summary: PathSummary,
}

pub struct Coordinator;

impl Coordinator {
    /// Run the full pipeline per spec §4.8: load, validate, map, (in
    /// parallel) refresh the SVG and compute paths, sequence, assemble,
    /// convert to physical coordinates.
    pub fn optimize(
        store: &LayoutStore,
        manager: &LayoutManager,
        request: OptimizeRequest,
    ) -> Result<OptimizeResponse> {
        let request_id = next_request_id();
        let started = Instant::now();

        let (grid, hash) = store.load_current()?;

        if request.poi_coordinates.len() < 2 {
            return Err(EngineError::TooFewPOIs {
                got: request.poi_coordinates.len(),
            });
        }

        let mapping = POIMapper::map(
            &grid,
            &request.poi_coordinates,
            request.distance_threshold_cm,
        )?;

        let (algorithm, substituted) = resolve_algorithm(&request.pathfinding_algorithm);
        if substituted {
            warn!(
                request_id = %request_id,
                requested = %request.pathfinding_algorithm,
                fallback = algorithm.as_str(),
                "unsupported pathfinding algorithm, substituting"
            );
        }

        let mut generated_svg = false;
        let mut paths_result = None;

        std::thread::scope(|scope| {
            let svg_handle = scope.spawn(|| manager.ensure_svg(store, &grid, hash));

            paths_result = Some(compute_all_paths(
                &mapping.grid_with_poi,
                &mapping.poi_grid,
                algorithm,
                request.diagonal_movement,
                mapping.distance_threshold_grid,
            ));

            match svg_handle.join() {
                Ok(Ok(outcome)) => generated_svg = outcome.regenerated,
                Ok(Err(e)) => warn!(request_id = %request_id, error = %e, "SVG refresh failed"),
                Err(_) => warn!(request_id = %request_id, "SVG refresh thread panicked"),
            }
        });

        let mut all_paths = paths_result.expect("pathfinding always runs");

        let sequencer_result = sequencer::solve(
            &all_paths.distance,
            Duration::from_secs_f64(request.max_runtime_s.max(0.0)),
        )?;

        let assembled = PathAssembler::assemble(
            &mapping.grid_with_poi,
            &mapping.poi_grid,
            &sequencer_result.order,
            &mut all_paths.path,
            &mut all_paths.distance,
            algorithm,
            request.diagonal_movement,
            request.include_return_to_start,
        );

        let edge = grid.edge_length_cm();
        let complete_path: Vec<(f64, f64)> = assembled
            .cells
            .iter()
            .map(|&c| {
                let p = grid_to_real(c, edge);
                (p.x, p.y)
            })
            .collect();

        let computation_time = started.elapsed().as_secs_f64();
        info!(
            request_id = %request_id,
            poi_count = mapping.poi_grid.len(),
            total_distance = assembled.total_distance,
            computation_time,
            "optimize_path complete"
        );

        Ok(OptimizeResponse {
            success: true,
            total_distance: assembled.total_distance,
            visiting_order: sequencer_result.order,
            complete_path,
            poi_count: mapping.poi_grid.len(),
            computation_time,
            layout_hash: hash.to_hex(),
            generated_layout_svg: generated_svg,
            optimization_stats: OptimizationStats {
                algorithm: all_paths.stats.algorithm,
                diagonal_movement: all_paths.stats.diagonal_movement,
                paths_computed: all_paths.stats.paths_computed,
                paths_failed: all_paths.stats.paths_failed,
                paths_skipped_threshold: all_paths.stats.paths_skipped_threshold,
                success_rate: all_paths.stats.success_rate,
                average_path_length: all_paths.stats.average_path_length,
                pathfinding_wall_time_ms: all_paths.stats.wall_time_ms,
                sequencer_backend: format!("{:?}", sequencer_result.backend),
                algorithm_substituted: substituted,
            },
            path_summary: PathSummary {
                total_points: assembled.cells.len(),
                segments: assembled.cells.len().saturating_sub(1),
                fallback_pathfinding: FallbackPathfindingSummary {
                    calls: assembled.fallback.calls,
                    successes: assembled.fallback.successes,
                    failures: assembled.fallback.failures,
                },
            },
        })
    }

    /// Steps 1-3 only, for `/validate_poi_placement`: load the current
    /// layout and report the per-POI validation summary without running
    /// the rest of the pipeline.
    pub fn validate_poi_placement(
        store: &LayoutStore,
        poi_coordinates: &[PhysicalPoint],
    ) -> Result<Vec<POIValidation>> {
        let (grid, _hash) = store.load_current()?;
        Ok(POIMapper::validate(&grid, poi_coordinates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::format;
    use crate::grid::Grid;
    use tempfile::{tempdir, TempDir};

    fn seeded_store() -> (TempDir, LayoutStore) {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let grid = Grid::new(vec![0; 9], 3, 3, 100.0, vec![]).unwrap();
        let payload = format::encode(&grid, None).unwrap();
        store.save(&payload).unwrap();
        (dir, store)
    }

    #[test]
    fn happy_path_returns_a_valid_permutation() {
        let (_dir, store) = seeded_store();
        let manager = LayoutManager::new();
        let request = OptimizeRequest {
            poi_coordinates: vec![
                PhysicalPoint::new(50.0, 50.0),
                PhysicalPoint::new(50.0, 250.0),
            ],
            distance_threshold_cm: 2000.0,
            max_runtime_s: 1.0,
            include_return_to_start: false,
            pathfinding_algorithm: "astar".to_string(),
            diagonal_movement: false,
        };

        let response = Coordinator::optimize(&store, &manager, request).unwrap();
        assert!(response.success);
        let mut order = response.visiting_order.clone();
        order.sort();
        assert_eq!(order, vec![0, 1]);
        assert_eq!(response.complete_path.first(), Some(&(50.0, 50.0)));
        assert_eq!(response.complete_path.last(), Some(&(50.0, 250.0)));
    }

    #[test]
    fn too_few_pois_is_rejected_after_loading_layout() {
        let (_dir, store) = seeded_store();
        let manager = LayoutManager::new();
        let request = OptimizeRequest {
            poi_coordinates: vec![PhysicalPoint::new(50.0, 50.0)],
            distance_threshold_cm: 2000.0,
            max_runtime_s: 1.0,
            include_return_to_start: false,
            pathfinding_algorithm: "astar".to_string(),
            diagonal_movement: false,
        };
        let err = Coordinator::optimize(&store, &manager, request).unwrap_err();
        assert_eq!(err.kind(), "TooFewPOIs");
    }

    #[test]
    fn missing_layout_is_reported_even_with_too_few_pois() {
        let dir = tempdir().unwrap();
        let store = LayoutStore::new(dir.path()).unwrap();
        let manager = LayoutManager::new();
        let request = OptimizeRequest {
            poi_coordinates: vec![PhysicalPoint::new(50.0, 50.0)],
            distance_threshold_cm: 2000.0,
            max_runtime_s: 1.0,
            include_return_to_start: false,
            pathfinding_algorithm: "astar".to_string(),
            diagonal_movement: false,
        };
        let err = Coordinator::optimize(&store, &manager, request).unwrap_err();
        assert_eq!(err.kind(), "NoLayout");
    }

    #[test]
    fn unsupported_algorithm_falls_back_without_erroring() {
        let (_dir, store) = seeded_store();
        let manager = LayoutManager::new();
        let request = OptimizeRequest {
            poi_coordinates: vec![
                PhysicalPoint::new(50.0, 50.0),
                PhysicalPoint::new(50.0, 250.0),
            ],
            distance_threshold_cm: 2000.0,
            max_runtime_s: 1.0,
            include_return_to_start: false,
            pathfinding_algorithm: "jps".to_string(),
            diagonal_movement: false,
        };
        let response = Coordinator::optimize(&store, &manager, request).unwrap();
        assert!(response.success);
        assert_eq!(response.optimization_stats.algorithm, "astar");
        assert!(response.optimization_stats.algorithm_substituted);
    }

    #[test]
    fn return_to_start_closes_the_physical_loop() {
        let (_dir, store) = seeded_store();
        let manager = LayoutManager::new();
        let request = OptimizeRequest {
            poi_coordinates: vec![
                PhysicalPoint::new(50.0, 50.0),
                PhysicalPoint::new(50.0, 250.0),
                PhysicalPoint::new(250.0, 150.0),
            ],
            distance_threshold_cm: 2000.0,
            max_runtime_s: 1.0,
            include_return_to_start: true,
            pathfinding_algorithm: "astar".to_string(),
            diagonal_movement: false,
        };
        let response = Coordinator::optimize(&store, &manager, request).unwrap();
        assert_eq!(response.complete_path.first(), response.complete_path.last());
    }

    #[test]
    fn validate_poi_placement_reports_without_failing() {
        let (_dir, store) = seeded_store();
        let summary = Coordinator::validate_poi_placement(
            &store,
            &[PhysicalPoint::new(50.0, 50.0), PhysicalPoint::new(9999.0, 9999.0)],
        )
        .unwrap();
        assert_eq!(summary.len(), 2);
    }
}
