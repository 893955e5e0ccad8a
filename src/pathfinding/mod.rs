//! The Pathfinder: N×N distance/path matrices between mapped POIs.
//!
//! Every ordered pair is computed independently (not folded to the
//! symmetric half) since the capability contract doesn't assume the
//! underlying search is symmetric — see `DESIGN.md` for why this is a
//! deliberate, documented non-optimization rather than an oversight.

mod algorithm;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::grid::{Grid, GridCoord};

pub use algorithm::{euclidean, find_path, path_length, PathfindingAlgorithm};

/// Large but finite penalty substituted for a skipped or failed pair so
/// the Sequencer can still route around it instead of choking on infinity.
pub const SKIP_PENALTY_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    Computed,
    SkippedThreshold,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PairResult {
    pub distance: f64,
    pub path: Option<Vec<GridCoord>>,
    pub outcome: PairOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathfindingStats {
    pub algorithm: String,
    pub diagonal_movement: bool,
    pub paths_computed: usize,
    pub paths_failed: usize,
    pub paths_skipped_threshold: usize,
    pub success_rate: f64,
    pub average_path_length: f64,
    pub wall_time_ms: f64,
}

pub struct AllPathsResult {
    pub distance: Vec<Vec<f64>>,
    pub path: Vec<Vec<Option<Vec<GridCoord>>>>,
    pub stats: PathfindingStats,
}

/// Compute the full N×N distance and path matrices between `pois`.
///
/// `distance_threshold_grid` bounds which pairs are attempted at all: pairs
/// farther apart (straight-line, in grid units) than the threshold are
/// recorded as skipped rather than pathfound.
pub fn compute_all_paths(
    grid: &Grid,
    pois: &[GridCoord],
    algorithm: PathfindingAlgorithm,
    diagonal: bool,
    distance_threshold_grid: f64,
) -> AllPathsResult {
    let n = pois.len();
    let mut distance = vec![vec![0.0_f64; n]; n];
    let mut path = vec![vec![None; n]; n];

    let mut computed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    let mut total_length = 0.0_f64;

    let start = Instant::now();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                path[i][j] = Some(vec![pois[i]]);
                distance[i][j] = 0.0;
                continue;
            }

            let straight = euclidean(pois[i], pois[j]);
            if straight > distance_threshold_grid {
                distance[i][j] = SKIP_PENALTY_MULTIPLIER * straight;
                path[i][j] = None;
                skipped += 1;
                continue;
            }

            match find_path(grid, pois[i], pois[j], algorithm, diagonal) {
                Some(p) => {
                    let len = path_length(&p);
                    distance[i][j] = len;
                    total_length += len;
                    path[i][j] = Some(p);
                    computed += 1;
                }
                None => {
                    distance[i][j] = f64::INFINITY;
                    path[i][j] = None;
                    failed += 1;
                }
            }
        }
    }

    let elapsed: Duration = start.elapsed();
    let attempted = computed + failed;
    let success_rate = if attempted > 0 {
        computed as f64 / attempted as f64
    } else {
        1.0
    };
    let average_path_length = if computed > 0 {
        total_length / computed as f64
    } else {
        0.0
    };

    AllPathsResult {
        distance,
        path,
        stats: PathfindingStats {
            algorithm: algorithm.as_str().to_string(),
            diagonal_movement: diagonal,
            paths_computed: computed,
            paths_failed: failed,
            paths_skipped_threshold: skipped,
            success_rate,
            average_path_length,
            wall_time_ms: elapsed.as_secs_f64() * 1000.0,
        },
    }
}

/// Resolve a request's algorithm tag, falling back to A* (and reporting the
/// substitution) when the tag is unrecognized. `AlgorithmUnavailable` must
/// never reach the caller as a request error per the error taxonomy.
pub fn resolve_algorithm(tag: &str) -> (PathfindingAlgorithm, bool) {
    match PathfindingAlgorithm::try_from(tag) {
        Ok(algo) => (algo, false),
        Err(EngineError::AlgorithmUnavailable(_)) => (PathfindingAlgorithm::AStar, true),
        Err(_) => (PathfindingAlgorithm::AStar, true),
    }
}

/// Validate a request's `pathfinding_algorithm` tag without resolving it —
/// `/pathfinding_algorithms` uses this to enumerate support.
pub fn supported_algorithm_tags() -> &'static [&'static str] {
    &["astar", "dijkstra", "best_first"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn self_pair_has_zero_distance_and_trivial_path() {
        let grid = Grid::new(vec![0, 0, 0, 0], 2, 2, 100.0, vec![]).unwrap();
        let pois = vec![GridCoord::new(0, 0), GridCoord::new(1, 1)];
        let result = compute_all_paths(&grid, &pois, PathfindingAlgorithm::AStar, false, 100.0);
        assert_eq!(result.distance[0][0], 0.0);
        assert_eq!(result.path[0][0], Some(vec![pois[0]]));
    }

    #[test]
    fn pair_beyond_threshold_is_skipped_with_penalty() {
        let grid = Grid::new(vec![0; 100], 10, 10, 100.0, vec![]).unwrap();
        let pois = vec![GridCoord::new(0, 0), GridCoord::new(9, 9)];
        let result = compute_all_paths(&grid, &pois, PathfindingAlgorithm::AStar, false, 1.0);
        assert_eq!(result.stats.paths_skipped_threshold, 2);
        assert!(result.path[0][1].is_none());
        let straight = euclidean(pois[0], pois[1]);
        assert_eq!(result.distance[0][1], SKIP_PENALTY_MULTIPLIER * straight);
    }

    #[test]
    fn disconnected_pair_is_recorded_as_failed_not_aborted() {
        #[rustfmt::skip]
        let cells = vec![
            0, -1, 0,
            -1, -1, -1,
            0, -1, 0,
        ];
        let grid = Grid::new(cells, 3, 3, 100.0, vec![]).unwrap();
        let pois = vec![GridCoord::new(0, 0), GridCoord::new(2, 2)];
        let result = compute_all_paths(&grid, &pois, PathfindingAlgorithm::AStar, false, 100.0);
        assert_eq!(result.stats.paths_failed, 2);
        assert!(result.distance[0][1].is_infinite());
    }

    #[test]
    fn unknown_algorithm_falls_back_to_astar_with_flag_set() {
        let (algo, substituted) = resolve_algorithm("jps");
        assert_eq!(algo, PathfindingAlgorithm::AStar);
        assert!(substituted);
    }

    #[test]
    fn known_algorithm_resolves_without_substitution() {
        let (algo, substituted) = resolve_algorithm("dijkstra");
        assert_eq!(algo, PathfindingAlgorithm::Dijkstra);
        assert!(!substituted);
    }
}
