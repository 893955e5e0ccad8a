//! Concatenates the Sequencer's visiting order into one contiguous path,
//! filling gaps left by skipped or failed pairs with a fallback pathfinder.

use tracing::warn;

use crate::grid::{grid_to_real, EdgeLengthCm, Grid, GridCoord};
use crate::pathfinding::{euclidean, find_path, path_length, PathfindingAlgorithm};

#[derive(Debug, Clone, Default)]
pub struct FallbackStats {
    pub calls: usize,
    pub successes: usize,
    pub failures: usize,
}

pub struct AssembledPath {
    pub cells: Vec<GridCoord>,
    pub total_distance: f64,
    pub fallback: FallbackStats,
}

pub struct PathAssembler;

impl PathAssembler {
    /// Walk `order` (plus a closing edge back to `order[0]` when
    /// `include_return_to_start`), stitching `path_matrix[i][j]` segments
    /// together. Absent pairs are filled by a fallback pathfinder run with
    /// the distance threshold lifted; a fallback that finds nothing emits a
    /// two-cell direct connection so the output is always contiguous by
    /// index even when it's not physically contiguous.
    pub fn assemble(
        grid_with_poi: &Grid,
        pois: &[GridCoord],
        order: &[usize],
        path_matrix: &mut [Vec<Option<Vec<GridCoord>>>],
        distance_matrix: &mut [Vec<f64>],
        algorithm: PathfindingAlgorithm,
        diagonal: bool,
        include_return_to_start: bool,
    ) -> AssembledPath {
        let mut cells = Vec::new();
        let mut total_distance = 0.0;
        let mut fallback = FallbackStats::default();

        let mut pairs: Vec<(usize, usize)> = order.windows(2).map(|w| (w[0], w[1])).collect();
        if include_return_to_start {
            if let (Some(&last), Some(&first)) = (order.last(), order.first()) {
                pairs.push((last, first));
            }
        }

        for (k, &(i, j)) in pairs.iter().enumerate() {
            let (segment, distance) = match path_matrix[i][j].clone() {
                Some(path) => {
                    let d = distance_matrix[i][j];
                    (path, d)
                }
                None => {
                    fallback.calls += 1;
                    match find_path(grid_with_poi, pois[i], pois[j], algorithm, diagonal) {
                        Some(path) => {
                            fallback.successes += 1;
                            let d = path_length(&path);
                            path_matrix[i][j] = Some(path.clone());
                            distance_matrix[i][j] = d;
                            (path, d)
                        }
                        None => {
                            fallback.failures += 1;
                            let edge = grid_with_poi.edge_length_cm();
                            warn!(
                                poi_a = i,
                                poi_b = j,
                                a = ?physical(pois[i], edge),
                                b = ?physical(pois[j], edge),
                                "no fallback path found, emitting direct connection"
                            );
                            let d = euclidean(pois[i], pois[j]);
                            (vec![pois[i], pois[j]], d)
                        }
                    }
                }
            };

            append_segment(&mut cells, &segment, k == 0);
            total_distance += distance;
        }

        AssembledPath {
            cells,
            total_distance,
            fallback,
        }
    }
}

fn physical(c: GridCoord, edge: EdgeLengthCm) -> (f64, f64) {
    let p = grid_to_real(c, edge);
    (p.x, p.y)
}

fn append_segment(cells: &mut Vec<GridCoord>, segment: &[GridCoord], is_first: bool) {
    if segment.is_empty() {
        return;
    }
    if is_first {
        cells.extend_from_slice(segment);
    } else {
        cells.extend_from_slice(&segment[1..]);
    }
}
