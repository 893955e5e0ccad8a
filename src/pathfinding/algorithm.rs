//! The shortest-path search core shared by all three algorithm variants.
//!
//! A*, Dijkstra, and best-first search are the same priority-queue
//! expansion loop with a different priority function: `g + h`, `g` alone,
//! or `h` alone. Modeling them as one generic search avoids three
//! near-identical copies of the open-set bookkeeping.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::grid::{Grid, GridCoord};

/// Which pathfinding variant to run. `AlgorithmUnavailable` is returned for
/// any tag this doesn't recognize; callers are expected to fall back to A*
/// and never surface it as a request error (see spec error taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathfindingAlgorithm {
    AStar,
    Dijkstra,
    BestFirst,
}

impl PathfindingAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AStar => "astar",
            Self::Dijkstra => "dijkstra",
            Self::BestFirst => "best_first",
        }
    }
}

impl TryFrom<&str> for PathfindingAlgorithm {
    type Error = EngineError;

    fn try_from(tag: &str) -> Result<Self, Self::Error> {
        match tag {
            "astar" => Ok(Self::AStar),
            "dijkstra" => Ok(Self::Dijkstra),
            "best_first" => Ok(Self::BestFirst),
            other => Err(EngineError::AlgorithmUnavailable(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    priority: f64,
    coord: GridCoord,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest priority.
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn neighbors(c: GridCoord, diagonal: bool) -> Vec<GridCoord> {
    let mut deltas = vec![(-1, 0), (1, 0), (0, -1), (0, 1)];
    if diagonal {
        deltas.extend([(-1, -1), (-1, 1), (1, -1), (1, 1)]);
    }
    deltas
        .into_iter()
        .map(|(dr, dc)| GridCoord::new(c.row + dr, c.col + dc))
        .collect()
}

fn step_cost(a: GridCoord, b: GridCoord) -> f64 {
    if a.row != b.row && a.col != b.col {
        std::f64::consts::SQRT_2
    } else {
        1.0
    }
}

fn manhattan(a: GridCoord, b: GridCoord) -> f64 {
    ((a.row - b.row).abs() + (a.col - b.col).abs()) as f64
}

/// Octile distance: admissible heuristic for 8-neighborhood grids with
/// Euclidean diagonal cost `sqrt(2)`.
fn octile(a: GridCoord, b: GridCoord) -> f64 {
    let dx = (a.row - b.row).abs() as f64;
    let dy = (a.col - b.col).abs() as f64;
    let (dmin, dmax) = if dx < dy { (dx, dy) } else { (dy, dx) };
    std::f64::consts::SQRT_2 * dmin + (dmax - dmin)
}

fn heuristic(a: GridCoord, b: GridCoord, diagonal: bool) -> f64 {
    if diagonal {
        octile(a, b)
    } else {
        manhattan(a, b)
    }
}

/// Run `algorithm` from `start` to `goal`. Returns the cell path including
/// both endpoints, or `None` if no path exists (both endpoints walkable but
/// disconnected, or an endpoint itself isn't walkable).
pub fn find_path(
    grid: &Grid,
    start: GridCoord,
    goal: GridCoord,
    algorithm: PathfindingAlgorithm,
    diagonal: bool,
) -> Option<Vec<GridCoord>> {
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<GridCoord, f64> = HashMap::new();
    let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();

    g_score.insert(start, 0.0);
    open.push(HeapEntry {
        priority: priority(algorithm, 0.0, heuristic(start, goal, diagonal)),
        coord: start,
    });

    let mut closed: HashMap<GridCoord, bool> = HashMap::new();

    while let Some(HeapEntry { coord, .. }) = open.pop() {
        if coord == goal {
            return Some(reconstruct(&came_from, coord));
        }
        if closed.get(&coord).copied().unwrap_or(false) {
            continue;
        }
        closed.insert(coord, true);

        let g_here = *g_score.get(&coord).unwrap_or(&f64::INFINITY);

        for neighbor in neighbors(coord, diagonal) {
            if !grid.is_walkable(neighbor) {
                continue;
            }
            let tentative = g_here + step_cost(coord, neighbor);
            if tentative < *g_score.get(&neighbor).unwrap_or(&f64::INFINITY) {
                came_from.insert(neighbor, coord);
                g_score.insert(neighbor, tentative);
                open.push(HeapEntry {
                    priority: priority(algorithm, tentative, heuristic(neighbor, goal, diagonal)),
                    coord: neighbor,
                });
            }
        }
    }

    None
}

fn priority(algorithm: PathfindingAlgorithm, g: f64, h: f64) -> f64 {
    match algorithm {
        PathfindingAlgorithm::AStar => g + h,
        PathfindingAlgorithm::Dijkstra => g,
        PathfindingAlgorithm::BestFirst => h,
    }
}

fn reconstruct(came_from: &HashMap<GridCoord, GridCoord>, mut current: GridCoord) -> Vec<GridCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of per-step Euclidean lengths along a path (1.0 for orthogonal
/// steps, sqrt(2) for diagonal).
pub fn path_length(path: &[GridCoord]) -> f64 {
    path.windows(2).map(|w| step_cost(w[0], w[1])).sum()
}

/// Straight-line Euclidean distance between two cells, in grid units —
/// independent of walkability, used for threshold checks.
pub fn euclidean(a: GridCoord, b: GridCoord) -> f64 {
    let dr = (a.row - b.row) as f64;
    let dc = (a.col - b.col) as f64;
    (dr * dr + dc * dc).sqrt()
}
