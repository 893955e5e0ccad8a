//! 4-connected component extraction and boundary tracing.
//!
//! Obstacles and shelves are rendered as contiguous region paths rather than
//! one `<rect>` per cell: a rectangular component becomes a single rounded
//! rectangle, anything else becomes a traced outline. Both keep the SVG
//! element count down to roughly the number of physical walls rather than
//! the number of cells.

use std::collections::{HashMap, HashSet};

use crate::grid::{CellCode, Grid, GridCoord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    row: i64,
    col: i64,
}

/// A single 4-connected component of cells sharing the same code.
#[derive(Debug, Clone)]
pub struct Region {
    pub cells: Vec<GridCoord>,
    pub min_row: i64,
    pub min_col: i64,
    pub max_row: i64,
    pub max_col: i64,
}

impl Region {
    /// `Some(bounds)` iff the component exactly fills its bounding box —
    /// i.e. it's a solid rectangle with no notches.
    pub fn as_rectangle(&self) -> bool {
        let width = (self.max_col - self.min_col + 1) as usize;
        let height = (self.max_row - self.min_row + 1) as usize;
        self.cells.len() == width * height
    }
}

/// Find every 4-connected component of cells whose code equals `code`,
/// returned in a deterministic order (by top-left cell, row-major) so the
/// resulting SVG is byte-stable across runs.
pub fn connected_components(grid: &Grid, code: CellCode) -> Vec<Region> {
    let mut visited: HashSet<GridCoord> = HashSet::new();
    let mut regions = Vec::new();

    for row in 0..grid.rows() as i64 {
        for col in 0..grid.cols() as i64 {
            let start = GridCoord::new(row, col);
            if visited.contains(&start) || grid.get(start) != Some(code) {
                continue;
            }

            let mut stack = vec![start];
            let mut cells = Vec::new();
            visited.insert(start);

            while let Some(c) = stack.pop() {
                cells.push(c);
                for (dr, dc) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let n = GridCoord::new(c.row + dr, c.col + dc);
                    if !visited.contains(&n) && grid.get(n) == Some(code) {
                        visited.insert(n);
                        stack.push(n);
                    }
                }
            }

            let min_row = cells.iter().map(|c| c.row).min().unwrap();
            let max_row = cells.iter().map(|c| c.row).max().unwrap();
            let min_col = cells.iter().map(|c| c.col).min().unwrap();
            let max_col = cells.iter().map(|c| c.col).max().unwrap();
            cells.sort_by_key(|c| (c.row, c.col));

            regions.push(Region {
                cells,
                min_row,
                min_col,
                max_row,
                max_col,
            });
        }
    }

    regions
}

/// Trace the outline of a region as one or more closed polylines, in
/// grid-corner coordinates (row/col, not yet scaled by the edge length).
/// Multiple loops occur for non-simply-connected or multi-lobed shapes.
pub fn trace_outline(region: &Region) -> Vec<Vec<(i64, i64)>> {
    let member: HashSet<GridCoord> = region.cells.iter().copied().collect();

    // Directed boundary edges, oriented clockwise around solid cells (image
    // coordinates, row increasing downward) so consecutive edges always
    // chain head-to-tail.
    let mut edges: HashMap<Corner, Vec<Corner>> = HashMap::new();
    let mut push_edge = |from: Corner, to: Corner| {
        edges.entry(from).or_default().push(to);
    };

    for &GridCoord { row: r, col: c } in &region.cells {
        let missing = |dr: i64, dc: i64| !member.contains(&GridCoord::new(r + dr, c + dc));

        if missing(-1, 0) {
            push_edge(Corner { row: r, col: c }, Corner { row: r, col: c + 1 });
        }
        if missing(0, 1) {
            push_edge(Corner { row: r, col: c + 1 }, Corner { row: r + 1, col: c + 1 });
        }
        if missing(1, 0) {
            push_edge(Corner { row: r + 1, col: c + 1 }, Corner { row: r + 1, col: c });
        }
        if missing(0, -1) {
            push_edge(Corner { row: r + 1, col: c }, Corner { row: r, col: c });
        }
    }

    let mut loops = Vec::new();
    let mut remaining = edges;

    // Deterministic start point selection: always the smallest remaining
    // corner by (row, col).
    loop {
        let Some(&start) = remaining.keys().min_by_key(|c| (c.row, c.col)) else {
            break;
        };

        let mut loop_points = vec![(start.row, start.col)];
        let mut current = start;
        loop {
            let next = {
                let outgoing = remaining.get_mut(&current);
                match outgoing.and_then(|v| v.pop()) {
                    Some(n) => n,
                    None => break,
                }
            };
            if remaining.get(&current).map(|v| v.is_empty()).unwrap_or(false) {
                remaining.remove(&current);
            }
            if next == start {
                break;
            }
            loop_points.push((next.row, next.col));
            current = next;
        }

        loops.push(loop_points);
    }

    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn rectangular_block_is_detected_as_rectangle() {
        // 2x2 obstacle block inside a 4x4 grid.
        #[rustfmt::skip]
        let cells = vec![
            0, 0, 0, 0,
            0, -1, -1, 0,
            0, -1, -1, 0,
            0, 0, 0, 0,
        ];
        let grid = Grid::new(cells, 4, 4, 10.0, vec![]).unwrap();
        let regions = connected_components(&grid, CellCode::Obstacle);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].as_rectangle());
    }

    #[test]
    fn l_shaped_block_is_not_a_rectangle() {
        #[rustfmt::skip]
        let cells = vec![
            -1, -1, 0,
            -1,  0, 0,
             0,  0, 0,
        ];
        let grid = Grid::new(cells, 3, 3, 10.0, vec![]).unwrap();
        let regions = connected_components(&grid, CellCode::Obstacle);
        assert_eq!(regions.len(), 1);
        assert!(!regions[0].as_rectangle());
    }

    #[test]
    fn disjoint_obstacles_are_separate_components() {
        #[rustfmt::skip]
        let cells = vec![
            -1, 0, -1,
             0, 0,  0,
            -1, 0, -1,
        ];
        let grid = Grid::new(cells, 3, 3, 10.0, vec![]).unwrap();
        let regions = connected_components(&grid, CellCode::Obstacle);
        assert_eq!(regions.len(), 4);
    }

    #[test]
    fn outline_of_single_cell_is_a_unit_square() {
        let cells = vec![-1];
        let grid = Grid::new(cells, 1, 1, 10.0, vec![]).unwrap();
        let regions = connected_components(&grid, CellCode::Obstacle);
        let loops = trace_outline(&regions[0]);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }
}
