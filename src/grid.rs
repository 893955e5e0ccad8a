//! The occupancy grid: cell codes, physical/grid coordinate conversions, and
//! named zones.
//!
//! Coordinate convention (normative, see spec §3): physical `x` indexes grid
//! rows, physical `y` indexes grid columns. This is deliberate and
//! one-directional — nothing in this module silently swaps axes.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// What occupies a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellCode {
    Navigable,
    Poi,
    Obstacle,
    Shelf,
}

impl CellCode {
    pub fn from_i8(v: i8) -> Option<Self> {
        match v {
            0 => Some(Self::Navigable),
            1 => Some(Self::Poi),
            -1 => Some(Self::Obstacle),
            2 => Some(Self::Shelf),
            _ => None,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Self::Navigable => 0,
            Self::Poi => 1,
            Self::Obstacle => -1,
            Self::Shelf => 2,
        }
    }

    /// Navigable and POI cells are walkable for pathfinding; shelves and
    /// obstacles never are.
    pub fn is_walkable(self) -> bool {
        matches!(self, CellCode::Navigable | CellCode::Poi)
    }
}

/// Physical size of one grid cell's side, in centimeters. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeLengthCm(f64);

impl EdgeLengthCm {
    pub fn new(cm: f64) -> Result<Self> {
        if !(cm.is_finite() && cm > 0.0) {
            return Err(EngineError::invalid_layout(format!(
                "edge_length_cm must be a positive finite number, got {cm}"
            )));
        }
        Ok(Self(cm))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// A cell reference into the grid, `(row, col)`, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: i64,
    pub col: i64,
}

impl GridCoord {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// A physical-space coordinate in centimeters, `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPoint {
    pub x: f64,
    pub y: f64,
}

impl PhysicalPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `floor(x / edge), floor(y / edge)`. A coordinate exactly on a cell
/// boundary maps into the cell whose top-left corner is that boundary,
/// which `floor` gives for free.
pub fn real_to_grid(p: PhysicalPoint, edge: EdgeLengthCm) -> GridCoord {
    GridCoord::new(
        (p.x / edge.get()).floor() as i64,
        (p.y / edge.get()).floor() as i64,
    )
}

/// Returns the physical center of a cell.
pub fn grid_to_real(c: GridCoord, edge: EdgeLengthCm) -> PhysicalPoint {
    PhysicalPoint::new(
        (c.row as f64 + 0.5) * edge.get(),
        (c.col as f64 + 0.5) * edge.get(),
    )
}

/// A named polygon in physical coordinates, rendered only by the SVG layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub points: Vec<PhysicalPoint>,
}

/// The 2-D occupancy grid. Stored flat for cache locality — every
/// pathfinding algorithm indexes it in its hot loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<i8>,
    edge_length_cm: EdgeLengthCm,
    zones: Vec<Zone>,
}

impl Grid {
    /// Build a grid from raw row-major cell codes, validating shape and
    /// cell values against `{0, 1, -1, 2}`.
    pub fn new(
        cells: Vec<i8>,
        rows: usize,
        cols: usize,
        edge_length_cm: f64,
        zones: Vec<Zone>,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(EngineError::invalid_layout(
                "grid must have at least one row and one column",
            ));
        }
        if cells.len() != rows * cols {
            return Err(EngineError::invalid_layout(format!(
                "expected {} cells for a {rows}x{cols} grid, got {}",
                rows * cols,
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|&&v| CellCode::from_i8(v).is_none()) {
            return Err(EngineError::invalid_layout(format!(
                "illegal cell code {bad}, expected one of {{0, 1, -1, 2}}"
            )));
        }

        let edge = EdgeLengthCm::new(edge_length_cm)?;
        Ok(Self {
            rows,
            cols,
            cells,
            edge_length_cm: edge,
            zones,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn edge_length_cm(&self) -> EdgeLengthCm {
        self.edge_length_cm
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn in_bounds(&self, c: GridCoord) -> bool {
        c.row >= 0 && c.col >= 0 && (c.row as usize) < self.rows && (c.col as usize) < self.cols
    }

    fn index(&self, c: GridCoord) -> usize {
        c.row as usize * self.cols + c.col as usize
    }

    pub fn get(&self, c: GridCoord) -> Option<CellCode> {
        if !self.in_bounds(c) {
            return None;
        }
        CellCode::from_i8(self.cells[self.index(c)])
    }

    pub fn is_walkable(&self, c: GridCoord) -> bool {
        self.get(c).map(CellCode::is_walkable).unwrap_or(false)
    }

    /// Set a single cell's code. Used by the POI mapper to imprint markers;
    /// never lets a caller overwrite an obstacle.
    pub fn set(&mut self, c: GridCoord, code: CellCode) -> Result<()> {
        if !self.in_bounds(c) {
            return Err(EngineError::internal(format!(
                "set() called with out-of-bounds coord {c:?}"
            )));
        }
        let idx = self.index(c);
        if CellCode::from_i8(self.cells[idx]) == Some(CellCode::Obstacle) {
            return Ok(());
        }
        self.cells[idx] = code.as_i8();
        Ok(())
    }

    pub fn raw_cells(&self) -> &[i8] {
        &self.cells
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (GridCoord, CellCode)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, &v)| {
            let coord = GridCoord::new((i / self.cols) as i64, (i % self.cols) as i64);
            CellCode::from_i8(v).map(|code| (coord, code))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> Grid {
        Grid::new(vec![0, 0, 0, -1, 0, 2], 2, 3, 100.0, vec![]).unwrap()
    }

    #[test]
    fn coordinate_round_trip() {
        let edge = EdgeLengthCm::new(100.0).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let c = GridCoord::new(row, col);
                let p = grid_to_real(c, edge);
                assert_eq!(real_to_grid(p, edge), c);
            }
        }
    }

    #[test]
    fn boundary_coordinate_maps_into_lower_cell() {
        let edge = EdgeLengthCm::new(100.0).unwrap();
        // Exactly on the boundary between cell 0 and cell 1.
        let p = PhysicalPoint::new(100.0, 0.0);
        assert_eq!(real_to_grid(p, edge), GridCoord::new(1, 0));
    }

    #[test]
    fn rejects_illegal_cell_codes() {
        let err = Grid::new(vec![0, 5], 1, 2, 50.0, vec![]).unwrap_err();
        assert_eq!(err.kind(), "InvalidLayout");
    }

    #[test]
    fn rejects_shape_mismatch() {
        let err = Grid::new(vec![0, 0, 0], 2, 2, 50.0, vec![]).unwrap_err();
        assert_eq!(err.kind(), "InvalidLayout");
    }

    #[test]
    fn set_never_overwrites_an_obstacle() {
        let mut grid = small_grid();
        let obstacle = GridCoord::new(1, 0);
        assert_eq!(grid.get(obstacle), Some(CellCode::Obstacle));
        grid.set(obstacle, CellCode::Poi).unwrap();
        assert_eq!(grid.get(obstacle), Some(CellCode::Obstacle));
    }

    #[test]
    fn walkability_excludes_shelves_and_obstacles() {
        let grid = small_grid();
        assert!(grid.is_walkable(GridCoord::new(0, 0)));
        assert!(!grid.is_walkable(GridCoord::new(1, 0))); // obstacle
        assert!(!grid.is_walkable(GridCoord::new(1, 2))); // shelf
    }
}
