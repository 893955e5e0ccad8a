//! Physical-to-grid POI mapping and placement validation.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::grid::{real_to_grid, CellCode, Grid, GridCoord, PhysicalPoint};

/// Per-POI validation outcome, used by both the fail-fast mapping path and
/// the `/validate_poi_placement` diagnostic endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum POIStatus {
    Ok,
    OutOfBounds,
    OnObstacle,
    OnShelf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct POIValidation {
    pub index: usize,
    pub physical: PhysicalPoint,
    pub grid: GridCoord,
    pub status: POIStatus,
}

pub struct POIMapping {
    pub poi_grid: Vec<GridCoord>,
    pub grid_with_poi: Grid,
    pub distance_threshold_grid: f64,
    pub summary: Vec<POIValidation>,
}

pub struct POIMapper;

impl POIMapper {
    /// Convert and validate every POI without failing on the first bad one;
    /// used by `/validate_poi_placement` to report a full summary.
    pub fn validate(grid: &Grid, poi_physical: &[PhysicalPoint]) -> Vec<POIValidation> {
        let edge = grid.edge_length_cm();
        poi_physical
            .iter()
            .enumerate()
            .map(|(index, &physical)| {
                let coord = real_to_grid(physical, edge);
                let status = if !grid.in_bounds(coord) {
                    POIStatus::OutOfBounds
                } else {
                    match grid.get(coord) {
                        Some(CellCode::Obstacle) => POIStatus::OnObstacle,
                        Some(CellCode::Shelf) => POIStatus::OnShelf,
                        _ => POIStatus::Ok,
                    }
                };
                POIValidation {
                    index,
                    physical,
                    grid: coord,
                    status,
                }
            })
            .collect()
    }

    /// Map POIs onto `grid`, imprint markers, and fail fast on the first
    /// invalid placement (index order).
    pub fn map(
        grid: &Grid,
        poi_physical: &[PhysicalPoint],
        distance_threshold_cm: f64,
    ) -> Result<POIMapping> {
        let summary = Self::validate(grid, poi_physical);

        for v in &summary {
            match v.status {
                POIStatus::OutOfBounds => {
                    return Err(EngineError::POIOutOfBounds {
                        index: v.index,
                        x: v.physical.x,
                        y: v.physical.y,
                    })
                }
                POIStatus::OnObstacle => {
                    return Err(EngineError::POIOnObstacle {
                        index: v.index,
                        x: v.physical.x,
                        y: v.physical.y,
                    })
                }
                POIStatus::OnShelf => {
                    return Err(EngineError::POIOnShelf {
                        index: v.index,
                        x: v.physical.x,
                        y: v.physical.y,
                    })
                }
                POIStatus::Ok => {}
            }
        }

        let mut grid_with_poi = grid.clone();
        let mut poi_grid = Vec::with_capacity(summary.len());
        for v in &summary {
            grid_with_poi.set(v.grid, CellCode::Poi)?;
            poi_grid.push(v.grid);
        }

        let distance_threshold_grid = distance_threshold_cm / grid.edge_length_cm().get();

        Ok(POIMapping {
            poi_grid,
            grid_with_poi,
            distance_threshold_grid,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        // 2x2, edge 100cm, one obstacle at (1,0), one shelf at (1,1).
        Grid::new(vec![0, 0, -1, 2], 2, 2, 100.0, vec![]).unwrap()
    }

    #[test]
    fn valid_pois_are_imprinted_and_not_overwritten_elsewhere() {
        let grid = sample_grid();
        let pois = vec![PhysicalPoint::new(50.0, 50.0)];
        let mapping = POIMapper::map(&grid, &pois, 2000.0).unwrap();

        assert_eq!(mapping.poi_grid, vec![GridCoord::new(0, 0)]);
        assert_eq!(mapping.grid_with_poi.get(GridCoord::new(0, 0)), Some(CellCode::Poi));
        // Everything else in the imprinted grid matches the original.
        assert_eq!(mapping.grid_with_poi.get(GridCoord::new(0, 1)), grid.get(GridCoord::new(0, 1)));
        assert_eq!(mapping.grid_with_poi.get(GridCoord::new(1, 0)), grid.get(GridCoord::new(1, 0)));
        assert_eq!(mapping.grid_with_poi.get(GridCoord::new(1, 1)), grid.get(GridCoord::new(1, 1)));
    }

    #[test]
    fn out_of_bounds_poi_is_rejected() {
        let grid = sample_grid();
        let pois = vec![PhysicalPoint::new(5000.0, 5000.0)];
        let err = POIMapper::map(&grid, &pois, 2000.0).unwrap_err();
        assert_eq!(err.kind(), "POIOutOfBounds");
    }

    #[test]
    fn poi_on_obstacle_is_rejected() {
        let grid = sample_grid();
        let pois = vec![PhysicalPoint::new(150.0, 50.0)];
        let err = POIMapper::map(&grid, &pois, 2000.0).unwrap_err();
        assert_eq!(err.kind(), "POIOnObstacle");
    }

    #[test]
    fn poi_on_shelf_is_rejected() {
        let grid = sample_grid();
        let pois = vec![PhysicalPoint::new(150.0, 150.0)];
        let err = POIMapper::map(&grid, &pois, 2000.0).unwrap_err();
        assert_eq!(err.kind(), "POIOnShelf");
    }

    #[test]
    fn distance_threshold_is_converted_to_grid_units() {
        let grid = sample_grid();
        let pois = vec![PhysicalPoint::new(50.0, 50.0)];
        let mapping = POIMapper::map(&grid, &pois, 2000.0).unwrap();
        assert_eq!(mapping.distance_threshold_grid, 20.0);
    }

    #[test]
    fn validate_reports_all_pois_without_failing() {
        let grid = sample_grid();
        let pois = vec![
            PhysicalPoint::new(50.0, 50.0),
            PhysicalPoint::new(150.0, 50.0),
            PhysicalPoint::new(150.0, 150.0),
        ];
        let summary = POIMapper::validate(&grid, &pois);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].status, POIStatus::Ok);
        assert_eq!(summary[1].status, POIStatus::OnObstacle);
        assert_eq!(summary[2].status, POIStatus::OnShelf);
    }
}
