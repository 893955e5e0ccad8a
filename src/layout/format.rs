//! The on-disk layout container: a self-describing binary payload holding
//! the grid, its edge length, and any named zones.
//!
//! Shape: a `bincode`-encoded `LayoutPayload` struct, gzip-compressed with
//! `flate2`. `bincode` gives us a compact, versionable binary encoding of
//! the serde-derived struct without hand-rolling a length-prefixed format;
//! gzip keeps large grids small on disk, which matters once stores host
//! hundreds of uploaded layouts.

use std::collections::HashMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::grid::{Grid, Zone};
use crate::hash::LayoutHash;

/// Version tag so a future format change can special-case old payloads
/// instead of silently misreading them.
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutPayload {
    version: u16,
    rows: usize,
    cols: usize,
    cells: Vec<i8>,
    edge_length_cm: f64,
    zones: HashMap<String, ZonePoints>,
    /// Integrity attribute: the hash the uploader claims this payload has.
    /// Checked against the freshly computed hash on load; a mismatch fails
    /// decode rather than silently accepting tampered or corrupted bytes.
    layout_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ZonePoints {
    name: String,
    points: Vec<(f64, f64)>,
}

impl LayoutPayload {
    pub fn from_grid(grid: &Grid, claimed_hash: Option<String>) -> Self {
        let zones = grid
            .zones()
            .iter()
            .enumerate()
            .map(|(i, z)| {
                (
                    i.to_string(),
                    ZonePoints {
                        name: z.name.clone(),
                        points: z.points.iter().map(|p| (p.x, p.y)).collect(),
                    },
                )
            })
            .collect();

        Self {
            version: FORMAT_VERSION,
            rows: grid.rows(),
            cols: grid.cols(),
            cells: grid.raw_cells().to_vec(),
            edge_length_cm: grid.edge_length_cm().get(),
            zones,
            layout_hash: claimed_hash,
        }
    }

    pub fn into_grid(self) -> Result<Grid> {
        let zones: Vec<Zone> = self
            .zones
            .into_values()
            .map(|z| Zone {
                name: z.name,
                points: z
                    .points
                    .into_iter()
                    .map(|(x, y)| crate::grid::PhysicalPoint::new(x, y))
                    .collect(),
            })
            .collect();

        Grid::new(self.cells, self.rows, self.cols, self.edge_length_cm, zones)
    }

    pub fn claimed_hash(&self) -> Option<&str> {
        self.layout_hash.as_deref()
    }
}

/// Encode a grid into the compressed binary container.
pub fn encode(grid: &Grid, claimed_hash: Option<String>) -> Result<Vec<u8>> {
    let payload = LayoutPayload::from_grid(grid, claimed_hash);
    let raw = bincode::serialize(&payload)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| EngineError::storage_io(format!("compressing layout: {e}")))?;
    encoder
        .finish()
        .map_err(|e| EngineError::storage_io(format!("finishing layout compression: {e}")))
}

/// Decode a compressed binary container back into a grid.
pub fn decode(bytes: &[u8]) -> Result<Grid> {
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| EngineError::invalid_layout(format!("decompressing layout: {e}")))?;

    let payload: LayoutPayload = bincode::deserialize(&raw)?;
    if payload.version != FORMAT_VERSION {
        return Err(EngineError::invalid_layout(format!(
            "unsupported layout format version {}",
            payload.version
        )));
    }
    let claimed_hash = payload.claimed_hash().map(str::to_string);
    let grid = payload.into_grid()?;

    if let Some(claimed) = claimed_hash {
        let actual = LayoutHash::compute(&grid);
        if LayoutHash::from_hex(&claimed) != Some(actual) {
            return Err(EngineError::invalid_layout(format!(
                "layout_hash mismatch: claimed {claimed}, computed {actual}"
            )));
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, PhysicalPoint, Zone};

    #[test]
    fn round_trips_a_grid_with_zones() {
        let zones = vec![Zone {
            name: "Produce".to_string(),
            points: vec![PhysicalPoint::new(0.0, 0.0), PhysicalPoint::new(100.0, 200.0)],
        }];
        let grid = Grid::new(vec![0, 1, -1, 2], 2, 2, 50.0, zones).unwrap();
        let claimed = LayoutHash::compute(&grid).to_hex();

        let bytes = encode(&grid, Some(claimed)).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded, grid);
    }

    #[test]
    fn round_trips_without_a_claimed_hash() {
        let grid = Grid::new(vec![0, 1, -1, 2], 2, 2, 50.0, vec![]).unwrap();
        let bytes = encode(&grid, None).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn rejects_a_mismatched_claimed_hash() {
        let grid = Grid::new(vec![0, 0, 0, 0], 2, 2, 50.0, vec![]).unwrap();
        let bytes = encode(&grid, Some("deadbeefdeadbeef".to_string())).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), "InvalidLayout");
    }

    #[test]
    fn rejects_bad_version() {
        let grid = Grid::new(vec![0, 0], 1, 2, 50.0, vec![]).unwrap();
        let payload = LayoutPayload::from_grid(&grid, None);
        let mut raw = bincode::serialize(&payload).unwrap();
        // Corrupt the version field (first two bytes in bincode's fixint encoding).
        raw[0] = 0xff;
        raw[1] = 0xff;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let bytes = encoder.finish().unwrap();

        assert!(decode(&bytes).is_err());
    }
}
