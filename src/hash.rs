//! Content hashing for layouts. The hash is the primary key for every
//! on-disk artifact (layout file, SVG, metadata sidecar), so it has to be
//! stable across Rust versions and process restarts — it is computed by a
//! fixed FNV-1a variant here rather than `std`'s `DefaultHasher` (whose bit
//! pattern isn't part of its stable API) or a third-party hasher crate
//! (whose algorithm could change between versions without notice).

use std::fmt;

use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutHash(u64);

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl LayoutHash {
    /// Hash the grid's cell bytes concatenated with the edge length's bytes.
    pub fn compute(grid: &Grid) -> Self {
        let mut bytes = Vec::with_capacity(grid.raw_cells().len() + 8 + 16);
        bytes.extend(grid.raw_cells().iter().map(|&c| c as u8));
        bytes.extend(grid.edge_length_cm().get().to_le_bytes());
        bytes.extend((grid.rows() as u64).to_le_bytes());
        bytes.extend((grid.cols() as u64).to_le_bytes());
        Self(fnv1a(&bytes))
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 16 {
            return None;
        }
        u64::from_str_radix(s, 16).ok().map(Self)
    }
}

impl fmt::Display for LayoutHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn grid(cells: Vec<i8>, rows: usize, cols: usize, edge: f64) -> Grid {
        Grid::new(cells, rows, cols, edge, vec![]).unwrap()
    }

    #[test]
    fn hash_is_stable_across_runs() {
        let g = grid(vec![0, 0, 0, 0], 2, 2, 100.0);
        let h1 = LayoutHash::compute(&g);
        let h2 = LayoutHash::compute(&g);
        assert_eq!(h1, h2);
        assert_eq!(h1.to_hex().len(), 16);
    }

    #[test]
    fn changing_a_cell_changes_the_hash() {
        let a = grid(vec![0, 0, 0, 0], 2, 2, 100.0);
        let b = grid(vec![0, 0, 0, -1], 2, 2, 100.0);
        assert_ne!(LayoutHash::compute(&a), LayoutHash::compute(&b));
    }

    #[test]
    fn changing_edge_length_changes_the_hash() {
        let a = grid(vec![0, 0, 0, 0], 2, 2, 100.0);
        let b = grid(vec![0, 0, 0, 0], 2, 2, 150.0);
        assert_ne!(LayoutHash::compute(&a), LayoutHash::compute(&b));
    }

    #[test]
    fn hex_round_trips() {
        let g = grid(vec![0, 1, -1, 2], 2, 2, 75.0);
        let h = LayoutHash::compute(&g);
        assert_eq!(LayoutHash::from_hex(&h.to_hex()), Some(h));
    }
}
