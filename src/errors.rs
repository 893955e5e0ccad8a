//! Error taxonomy for the path-optimization engine.
//!
//! One enum covers every failure mode: validation errors that become 422s,
//! IO/internal errors that become 500s, and `AlgorithmUnavailable`, which
//! never reaches a caller as an error (the Coordinator substitutes A* and
//! annotates the stats instead).

use std::fmt;

#[derive(Debug, Clone)]
pub enum EngineError {
    /// Layout payload is unreadable or contains illegal cell codes.
    InvalidLayout(String),

    /// Cannot read or write a layout or SVG file.
    StorageIO(String),

    /// Optimization requested with no layout uploaded, or the referenced
    /// file is missing.
    NoLayout,

    /// Optimization requested with fewer than 2 POIs.
    TooFewPOIs { got: usize },

    /// POI physical coordinate falls outside the grid.
    POIOutOfBounds { index: usize, x: f64, y: f64 },

    /// POI maps onto a hard-obstacle cell.
    POIOnObstacle { index: usize, x: f64, y: f64 },

    /// POI maps onto a shelf cell (non-walkable, see design notes).
    POIOnShelf { index: usize, x: f64, y: f64 },

    /// Distance matrix has a non-finite diagonal entry.
    InvalidMatrix(String),

    /// Requested pathfinding variant isn't supported. The Coordinator
    /// catches this itself and never lets it escape to a response; it
    /// exists so the fallback substitution has something concrete to log.
    AlgorithmUnavailable(String),

    /// SVG generation couldn't persist its output.
    RenderIO(String),

    /// Catch-all for unexpected conditions.
    Internal(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidLayout(msg) => write!(f, "invalid layout: {msg}"),
            EngineError::StorageIO(msg) => write!(f, "storage IO error: {msg}"),
            EngineError::NoLayout => write!(f, "no layout has been uploaded"),
            EngineError::TooFewPOIs { got } => {
                write!(f, "need at least 2 POIs, got {got}")
            }
            EngineError::POIOutOfBounds { index, x, y } => {
                write!(f, "POI {index} at ({x}, {y}) is out of bounds")
            }
            EngineError::POIOnObstacle { index, x, y } => {
                write!(f, "POI {index} at ({x}, {y}) lands on an obstacle")
            }
            EngineError::POIOnShelf { index, x, y } => {
                write!(f, "POI {index} at ({x}, {y}) lands on a shelf")
            }
            EngineError::InvalidMatrix(msg) => write!(f, "invalid distance matrix: {msg}"),
            EngineError::AlgorithmUnavailable(name) => {
                write!(f, "pathfinding algorithm '{name}' is not available")
            }
            EngineError::RenderIO(msg) => write!(f, "SVG render IO error: {msg}"),
            EngineError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn invalid_layout<S: Into<String>>(msg: S) -> Self {
        Self::InvalidLayout(msg.into())
    }

    pub fn storage_io<S: Into<String>>(msg: S) -> Self {
        Self::StorageIO(msg.into())
    }

    pub fn invalid_matrix<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMatrix(msg.into())
    }

    pub fn render_io<S: Into<String>>(msg: S) -> Self {
        Self::RenderIO(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error should surface as, per the propagation
    /// policy: validation errors are 422, IO/internal are 500.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::InvalidLayout(_)
            | EngineError::NoLayout
            | EngineError::TooFewPOIs { .. }
            | EngineError::POIOutOfBounds { .. }
            | EngineError::POIOnObstacle { .. }
            | EngineError::POIOnShelf { .. }
            | EngineError::InvalidMatrix(_) => 422,

            EngineError::AlgorithmUnavailable(_) => 200, // never surfaces as an error

            EngineError::StorageIO(_) | EngineError::RenderIO(_) | EngineError::Internal(_) => 500,
        }
    }

    /// Machine-readable error kind, used in the `{ success: false, error }`
    /// response body.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidLayout(_) => "InvalidLayout",
            EngineError::StorageIO(_) => "StorageIO",
            EngineError::NoLayout => "NoLayout",
            EngineError::TooFewPOIs { .. } => "TooFewPOIs",
            EngineError::POIOutOfBounds { .. } => "POIOutOfBounds",
            EngineError::POIOnObstacle { .. } => "POIOnObstacle",
            EngineError::POIOnShelf { .. } => "POIOnShelf",
            EngineError::InvalidMatrix(_) => "InvalidMatrix",
            EngineError::AlgorithmUnavailable(_) => "AlgorithmUnavailable",
            EngineError::RenderIO(_) => "RenderIO",
            EngineError::Internal(_) => "Internal",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::StorageIO(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::InvalidLayout(format!("JSON error: {e}"))
    }
}

impl From<Box<bincode::ErrorKind>> for EngineError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        EngineError::InvalidLayout(format!("binary decode error: {e}"))
    }
}

/// Helper macro mirroring a common guard-clause pattern: bail with an error
/// unless a condition holds.
#[macro_export]
macro_rules! ensure {
    ($condition:expr, $error:expr) => {
        if !$condition {
            return Err($error);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_422() {
        assert_eq!(EngineError::NoLayout.http_status(), 422);
        assert_eq!(EngineError::TooFewPOIs { got: 1 }.http_status(), 422);
    }

    #[test]
    fn io_errors_are_500() {
        assert_eq!(EngineError::storage_io("disk full").http_status(), 500);
        assert_eq!(EngineError::render_io("no space").http_status(), 500);
    }

    #[test]
    fn algorithm_unavailable_never_surfaces_as_error_status() {
        assert_eq!(
            EngineError::AlgorithmUnavailable("jps".into()).http_status(),
            200
        );
    }
}
