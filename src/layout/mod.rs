//! Layout intake, content-addressed persistence, and lazy SVG generation.

pub mod format;
pub mod manager;
pub mod store;

pub use manager::{EnsureSvgOutcome, LayoutManager};
pub use store::{LayoutStore, SaveOutcome};
