pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod grid;
pub mod hash;
pub mod layout;
pub mod pathfinding;
pub mod poi;
pub mod sequencer;
pub mod svg;
pub mod web_server;

pub use coordinator::{Coordinator, OptimizeRequest, OptimizeResponse};
pub use errors::{EngineError, Result};
pub use grid::Grid;
pub use hash::LayoutHash;
pub use layout::{LayoutManager, LayoutStore};
pub use web_server::Server;
