//! Core types shared by the Gomoku robot crates.
//!
//! This crate is intentionally small: board coordinates, stone colors, the
//! confirmed-piece event boundary and the move handoff trait. It does *not*
//! depend on any image, actuator or engine type.

mod event;
mod grid;
mod logger;
mod stone;

pub use event::{MoveSink, PieceEvent, PieceListener};
pub use grid::{GridCell, GridSize, GridSizeError};
pub use stone::Stone;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
