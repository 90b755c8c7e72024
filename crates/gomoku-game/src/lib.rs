//! Game side of the Gomoku robot: the engine interface, a reference engine
//! and the turn coordinator that connects vision events to arm moves.
//!
//! ```
//! use gomoku_core::{GridCell, GridSize, MoveSink, PieceEvent, Stone};
//! use gomoku_game::{GomokuEngine, TurnCoordinator};
//! use std::sync::Mutex;
//!
//! struct Log(Mutex<Vec<GridCell>>);
//! impl MoveSink for Log {
//!     fn enqueue_move(&self, cell: GridCell) -> bool {
//!         self.0.lock().unwrap().push(cell);
//!         true
//!     }
//! }
//!
//! let engine = GomokuEngine::new(GridSize::NINE, Stone::White);
//! let mut coordinator = TurnCoordinator::new(engine, Log(Mutex::new(vec![])), Stone::White);
//! let reply = coordinator.handle(&PieceEvent { cell: GridCell::new(4, 4), stone: Stone::Black });
//! assert!(reply.is_some());
//! ```

mod coordinator;
mod engine;
mod gomoku;

pub use coordinator::{GameStatus, TurnCoordinator};
pub use engine::GameEngine;
pub use gomoku::{EngineParams, GomokuEngine};
