//! Event boundary between perception, game logic and actuation.

use crate::{GridCell, Stone};
use serde::{Deserialize, Serialize};

/// A stone that passed the debounce threshold, in robot space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceEvent {
    pub cell: GridCell,
    pub stone: Stone,
}

/// Receiver of confirmed-piece events.
///
/// Listeners are invoked synchronously on the vision thread, in registration
/// order.
pub trait PieceListener {
    fn on_piece_confirmed(&mut self, event: &PieceEvent);
}

impl<F> PieceListener for F
where
    F: FnMut(&PieceEvent),
{
    fn on_piece_confirmed(&mut self, event: &PieceEvent) {
        self(event)
    }
}

/// Non-blocking handoff of robot moves to the actuation side.
///
/// Returns `false` when the move was rejected (out of range, worker stopped);
/// rejected moves are never queued.
pub trait MoveSink {
    fn enqueue_move(&self, cell: GridCell) -> bool;
}

impl<T: MoveSink + ?Sized> MoveSink for &T {
    fn enqueue_move(&self, cell: GridCell) -> bool {
        (**self).enqueue_move(cell)
    }
}

impl<T: MoveSink + ?Sized> MoveSink for std::sync::Arc<T> {
    fn enqueue_move(&self, cell: GridCell) -> bool {
        (**self).enqueue_move(cell)
    }
}
