use gomoku_core::{GridCell, Stone};

/// Move selection and board bookkeeping, as seen by the turn coordinator.
///
/// The engine holds the authoritative board. It is mutated only from the
/// coordinator, on the vision thread.
pub trait GameEngine {
    /// Record a stone. Off-board cells are ignored.
    fn update_board(&mut self, cell: GridCell, stone: Stone);

    /// Whether `stone` has five or more in a row.
    fn check_win(&self, stone: Stone) -> bool;

    fn count_pieces(&self, stone: Stone) -> usize;

    /// The engine's next move for its own color, `None` when the board is
    /// full.
    fn best_move(&mut self) -> Option<GridCell>;
}

impl<E: GameEngine + ?Sized> GameEngine for Box<E> {
    fn update_board(&mut self, cell: GridCell, stone: Stone) {
        (**self).update_board(cell, stone)
    }

    fn check_win(&self, stone: Stone) -> bool {
        (**self).check_win(stone)
    }

    fn count_pieces(&self, stone: Stone) -> usize {
        (**self).count_pieces(stone)
    }

    fn best_move(&mut self) -> Option<GridCell> {
        (**self).best_move()
    }
}
