//! Turn coordination between confirmed pieces, the engine and the arm.

use std::collections::HashSet;

use gomoku_core::{GridCell, MoveSink, PieceEvent, PieceListener, Stone};
use serde::{Deserialize, Serialize};

use crate::engine::GameEngine;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Won(Stone),
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Won(_))
    }
}

/// Feeds confirmed pieces to the engine and hands robot moves to the arm.
///
/// Parity decides whose turn it is: with `T` stones on the board the robot
/// moves when `T` is even and it plays Black, or `T` is odd and it plays
/// White. At most one move is enqueued per event.
pub struct TurnCoordinator<E, S> {
    engine: E,
    sink: S,
    robot: Stone,
    status: GameStatus,
    /// Robot moves already recorded in the engine whose vision echo has not
    /// arrived yet.
    pending_echoes: HashSet<GridCell>,
}

impl<E: GameEngine, S: MoveSink> TurnCoordinator<E, S> {
    pub fn new(engine: E, sink: S, robot: Stone) -> Self {
        Self {
            engine,
            sink,
            robot,
            status: GameStatus::InProgress,
            pending_echoes: HashSet::new(),
        }
    }

    pub fn robot(&self) -> Stone {
        self.robot
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Robot moves not yet seen by the camera.
    pub fn pending_echoes(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.pending_echoes.iter().copied()
    }

    pub fn into_parts(self) -> (E, S) {
        (self.engine, self.sink)
    }

    pub fn stones_on_board(&self) -> usize {
        self.engine.count_pieces(Stone::Black) + self.engine.count_pieces(Stone::White)
    }

    /// Black moves on even stone counts.
    pub fn is_robot_turn(&self) -> bool {
        self.robot.is_first_mover() == (self.stones_on_board() % 2 == 0)
    }

    /// Let the robot open the game, or catch up when it is already its turn.
    /// Returns the enqueued move.
    pub fn begin(&mut self) -> Option<GridCell> {
        if self.status.is_over() || !self.is_robot_turn() {
            return None;
        }
        log::info!("robot plays {} and opens the game", self.robot);
        self.play_robot_move()
    }

    /// Process one confirmed piece. Returns the robot move enqueued in
    /// response, if any.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), fields(cell = %event.cell, stone = %event.stone)))]
    pub fn handle(&mut self, event: &PieceEvent) -> Option<GridCell> {
        if event.stone == self.robot && self.pending_echoes.remove(&event.cell) {
            log::debug!("robot stone at {} confirmed by vision", event.cell);
            return None;
        }

        log::info!("{} stone placed at {}", event.stone, event.cell);
        self.engine.update_board(event.cell, event.stone);

        if self.status.is_over() {
            log::debug!("game already over; not moving");
            return None;
        }
        if self.engine.check_win(event.stone) {
            self.finish(event.stone);
            return None;
        }
        if !self.is_robot_turn() {
            log::debug!(
                "waiting for {} ({} stones on board)",
                self.robot.other(),
                self.stones_on_board()
            );
            return None;
        }
        self.play_robot_move()
    }

    fn play_robot_move(&mut self) -> Option<GridCell> {
        let Some(cell) = self.engine.best_move() else {
            log::warn!("engine has no move; board is full");
            return None;
        };
        if !self.sink.enqueue_move(cell) {
            log::error!("arm rejected robot move {cell}");
            return None;
        }
        log::info!("robot ({}) moves to {cell}", self.robot);
        self.engine.update_board(cell, self.robot);
        self.pending_echoes.insert(cell);

        if self.engine.check_win(self.robot) {
            self.finish(self.robot);
        }
        Some(cell)
    }

    fn finish(&mut self, winner: Stone) {
        self.status = GameStatus::Won(winner);
        if winner == self.robot {
            log::info!("game over: robot ({winner}) wins");
        } else {
            log::info!("game over: {winner} wins");
        }
    }
}

impl<E: GameEngine, S: MoveSink> PieceListener for TurnCoordinator<E, S> {
    fn on_piece_confirmed(&mut self, event: &PieceEvent) {
        self.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GomokuEngine;
    use gomoku_core::GridSize;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        moves: RefCell<Vec<GridCell>>,
        reject: bool,
    }

    impl MoveSink for RecordingSink {
        fn enqueue_move(&self, cell: GridCell) -> bool {
            if self.reject {
                return false;
            }
            self.moves.borrow_mut().push(cell);
            true
        }
    }

    fn coordinator(robot: Stone) -> TurnCoordinator<GomokuEngine, RecordingSink> {
        TurnCoordinator::new(
            GomokuEngine::new(GridSize::NINE, robot),
            RecordingSink::default(),
            robot,
        )
    }

    fn event(row: u8, col: u8, stone: Stone) -> PieceEvent {
        PieceEvent {
            cell: GridCell::new(row, col),
            stone,
        }
    }

    #[test]
    fn replies_to_the_first_human_stone() {
        let mut c = coordinator(Stone::White);
        let reply = c.handle(&event(4, 4, Stone::Black)).expect("robot replies");

        assert_eq!(*c.sink().moves.borrow(), vec![reply]);
        assert_eq!(c.engine().stone_at(reply), Some(Stone::White));
        assert_eq!(c.stones_on_board(), 2);
        assert!(!c.is_robot_turn());
    }

    #[test]
    fn parity_follows_robot_color() {
        for robot in [Stone::Black, Stone::White] {
            let mut c = coordinator(robot);
            for t in 0..6u8 {
                let robot_turn = (t % 2 == 0) == (robot == Stone::Black);
                assert_eq!(c.is_robot_turn(), robot_turn, "{robot} T={t}");
                c.engine.update_board(GridCell::new(t, 0), Stone::to_move(t as usize));
            }
        }
    }

    #[test]
    fn robot_echo_is_acknowledged_once() {
        let mut c = coordinator(Stone::White);
        let reply = c.handle(&event(4, 4, Stone::Black)).expect("robot replies");
        assert_eq!(c.pending_echoes().collect::<Vec<_>>(), vec![reply]);

        assert_eq!(c.handle(&PieceEvent { cell: reply, stone: Stone::White }), None);
        assert_eq!(c.pending_echoes().count(), 0);
        assert_eq!(c.stones_on_board(), 2);
        assert_eq!(c.sink().moves.borrow().len(), 1);

        // The next human stone gets the next reply.
        assert!(c.handle(&event(0, 0, Stone::Black)).is_some());
        assert_eq!(c.sink().moves.borrow().len(), 2);
    }

    #[test]
    fn out_of_turn_stone_is_recorded_without_a_move() {
        let mut c = coordinator(Stone::Black);
        // Black robot at T=0 waits for begin(); a white stone makes T odd.
        assert_eq!(c.handle(&event(2, 2, Stone::White)), None);
        assert_eq!(c.engine().count_pieces(Stone::White), 1);
        assert!(c.sink().moves.borrow().is_empty());
    }

    #[test]
    fn begin_opens_for_a_black_robot() {
        let mut c = coordinator(Stone::Black);
        assert_eq!(c.begin(), Some(GridCell::new(4, 4)));
        assert_eq!(c.begin(), None);

        let mut w = coordinator(Stone::White);
        assert_eq!(w.begin(), None);
        assert!(w.sink().moves.borrow().is_empty());
    }

    #[test]
    fn human_win_stops_robot_moves() {
        let mut c = coordinator(Stone::White);
        for col in 0..4 {
            c.engine.update_board(GridCell::new(0, col), Stone::Black);
            c.engine.update_board(GridCell::new(8, col * 2), Stone::White);
        }
        assert_eq!(c.handle(&event(0, 4, Stone::Black)), None);
        assert_eq!(c.status(), GameStatus::Won(Stone::Black));

        // Updates keep flowing, moves do not.
        assert_eq!(c.handle(&event(5, 5, Stone::White)), None);
        assert_eq!(c.handle(&event(6, 6, Stone::Black)), None);
        assert_eq!(c.stones_on_board(), 11);
        assert!(c.sink().moves.borrow().is_empty());
    }

    #[test]
    fn robot_win_ends_the_game() {
        let mut c = coordinator(Stone::White);
        for col in 0..4 {
            c.engine.update_board(GridCell::new(4, col), Stone::White);
            c.engine.update_board(GridCell::new(col * 2, 8), Stone::Black);
        }
        let reply = c.handle(&event(8, 0, Stone::Black)).expect("robot moves");
        assert_eq!(reply, GridCell::new(4, 4));
        assert_eq!(c.status(), GameStatus::Won(Stone::White));
        assert_eq!(c.handle(&event(8, 8, Stone::Black)), None);
    }

    #[test]
    fn rejected_move_is_not_recorded() {
        let mut c = TurnCoordinator::new(
            GomokuEngine::new(GridSize::NINE, Stone::White),
            RecordingSink {
                reject: true,
                ..RecordingSink::default()
            },
            Stone::White,
        );
        assert_eq!(c.handle(&event(4, 4, Stone::Black)), None);
        assert_eq!(c.stones_on_board(), 1);
        assert_eq!(c.pending_echoes().count(), 0);
    }

    #[test]
    fn works_as_a_piece_listener() {
        let mut c = coordinator(Stone::White);
        let listener: &mut dyn PieceListener = &mut c;
        listener.on_piece_confirmed(&event(3, 3, Stone::Black));
        assert_eq!(c.sink().moves.borrow().len(), 1);
    }
}
