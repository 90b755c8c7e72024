use std::sync::Mutex;

use gomoku_core::{GridCell, GridSize, MoveSink, PieceEvent, PieceListener, Stone};
use gomoku_game::{GameEngine, GameStatus, GomokuEngine, TurnCoordinator};

#[derive(Default)]
struct Queue(Mutex<Vec<GridCell>>);

impl Queue {
    fn moves(&self) -> Vec<GridCell> {
        self.0.lock().expect("lock").clone()
    }
}

impl MoveSink for Queue {
    fn enqueue_move(&self, cell: GridCell) -> bool {
        self.0.lock().expect("lock").push(cell);
        true
    }
}

/// A human who plays the first free cell of a fixed script.
fn next_human_cell(engine: &GomokuEngine, script: &[(u8, u8)]) -> Option<GridCell> {
    script
        .iter()
        .map(|&(r, c)| GridCell::new(r, c))
        .find(|&c| engine.stone_at(c).is_none())
}

#[test]
fn alternating_play_keeps_parity_and_echoes() {
    let queue = Queue::default();
    let engine = GomokuEngine::new(GridSize::THIRTEEN, Stone::White);
    let mut coordinator = TurnCoordinator::new(engine, &queue, Stone::White);

    let script = [(0, 0), (0, 12), (12, 0), (12, 12), (0, 6), (6, 0), (12, 6), (6, 12)];
    for turn in 0..4 {
        let cell = next_human_cell(coordinator.engine(), &script).expect("script has room");
        coordinator.on_piece_confirmed(&PieceEvent {
            cell,
            stone: Stone::Black,
        });
        let moves = queue.moves();
        assert_eq!(moves.len(), turn + 1);

        // Vision eventually sees the robot's stone.
        let robot_cell = *moves.last().expect("one move per human stone");
        coordinator.on_piece_confirmed(&PieceEvent {
            cell: robot_cell,
            stone: Stone::White,
        });
        assert_eq!(coordinator.pending_echoes().count(), 0);
        assert_eq!(coordinator.stones_on_board(), 2 * (turn + 1));
    }
    assert_eq!(coordinator.status(), GameStatus::InProgress);
}

#[test]
fn delayed_echo_does_not_break_parity() {
    let queue = Queue::default();
    let engine = GomokuEngine::new(GridSize::NINE, Stone::White);
    let mut coordinator = TurnCoordinator::new(engine, &queue, Stone::White);

    coordinator.handle(&PieceEvent {
        cell: GridCell::new(0, 0),
        stone: Stone::Black,
    });
    // The human moves again before the robot stone is confirmed.
    coordinator.handle(&PieceEvent {
        cell: GridCell::new(8, 8),
        stone: Stone::Black,
    });
    assert_eq!(queue.moves().len(), 2);

    for cell in queue.moves() {
        coordinator.handle(&PieceEvent {
            cell,
            stone: Stone::White,
        });
    }
    assert_eq!(coordinator.engine().count_pieces(Stone::White), 2);
    assert_eq!(coordinator.engine().count_pieces(Stone::Black), 2);
    assert_eq!(queue.moves().len(), 2);
}

#[test]
fn black_robot_opens_and_answers() {
    let queue = Queue::default();
    let engine = GomokuEngine::new(GridSize::NINE, Stone::Black);
    let mut coordinator = TurnCoordinator::new(engine, &queue, Stone::Black);

    let opening = coordinator.begin().expect("black opens");
    coordinator.handle(&PieceEvent {
        cell: opening,
        stone: Stone::Black,
    });
    coordinator.handle(&PieceEvent {
        cell: GridCell::new(0, 0),
        stone: Stone::White,
    });
    assert_eq!(queue.moves().len(), 2);
    assert!(queue.moves().iter().all(|&c| c != GridCell::new(0, 0)));
}
