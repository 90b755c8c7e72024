//! Reference Gomoku engine: five-in-a-row detection and a one-ply line
//! pattern heuristic.
//!
//! Every empty cell within two lines of an existing stone is scored twice:
//! once as if the engine played there (attack) and once as if the opponent
//! did (defense). Each of the four line directions contributes according to
//! the run length it would create and how many of its ends stay open.

use gomoku_core::{GridCell, GridSize, Stone};
use serde::{Deserialize, Serialize};

use crate::engine::GameEngine;

/// Row/column steps of the four line directions.
const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

const WIN_LENGTH: usize = 5;

/// Heuristic weights of [`GomokuEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Scale of the defensive score relative to the attacking score.
    pub defense_weight: f32,
    /// Penalty per line of distance from the board center; breaks ties.
    pub center_weight: f32,
    /// Empty cells farther than this from every stone are not considered.
    pub candidate_radius: u8,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            defense_weight: 0.9,
            center_weight: 0.5,
            candidate_radius: 2,
        }
    }
}

/// Shape of the line a stone would complete in one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LineShape {
    length: usize,
    open_ends: u8,
}

impl LineShape {
    fn score(self) -> f32 {
        if self.length >= WIN_LENGTH {
            return 1_000_000.0;
        }
        match (self.length, self.open_ends) {
            (_, 0) => 0.0,
            (4, 2) => 100_000.0,
            (4, _) => 10_000.0,
            (3, 2) => 5_000.0,
            (3, _) => 500.0,
            (2, 2) => 200.0,
            (2, _) => 50.0,
            (_, 2) => 10.0,
            _ => 2.0,
        }
    }
}

/// Board plus move selection for the robot's color.
#[derive(Clone, Debug)]
pub struct GomokuEngine {
    size: GridSize,
    player: Stone,
    params: EngineParams,
    board: Vec<Option<Stone>>,
}

impl GomokuEngine {
    /// Empty board; `player` is the color [`GameEngine::best_move`] plays.
    pub fn new(size: GridSize, player: Stone) -> Self {
        Self::with_params(size, player, EngineParams::default())
    }

    pub fn with_params(size: GridSize, player: Stone, params: EngineParams) -> Self {
        Self {
            size,
            player,
            params,
            board: vec![None; size.cell_count()],
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn player(&self) -> Stone {
        self.player
    }

    pub fn stone_at(&self, cell: GridCell) -> Option<Stone> {
        if !self.size.contains(cell) {
            return None;
        }
        self.board[self.size.index(cell)]
    }

    fn at(&self, row: i32, col: i32) -> Option<Option<Stone>> {
        self.size.cell(row, col).map(|c| self.board[self.size.index(c)])
    }

    /// Stones of `stone` in a row through `cell` along `(dr, dc)`, counting
    /// `cell` itself whatever it holds.
    fn line_through(&self, cell: GridCell, (dr, dc): (i32, i32), stone: Stone) -> LineShape {
        let mut length = 1;
        let mut open_ends = 0;
        for sign in [1, -1] {
            let (mut r, mut c) = (cell.row as i32, cell.col as i32);
            loop {
                r += sign * dr;
                c += sign * dc;
                match self.at(r, c) {
                    Some(Some(s)) if s == stone => length += 1,
                    Some(None) => {
                        open_ends += 1;
                        break;
                    }
                    _ => break,
                }
            }
        }
        LineShape { length, open_ends }
    }

    fn completes_five(&self, cell: GridCell, stone: Stone) -> bool {
        DIRECTIONS
            .iter()
            .any(|&d| self.line_through(cell, d, stone).length >= WIN_LENGTH)
    }

    fn shape_score(&self, cell: GridCell, stone: Stone) -> f32 {
        DIRECTIONS
            .iter()
            .map(|&d| self.line_through(cell, d, stone).score())
            .sum()
    }

    fn center_distance(&self, cell: GridCell) -> f32 {
        let mid = (self.size.lines() - 1) as f32 / 2.0;
        (cell.row as f32 - mid).abs().max((cell.col as f32 - mid).abs())
    }

    fn near_stone(&self, cell: GridCell) -> bool {
        let radius = self.params.candidate_radius as i32;
        let (row, col) = (cell.row as i32, cell.col as i32);
        (-radius..=radius).any(|dr| {
            (-radius..=radius).any(|dc| matches!(self.at(row + dr, col + dc), Some(Some(_))))
        })
    }

    /// Empty cells worth scoring, in row-major order.
    fn candidates(&self) -> Vec<GridCell> {
        let empty: Vec<GridCell> = self
            .size
            .cells()
            .filter(|&c| self.board[self.size.index(c)].is_none())
            .collect();
        if empty.len() == self.board.len() {
            let mid = (self.size.lines() - 1) / 2;
            return vec![GridCell::new(mid, mid)];
        }
        let near: Vec<GridCell> = empty.iter().copied().filter(|&c| self.near_stone(c)).collect();
        if near.is_empty() {
            empty
        } else {
            near
        }
    }

    /// Heuristic value of playing `cell` for the engine's color.
    pub fn evaluate(&self, cell: GridCell) -> f32 {
        let attack = self.shape_score(cell, self.player);
        let defense = self.shape_score(cell, self.player.other());
        attack + self.params.defense_weight * defense
            - self.params.center_weight * self.center_distance(cell)
    }
}

impl GameEngine for GomokuEngine {
    fn update_board(&mut self, cell: GridCell, stone: Stone) {
        if !self.size.contains(cell) {
            log::warn!("ignoring {stone} stone at {cell}: off the board");
            return;
        }
        let slot = &mut self.board[self.size.index(cell)];
        match *slot {
            Some(existing) if existing != stone => {
                log::warn!("{cell} changes from {existing} to {stone}");
            }
            Some(_) => log::debug!("{stone} stone at {cell} already recorded"),
            None => {}
        }
        *slot = Some(stone);
    }

    fn check_win(&self, stone: Stone) -> bool {
        self.size
            .cells()
            .filter(|&c| self.board[self.size.index(c)] == Some(stone))
            .any(|c| self.completes_five(c, stone))
    }

    fn count_pieces(&self, stone: Stone) -> usize {
        self.board.iter().filter(|&&s| s == Some(stone)).count()
    }

    fn best_move(&mut self) -> Option<GridCell> {
        let candidates = self.candidates();

        // An immediate win beats any defensive value.
        if let Some(&win) = candidates
            .iter()
            .find(|&&c| self.completes_five(c, self.player))
        {
            return Some(win);
        }

        let mut best: Option<(GridCell, f32)> = None;
        for cell in candidates {
            let score = self.evaluate(cell);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((cell, score));
            }
        }
        let (cell, score) = best?;
        log::debug!("{} engine picks {cell} (score {score:.1})", self.player);
        Some(cell)
    }
}
