//! Temporal filtering of per-frame stone observations.
//!
//! A stone becomes a [`PieceEvent`] only after it is seen with the same color
//! in `confirm_frames` consecutive processed frames. A cell that fired once
//! stays committed until [`Debouncer::reset`].

use std::collections::{BTreeMap, HashSet};

use gomoku_core::{GridCell, PieceEvent, Stone};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceParams {
    /// Consecutive frames required to confirm a stone.
    pub confirm_frames: u32,
}

impl Default for DebounceParams {
    fn default() -> Self {
        Self { confirm_frames: 5 }
    }
}

/// Tracking state of one cell that is currently observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceCandidate {
    pub color: Stone,
    pub consecutive_frames: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    params: DebounceParams,
    candidates: BTreeMap<GridCell, PieceCandidate>,
    committed: BTreeMap<GridCell, Stone>,
}

impl Debouncer {
    pub fn new(params: DebounceParams) -> Self {
        Self {
            params,
            candidates: BTreeMap::new(),
            committed: BTreeMap::new(),
        }
    }

    /// Feed the colored observations of one processed frame.
    ///
    /// Only the first observation of a cell in a frame counts. Candidates not
    /// observed in this frame are dropped. Returns the newly confirmed
    /// stones, ordered by cell.
    pub fn observe<I>(&mut self, observations: I) -> Vec<PieceEvent>
    where
        I: IntoIterator<Item = (GridCell, Stone)>,
    {
        let mut seen = HashSet::new();
        for (cell, stone) in observations {
            if !seen.insert(cell) {
                continue;
            }
            self.candidates
                .entry(cell)
                .and_modify(|c| {
                    if c.color == stone {
                        c.consecutive_frames = c.consecutive_frames.saturating_add(1);
                    } else {
                        *c = PieceCandidate {
                            color: stone,
                            consecutive_frames: 1,
                        };
                    }
                })
                .or_insert(PieceCandidate {
                    color: stone,
                    consecutive_frames: 1,
                });
        }
        self.candidates.retain(|cell, _| seen.contains(cell));

        let threshold = self.params.confirm_frames.max(1);
        let mut events = Vec::new();
        for (&cell, candidate) in &self.candidates {
            if candidate.consecutive_frames < threshold || self.committed.contains_key(&cell) {
                continue;
            }
            self.committed.insert(cell, candidate.color);
            log::debug!(
                "confirmed {} stone at {} after {} frames",
                candidate.color,
                cell,
                candidate.consecutive_frames
            );
            events.push(PieceEvent {
                cell,
                stone: candidate.color,
            });
        }
        events
    }

    /// Forget all candidates and committed cells.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.committed.clear();
    }

    pub fn candidate(&self, cell: GridCell) -> Option<&PieceCandidate> {
        self.candidates.get(&cell)
    }

    pub fn committed(&self) -> &BTreeMap<GridCell, Stone> {
        &self.committed
    }
}
