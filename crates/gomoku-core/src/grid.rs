use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical board intersection, `(row, col)`, 0-indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: u8,
    pub col: u8,
}

impl GridCell {
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Errors produced when building a [`GridSize`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GridSizeError {
    #[error("grid must have at least 3 lines per side (got {0})")]
    TooSmall(u8),
}

/// Number of lines per side of a square board (9 in production, 13 on the
/// larger board).
///
/// Camera space and robot space share the same size and are related by a
/// reversal of both axes, see [`GridSize::reverse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GridSize(u8);

impl GridSize {
    pub const NINE: GridSize = GridSize(9);
    pub const THIRTEEN: GridSize = GridSize(13);

    pub fn new(lines: u8) -> Result<Self, GridSizeError> {
        if lines < 3 {
            return Err(GridSizeError::TooSmall(lines));
        }
        Ok(Self(lines))
    }

    #[inline]
    pub fn lines(self) -> u8 {
        self.0
    }

    /// Total number of intersections.
    #[inline]
    pub fn cell_count(self) -> usize {
        self.0 as usize * self.0 as usize
    }

    #[inline]
    pub fn contains(self, cell: GridCell) -> bool {
        cell.row < self.0 && cell.col < self.0
    }

    /// Build a cell from signed indices, `None` when outside the board.
    pub fn cell(self, row: i32, col: i32) -> Option<GridCell> {
        let n = self.0 as i32;
        if (0..n).contains(&row) && (0..n).contains(&col) {
            Some(GridCell::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Map between camera space and robot space: `(r, c) -> (N-1-r, N-1-c)`.
    ///
    /// The mapping is an involution, so the same call converts in both
    /// directions. `cell` must be inside the board.
    #[inline]
    pub fn reverse(self, cell: GridCell) -> GridCell {
        let last = self.0 - 1;
        GridCell::new(last - cell.row, last - cell.col)
    }

    /// Row-major linear index, for flat per-cell storage.
    #[inline]
    pub fn index(self, cell: GridCell) -> usize {
        cell.row as usize * self.0 as usize + cell.col as usize
    }

    /// Iterate all cells in row-major order.
    pub fn cells(self) -> impl Iterator<Item = GridCell> {
        let n = self.0;
        (0..n).flat_map(move |row| (0..n).map(move |col| GridCell::new(row, col)))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::NINE
    }
}

impl TryFrom<u8> for GridSize {
    type Error = GridSizeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GridSize> for u8 {
    fn from(value: GridSize) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_is_an_involution() {
        for size in [GridSize::NINE, GridSize::THIRTEEN] {
            for cell in size.cells() {
                assert_eq!(size.reverse(size.reverse(cell)), cell);
            }
        }
    }

    #[test]
    fn reverse_maps_corners_and_keeps_center() {
        let n = GridSize::NINE;
        assert_eq!(n.reverse(GridCell::new(0, 0)), GridCell::new(8, 8));
        assert_eq!(n.reverse(GridCell::new(0, 8)), GridCell::new(8, 0));
        assert_eq!(n.reverse(GridCell::new(4, 4)), GridCell::new(4, 4));
    }

    #[test]
    fn signed_cell_respects_bounds() {
        let n = GridSize::NINE;
        assert_eq!(n.cell(8, 0), Some(GridCell::new(8, 0)));
        assert_eq!(n.cell(9, 0), None);
        assert_eq!(n.cell(0, -1), None);
        assert!(!n.contains(GridCell::new(3, 9)));
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert_eq!(GridSize::new(2), Err(GridSizeError::TooSmall(2)));
        assert!(serde_json::from_str::<GridSize>("1").is_err());
        let size: GridSize = serde_json::from_str("13").expect("valid size");
        assert_eq!(size, GridSize::THIRTEEN);
    }

    #[test]
    fn cells_are_row_major() {
        let n = GridSize::new(3).expect("size");
        let cells: Vec<_> = n.cells().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[1], GridCell::new(0, 1));
        assert_eq!(n.index(GridCell::new(2, 1)), 7);
    }
}
