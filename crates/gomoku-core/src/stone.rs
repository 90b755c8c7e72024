use serde::{Deserialize, Serialize};
use std::fmt;

/// Stone color, which doubles as the player identity. Black moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    #[inline]
    pub fn other(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    #[inline]
    pub fn is_first_mover(self) -> bool {
        self == Stone::Black
    }

    /// Whose turn it is after `placed` stones are on the board.
    #[inline]
    pub fn to_move(placed: usize) -> Stone {
        if placed % 2 == 0 {
            Stone::Black
        } else {
            Stone::White
        }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stone::Black => "black",
            Stone::White => "white",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_alternates_from_black() {
        assert_eq!(Stone::to_move(0), Stone::Black);
        assert_eq!(Stone::to_move(1), Stone::White);
        assert_eq!(Stone::to_move(6), Stone::Black);
        assert_eq!(Stone::Black.other(), Stone::White);
        assert!(Stone::to_move(4).is_first_mover());
        assert!(!Stone::White.is_first_mover());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Stone::White).expect("serialize");
        assert_eq!(json, "\"white\"");
    }
}
