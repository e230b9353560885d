// SPDX-License-Identifier: MIT OR Apache-2.0

//! goboard core - game-record engine
//!
//! This crate provides everything a shared Go board needs that does not
//! touch the network:
//! - Coordinates, stone sets and invertible board diffs
//! - Board representation with capture, legality and area scoring
//! - An arena-backed move tree with viewer and live-feed cursors
//! - SGF parsing, serialization and merging
//! - Frames describing what clients should redraw

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod board;
pub mod coord;
pub mod diff;
pub mod fields;
pub mod frame;
pub mod game;
pub mod scoring;
pub mod sgf;
pub mod tree;

use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

pub use board::{Board, Group};
pub use coord::{Coord, CoordSet, Stone, StoneSet};
pub use diff::Diff;
pub use fields::{Field, Fields};
pub use frame::{Frame, FrameType, Label, Marks, Metadata, NodeJson, Pen, TreeJson, TreeJsonType};
pub use game::{GameTree, PatternMove, StateJson};
pub use sgf::SgfTree;
pub use scoring::ScoreResult;

/// Stone color, or the absence of one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Color {
    /// No stone
    #[default]
    Empty = 0,
    /// Black player (traditionally goes first)
    Black = 1,
    /// White player
    White = 2,
}

impl Color {
    /// Returns the opposite color; `Empty` stays `Empty`
    pub fn opposite(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            Color::Empty => Color::Empty,
        }
    }

    /// Map the integer wire form back to a color
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            0 => Some(Color::Empty),
            1 => Some(Color::Black),
            2 => Some(Color::White),
            _ => None,
        }
    }

    /// SGF move key for this color
    pub fn move_key(&self) -> &'static str {
        match self {
            Color::White => "W",
            _ => "B",
        }
    }
}

/// Errors that can occur while building or reading a game record
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The SGF text is malformed
    #[error("sgf parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    /// SZ is missing a single numeric value or is out of range
    #[error("invalid board size: {0}")]
    BadSize(String),

    /// A recorded move would be suicide on its parent position
    #[error("suicide moves are not currently supported")]
    SuicideInRecord,

    /// Navigation to an index that is not in the tree
    #[error("error in indexing: {0}")]
    IndexNotFound(usize),

    /// A recorded move lies outside the board
    #[error("move {0} is off the board")]
    OffBoard(Coord),

    /// Requested trunk position is beyond the main line
    #[error("trunk too short")]
    TrunkTooShort,

    /// Coordinate written as letter+number could not be read
    #[error("invalid coordinate: {0}")]
    BadAlphanumeric(String),

    /// Saved state could not be decoded
    #[error("invalid saved state: {0}")]
    BadState(String),
}

/// Convenience alias for results in this crate
pub type Result<T> = std::result::Result<T, GameError>;

/// Largest supported board edge
pub const MAX_BOARD_SIZE: u8 = 25;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_swaps_and_fixes_empty() {
        assert_eq!(Color::Black.opposite(), Color::White);
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Empty.opposite(), Color::Empty);
    }

    #[test]
    fn color_wire_form_is_numeric() {
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "2");
        let c: Color = serde_json::from_str("1").unwrap();
        assert_eq!(c, Color::Black);
        assert_eq!(Color::from_number(3), None);
    }
}
