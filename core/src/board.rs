// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation, group detection and move legality

use crate::coord::{Coord, CoordSet, StoneSet};
use crate::diff::Diff;
use crate::Color;
use std::fmt;

/// A maximal connected set of same-colored stones and its liberties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub coords: CoordSet,
    pub libs: CoordSet,
    pub color: Color,
}

/// Represents the Go board with stones and empty positions
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// Size of the board (typically 9, 13, or 19)
    size: u8,
    /// Row-major positions
    points: Vec<Color>,
}

impl Board {
    /// Create a new empty board with the specified size
    pub fn new(size: u8) -> Self {
        let cells = (size as usize) * (size as usize);
        Self {
            size,
            points: vec![Color::Empty; cells],
        }
    }

    /// Build a board from rows of `B`, `W` and anything else for empty.
    /// The first row decides the size.
    pub fn from_ascii(s: &str) -> Option<Self> {
        let lines: Vec<&str> = s.trim().lines().map(str::trim).collect();
        let size = lines.first()?.len();
        if size == 0 || size > crate::MAX_BOARD_SIZE as usize || lines.len() < size {
            return None;
        }
        let mut board = Board::new(size as u8);
        for (y, line) in lines.iter().take(size).enumerate() {
            for (x, ch) in line.chars().take(size).enumerate() {
                let color = match ch {
                    'B' | 'b' => Color::Black,
                    'W' | 'w' => Color::White,
                    _ => continue,
                };
                board.set(Coord::new(x as u8, y as u8), color);
            }
        }
        Some(board)
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    /// Get the stone at the specified coordinate; off-board reads as empty
    pub fn get(&self, coord: Coord) -> Color {
        if !coord.is_valid(self.size) {
            return Color::Empty;
        }
        self.points[self.coord_to_index(coord)]
    }

    /// Set a point unconditionally
    pub fn set(&mut self, coord: Coord, color: Color) {
        if coord.is_valid(self.size) {
            let idx = self.coord_to_index(coord);
            self.points[idx] = color;
        }
    }

    fn set_many<'a>(&mut self, coords: impl Iterator<Item = &'a Coord>, color: Color) {
        for c in coords {
            self.set(*c, color);
        }
    }

    pub fn clear(&mut self) {
        self.points.fill(Color::Empty);
    }

    /// Convert a coordinate to a vector index
    fn coord_to_index(&self, coord: Coord) -> usize {
        (coord.y as usize) * (self.size as usize) + (coord.x as usize)
    }

    /// In-bounds orthogonal neighbours
    pub fn neighbors(&self, coord: Coord) -> Vec<Coord> {
        let mut result = Vec::with_capacity(4);
        let (x, y) = (coord.x, coord.y);
        if y > 0 {
            result.push(Coord::new(x, y - 1));
        }
        if y + 1 < self.size {
            result.push(Coord::new(x, y + 1));
        }
        if x > 0 {
            result.push(Coord::new(x - 1, y));
        }
        if x + 1 < self.size {
            result.push(Coord::new(x + 1, y));
        }
        result
    }

    /// Iterative flood fill from `start` over same-colored stones
    pub fn find_group(&self, start: Coord) -> Group {
        let color = self.get(start);
        if color == Color::Empty {
            return Group::default();
        }

        let mut stack = vec![start];
        let mut coords = CoordSet::new();
        let mut libs = CoordSet::new();
        while let Some(point) = stack.pop() {
            if coords.has(&point) {
                continue;
            }
            coords.add(point);
            for nb in self.neighbors(point) {
                let c = self.get(nb);
                if c == color && !coords.has(&nb) {
                    stack.push(nb);
                } else if c == Color::Empty {
                    libs.add(nb);
                }
            }
        }
        Group { coords, libs, color }
    }

    /// Every group currently on the board
    pub fn groups(&self) -> Vec<Group> {
        let mut seen = CoordSet::new();
        let mut groups = Vec::new();
        for y in 0..self.size {
            for x in 0..self.size {
                let c = Coord::new(x, y);
                if seen.has(&c) || self.get(c) == Color::Empty {
                    continue;
                }
                let g = self.find_group(c);
                seen.add_all(&g.coords);
                groups.push(g);
            }
        }
        groups
    }

    /// Whether `color` may play at `start`
    pub fn legal(&mut self, start: Coord, color: Color) -> bool {
        if !start.is_valid(self.size) || color == Color::Empty || self.get(start) != Color::Empty {
            return false;
        }

        self.set(start, color);
        let legal = self.placed_stone_survives(start, color);
        self.set(start, Color::Empty);
        legal
    }

    fn placed_stone_survives(&self, start: Coord, color: Color) -> bool {
        if !self.find_group(start).libs.is_empty() {
            return true;
        }
        // no liberties of its own, so it lives only by capturing
        self.neighbors(start).into_iter().any(|nb| {
            self.get(nb) == color.opposite() && self.find_group(nb).libs.is_empty()
        })
    }

    /// Stones of `color` that would die if the opponent stood on `start`
    pub fn would_kill(&mut self, start: Coord, color: Color) -> StoneSet {
        let previous = self.get(start);
        self.set(start, color.opposite());

        let mut dead = CoordSet::new();
        for nb in self.neighbors(start) {
            if dead.has(&nb) || self.get(nb) != color {
                continue;
            }
            let g = self.find_group(nb);
            if g.libs.is_empty() {
                dead.add_all(&g.coords);
            }
        }

        self.set(start, previous);
        StoneSet::new(dead, color)
    }

    /// Take dead stones of `color` next to `start` off the board
    pub fn remove_dead(&mut self, start: Coord, color: Color) -> StoneSet {
        let dead = self.would_kill(start, color);
        self.set_many(dead.coords.iter(), Color::Empty);
        dead
    }

    /// Play a move. Illegal moves leave the board untouched and yield `None`.
    pub fn play(&mut self, start: Coord, color: Color) -> Option<Diff> {
        if !self.legal(start, color) {
            tracing::debug!(x = start.x, y = start.y, ?color, "rejected illegal move");
            return None;
        }
        self.set(start, color);
        let captured = self.remove_dead(start, color.opposite());

        let mut placed = CoordSet::new();
        placed.add(start);
        Some(Diff::new(vec![StoneSet::new(placed, color)], vec![captured]))
    }

    pub fn apply_diff(&mut self, diff: &Diff) {
        for add in &diff.add {
            self.set_many(add.coords.iter(), add.color);
        }
        for remove in &diff.remove {
            self.set_many(remove.coords.iter(), Color::Empty);
        }
    }

    /// Diff that builds the current position from an empty board
    pub fn current_diff(&self) -> Diff {
        let mut black = CoordSet::new();
        let mut white = CoordSet::new();
        for y in 0..self.size {
            for x in 0..self.size {
                let c = Coord::new(x, y);
                match self.get(c) {
                    Color::Black => black.add(c),
                    Color::White => white.add(c),
                    Color::Empty => {}
                }
            }
        }
        Diff::new(
            vec![StoneSet::new(black, Color::Black), StoneSet::new(white, Color::White)],
            Vec::new(),
        )
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board({})", self.size)?;
        for y in 0..self.size {
            for x in 0..self.size {
                let ch = match self.get(Coord::new(x, y)) {
                    Color::Black => 'B',
                    Color::White => 'W',
                    Color::Empty => '.',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_and_liberties() {
        let board = Board::from_ascii(
            "BB...
             B....
             ...W.
             ...W.
             .....",
        )
        .unwrap();
        let g = board.find_group(Coord::new(0, 0));
        assert_eq!(g.coords.len(), 3);
        assert_eq!(g.libs.len(), 3);
        assert_eq!(board.groups().len(), 2);
    }

    #[test]
    fn occupied_point_is_illegal() {
        let mut board = Board::new(9);
        assert!(board.play(Coord::new(4, 4), Color::Black).is_some());
        assert!(!board.legal(Coord::new(4, 4), Color::White));
        assert!(board.play(Coord::new(4, 4), Color::White).is_none());
    }

    #[test]
    fn edge_neighbours() {
        let board = Board::new(9);
        assert_eq!(board.neighbors(Coord::new(0, 0)).len(), 2);
        assert_eq!(board.neighbors(Coord::new(8, 4)).len(), 3);
        assert_eq!(board.neighbors(Coord::new(4, 4)).len(), 4);
    }

    #[test]
    fn current_diff_rebuilds_position() {
        let board = Board::from_ascii(
            "B..
             .W.
             ..B",
        )
        .unwrap();
        let mut fresh = Board::new(3);
        fresh.apply_diff(&board.current_diff());
        assert_eq!(fresh, board);
    }
}
