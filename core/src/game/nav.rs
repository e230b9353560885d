// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cursor movement. Every step keeps the board in sync with `current`.

use super::GameTree;
use crate::coord::Coord;
use crate::diff::Diff;
use crate::{GameError, Result};

impl GameTree {
    /// Step to the parent. Returns the diff applied to the board.
    pub fn left(&mut self) -> Option<Diff> {
        self.any_move();
        let node = &self.arena[self.current];
        let up = node.up?;
        let inverse = node.diff.as_ref().map(Diff::invert);
        if let Some(d) = &inverse {
            self.board.apply_diff(d);
        }
        self.current = up;
        inverse
    }

    /// Step to the preferred child. Returns the diff applied to the board.
    pub fn right(&mut self) -> Option<Diff> {
        self.any_move();
        let next = self.arena[self.current].preferred()?;
        self.current = next;
        let diff = self.arena[next].diff.clone();
        if let Some(d) = &diff {
            self.board.apply_diff(d);
        }
        diff
    }

    /// Cycle the preferred child backwards, wrapping
    pub fn up(&mut self) {
        let current = self.current;
        let node = &mut self.arena[current];
        let n = node.down.len();
        if n == 0 {
            return;
        }
        node.preferred_child = (node.preferred_child + n - 1) % n;
    }

    /// Cycle the preferred child forwards, wrapping
    pub fn down(&mut self) {
        let current = self.current;
        let node = &mut self.arena[current];
        let n = node.down.len();
        if n == 0 {
            return;
        }
        node.preferred_child = (node.preferred_child + 1) % n;
    }

    /// Back to the root, rebuilding the board from scratch
    pub fn rewind(&mut self) {
        self.any_move();
        self.current = self.root;
        self.board.clear();
        if let Some(d) = &self.arena[self.root].diff {
            self.board.apply_diff(d);
        }
    }

    /// Follow preferred children to a leaf
    pub fn fast_forward(&mut self) {
        while !self.arena[self.current].down.is_empty() {
            self.right();
        }
    }

    /// Make every ancestor of `index` prefer the branch leading to it
    pub fn set_preferred(&mut self, index: usize) -> Result<()> {
        if !self.arena.contains(index) {
            return Err(GameError::IndexNotFound(index));
        }
        let mut cur = index;
        while let Some(up) = self.arena[cur].up {
            let parent = &mut self.arena[up];
            if let Some(pos) = parent.down.iter().position(|d| *d == cur) {
                parent.preferred_child = pos;
            }
            cur = up;
        }
        Ok(())
    }

    /// Jump to any node by index
    pub fn goto_index(&mut self, index: usize) -> Result<()> {
        self.set_preferred(index)?;
        self.rewind();
        while self.current != index {
            let last = self.current;
            self.right();
            if self.current == last {
                break;
            }
        }
        Ok(())
    }

    /// Jump to the nearest node whose move is at `coord`, searching down
    /// the preferred line first and then back toward the root. Does
    /// nothing if no such node exists.
    pub fn goto_coord(&mut self, coord: Coord) {
        let mut found = None;
        let mut cur = Some(self.current);
        while let Some(i) = cur {
            if self.arena[i].coord == Some(coord) {
                found = Some(i);
                break;
            }
            cur = self.arena[i].preferred();
        }
        if found.is_none() {
            let mut cur = Some(self.current);
            while let Some(i) = cur {
                if self.arena[i].coord == Some(coord) {
                    found = Some(i);
                    break;
                }
                cur = self.arena[i].up;
            }
        }
        if let Some(i) = found {
            // the index came from the tree, so it cannot be missing
            let _ = self.goto_index(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Color, Coord, Fields, GameError, GameTree};

    fn play(tree: &mut GameTree, x: u8, y: u8, color: Color) {
        tree.add_node(Some(Coord::new(x, y)), color, Fields::new(), None, false);
    }

    #[test]
    fn left_then_right_restores_everything() {
        let mut tree = GameTree::new(9);
        play(&mut tree, 2, 2, Color::Black);
        play(&mut tree, 3, 3, Color::White);
        tree.left();
        let (cur, board) = (tree.current(), tree.board().clone());
        tree.right();
        tree.left();
        assert_eq!(tree.current(), cur);
        assert_eq!(tree.board(), &board);
    }

    #[test]
    fn left_at_root_is_noop() {
        let mut tree = GameTree::new(9);
        assert!(tree.left().is_none());
        assert_eq!(tree.current(), tree.root());
    }

    #[test]
    fn up_and_down_wrap() {
        let mut tree = GameTree::new(9);
        for x in 0..3 {
            play(&mut tree, x, 0, Color::Black);
            tree.left();
        }
        assert_eq!(tree.root_node().preferred_child, 2);
        tree.down();
        assert_eq!(tree.root_node().preferred_child, 0);
        tree.up();
        assert_eq!(tree.root_node().preferred_child, 2);
    }

    #[test]
    fn goto_index_replays_board() {
        let mut tree = GameTree::new(9);
        play(&mut tree, 2, 2, Color::Black);
        let first = tree.current();
        play(&mut tree, 3, 3, Color::White);
        tree.rewind();
        tree.goto_index(first).unwrap();
        assert_eq!(tree.current(), first);
        assert_eq!(tree.board().get(Coord::new(2, 2)), Color::Black);
        assert_eq!(tree.board().get(Coord::new(3, 3)), Color::Empty);
        assert_eq!(tree.goto_index(99), Err(GameError::IndexNotFound(99)));
    }

    #[test]
    fn goto_coord_searches_both_ways() {
        let mut tree = GameTree::new(9);
        play(&mut tree, 2, 2, Color::Black);
        play(&mut tree, 3, 3, Color::White);
        play(&mut tree, 4, 4, Color::Black);
        tree.goto_coord(Coord::new(2, 2));
        assert_eq!(tree.current_node().coord, Some(Coord::new(2, 2)));
        tree.goto_coord(Coord::new(4, 4));
        assert_eq!(tree.current_node().coord, Some(Coord::new(4, 4)));
        let here = tree.current();
        tree.goto_coord(Coord::new(8, 8));
        assert_eq!(tree.current(), here);
    }
}
