// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared game record: a move tree, its cursors and the board
//! materialised at the viewer's cursor.

mod edit;
mod nav;
mod save;
mod score;
mod view;

pub use edit::PatternMove;
pub use save::StateJson;

use crate::board::Board;
use crate::coord::{Coord, CoordSet, StoneSet};
use crate::diff::Diff;
use crate::fields::Fields;
use crate::tree::{Arena, Branch, TreeNode};
use crate::Color;
use std::collections::HashMap;

/// Default debounce window between different users, in milliseconds
pub const DEFAULT_INPUT_BUFFER_MS: u64 = 250;

/// Default idle time before a room is closed, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 86_400;

/// Move tree with a viewer cursor (`current`) and a live-feed cursor
/// (`head`).
///
/// Invariants: `root`, `current` and `head` always name live nodes, and
/// `board` always holds the position at `current`.
#[derive(Debug, Clone)]
pub struct GameTree {
    arena: Arena,
    root: usize,
    current: usize,
    head: usize,
    next_index: usize,
    input_buffer: u64,
    timeout: u64,
    size: u8,
    board: Board,
    clipboard: Option<Branch>,
    marked_dead: CoordSet,
    marked_dame: CoordSet,
}

impl GameTree {
    /// A fresh record with the usual root properties
    pub fn new(size: u8) -> Self {
        let mut tree = Self::empty(size);
        let mut fields = Fields::new();
        fields.add_field("GM", "1");
        fields.add_field("FF", "4");
        fields.add_field("CA", "UTF-8");
        fields.add_field("SZ", size.to_string());
        fields.add_field("PB", "Black");
        fields.add_field("PW", "White");
        fields.add_field("RU", "Japanese");
        fields.add_field("KM", "6.5");
        tree.add_field_node(fields, None);
        tree
    }

    /// A tree with no nodes at all. The first node added becomes the root.
    pub(crate) fn empty(size: u8) -> Self {
        Self {
            arena: Arena::new(),
            root: 0,
            current: 0,
            head: 0,
            next_index: 0,
            input_buffer: DEFAULT_INPUT_BUFFER_MS,
            timeout: DEFAULT_TIMEOUT_SECS,
            size,
            board: Board::new(size),
            clipboard: None,
            marked_dead: CoordSet::new(),
            marked_dame: CoordSet::new(),
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn node(&self, index: usize) -> Option<&TreeNode> {
        self.arena.get(index)
    }

    pub fn current_node(&self) -> &TreeNode {
        &self.arena[self.current]
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.arena[self.root]
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn head_color(&self) -> Color {
        self.arena[self.head].color
    }

    pub fn input_buffer(&self) -> u64 {
        self.input_buffer
    }

    pub fn set_input_buffer(&mut self, ms: u64) {
        self.input_buffer = ms;
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_timeout(&mut self, secs: u64) {
        self.timeout = secs;
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn set_next_index(&mut self, index: usize) {
        self.next_index = index;
    }

    pub fn clipboard(&self) -> Option<&Branch> {
        self.clipboard.as_ref()
    }

    pub fn marked_dead(&self) -> &CoordSet {
        &self.marked_dead
    }

    pub fn marked_dame(&self) -> &CoordSet {
        &self.marked_dame
    }

    /// Child of `current` that already holds this move
    pub fn child_with(&self, coord: Option<Coord>, color: Color) -> Option<usize> {
        self.arena.has_child(self.current, coord, color)
    }

    /// Index of the node `n` moves down the main line
    pub fn trunk_num(&self, n: usize) -> crate::Result<usize> {
        self.arena
            .trunk_num(self.root, n)
            .ok_or(crate::GameError::TrunkTooShort)
    }

    /// Hand out the next fresh index
    pub(crate) fn take_index(&mut self) -> usize {
        let i = self.next_index;
        self.next_index += 1;
        i
    }

    /// A fresh index is always consumed. A requested index is used when it
    /// is free, and fresh indices then skip past it.
    fn claim_index(&mut self, requested: Option<usize>) -> usize {
        let fresh = self.take_index();
        match requested {
            Some(i) if !self.arena.contains(i) => {
                self.next_index = self.next_index.max(i + 1);
                i
            }
            _ => fresh,
        }
    }

    /// Hang `node` under `current` (or make it the root of an empty tree),
    /// prefer it, and move `current` onto it.
    fn attach(&mut self, mut node: TreeNode) -> usize {
        let index = node.index;
        if self.arena.is_empty() {
            node.up = None;
            self.root = index;
            self.head = index;
        } else {
            node.up = Some(self.current);
        }
        self.arena.insert(node);
        if let Some(up) = self.arena[index].up {
            let parent = &mut self.arena[up];
            parent.preferred_child = parent.down.len().saturating_sub(1);
        }
        self.current = index;
        index
    }

    /// Diff of a setup node against the board it is applied to: AB/AW are
    /// added, AE removes whatever currently stands on each point.
    fn setup_diff(board: &Board, fields: &Fields) -> Diff {
        let letters = |key: &str| -> CoordSet {
            fields
                .get_field(key)
                .iter()
                .filter_map(|v| Coord::from_letters(v))
                .collect()
        };

        let mut add = Vec::new();
        if fields.has_field("AB") {
            add.push(StoneSet::new(letters("AB"), Color::Black));
        }
        if fields.has_field("AW") {
            add.push(StoneSet::new(letters("AW"), Color::White));
        }

        let mut remove = Vec::new();
        if fields.has_field("AE") {
            let mut black = CoordSet::new();
            let mut white = CoordSet::new();
            for c in letters("AE").iter() {
                match board.get(*c) {
                    Color::Black => black.add(*c),
                    Color::White => white.add(*c),
                    Color::Empty => {}
                }
            }
            remove.push(StoneSet::new(black, Color::Black));
            remove.push(StoneSet::new(white, Color::White));
        }
        Diff::new(add, remove)
    }

    /// Forget any dead-stone or dame marking
    pub(crate) fn any_move(&mut self) {
        self.marked_dead = CoordSet::new();
        self.marked_dame = CoordSet::new();
    }

    /// Append a value to a property of the current node
    pub fn add_current_field(&mut self, key: &str, value: impl Into<String>) {
        let current = self.current;
        self.arena[current].fields.add_field(key, value);
    }

    /// Remove one value from a property of the current node
    pub fn remove_current_field(&mut self, key: &str, value: &str) {
        let current = self.current;
        self.arena[current].fields.remove_field(key, value);
    }

    pub fn delete_current_field(&mut self, key: &str) {
        let current = self.current;
        self.arena[current].fields.delete_field(key);
    }

    /// Replace a root property with a single value
    pub fn overwrite_root_field(&mut self, key: &str, value: impl Into<String>) {
        let root = self.root;
        self.arena[root].fields.overwrite_field(key, value);
    }

    /// Preferred child of every node, keyed by the node index as a string
    pub fn prefs(&self) -> HashMap<String, usize> {
        self.arena
            .indices()
            .map(|i| (i.to_string(), self.arena[*i].preferred_child))
            .collect()
    }

    /// Restore preferred children; nodes missing from `prefs` get 0.
    /// Out-of-range entries are clamped to the first child.
    pub fn set_prefs(&mut self, prefs: &HashMap<String, usize>) {
        for node in self.arena.values_mut() {
            let p = prefs.get(&node.index.to_string()).copied().unwrap_or(0);
            node.preferred_child = if p < node.down.len() { p } else { 0 };
        }
    }

    pub fn reset_prefs(&mut self) {
        for node in self.arena.values_mut() {
            node.preferred_child = 0;
        }
    }

    /// Comma-joined child positions from the root down to `current`
    pub fn locate(&self) -> String {
        let mut dirs = Vec::new();
        let mut cur = self.current;
        while let Some(up) = self.arena[cur].up {
            if let Some(pos) = self.arena[up].down.iter().position(|d| *d == cur) {
                dirs.push(pos);
            }
            cur = up;
        }
        dirs.iter()
            .rev()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Walk a [`GameTree::locate`] path from the root without touching
    /// preferred children. Steps that are not numbers or name a missing
    /// child end the walk.
    pub fn set_location(&mut self, loc: &str) {
        self.rewind();
        if loc.is_empty() {
            return;
        }
        for step in loc.split(',') {
            let Ok(d) = step.trim().parse::<usize>() else {
                break;
            };
            let Some(next) = self.arena[self.current].down.get(d).copied() else {
                break;
            };
            self.current = next;
            if let Some(diff) = &self.arena[next].diff {
                self.board.apply_diff(diff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_standard_root() {
        let tree = GameTree::new(19);
        let root = tree.root_node();
        assert_eq!(root.index, 0);
        assert_eq!(tree.next_index(), 1);
        assert_eq!(root.fields.get_field("SZ"), ["19"]);
        assert_eq!(root.fields.get_field("KM"), ["6.5"]);
        assert_eq!(tree.current(), tree.root());
        assert_eq!(tree.head(), tree.root());
        assert_eq!(tree.input_buffer(), DEFAULT_INPUT_BUFFER_MS);
    }

    #[test]
    fn locate_and_set_location() {
        let mut tree = GameTree::new(9);
        tree.add_node(Some(Coord::new(2, 2)), Color::Black, Fields::new(), None, false);
        tree.left();
        tree.add_node(Some(Coord::new(3, 3)), Color::Black, Fields::new(), None, false);
        tree.add_node(Some(Coord::new(4, 4)), Color::White, Fields::new(), None, false);
        assert_eq!(tree.locate(), "1,0");
        let here = tree.current();

        tree.rewind();
        assert_eq!(tree.locate(), "");
        tree.set_location("1,0");
        assert_eq!(tree.current(), here);
        assert_eq!(tree.board().get(Coord::new(3, 3)), Color::Black);
    }

    #[test]
    fn prefs_round_trip() {
        let mut tree = GameTree::new(9);
        tree.add_node(Some(Coord::new(2, 2)), Color::Black, Fields::new(), None, false);
        tree.left();
        tree.add_node(Some(Coord::new(3, 3)), Color::Black, Fields::new(), None, false);
        let prefs = tree.prefs();
        assert_eq!(prefs["0"], 1);
        tree.reset_prefs();
        assert_eq!(tree.root_node().preferred_child, 0);
        tree.set_prefs(&prefs);
        assert_eq!(tree.root_node().preferred_child, 1);
    }
}
