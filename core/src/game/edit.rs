// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tree edits: new nodes, live-feed pushes, grafts and the clipboard

use super::GameTree;
use crate::coord::Coord;
use crate::diff::Diff;
use crate::fields::Fields;
use crate::tree::TreeNode;
use crate::{Color, GameError, Result};
use std::collections::HashMap;

/// A move in a sequence to be grafted; `coord` is `None` for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMove {
    pub coord: Option<Coord>,
    pub color: Color,
}

impl PatternMove {
    pub fn new(coord: Option<Coord>, color: Color) -> Self {
        Self { coord, color }
    }

    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        let value = self.coord.map(|c| c.to_letters()).unwrap_or_default();
        fields.add_field(self.color.move_key(), value);
        fields
    }
}

impl GameTree {
    /// Add a move under `current`.
    ///
    /// Unless `force` is set, re-adding a move that already exists as a
    /// child just steps into that child. Illegal moves still create the
    /// node but carry no diff; callers check legality first.
    pub fn add_node(
        &mut self,
        coord: Option<Coord>,
        color: Color,
        fields: Fields,
        index: Option<usize>,
        force: bool,
    ) -> Option<Diff> {
        self.any_move();
        if !force {
            if let Some(existing) = self.arena.has_child(self.current, coord, color) {
                let current = self.current;
                let node = &mut self.arena[current];
                if let Some(pos) = node.down.iter().position(|d| *d == existing) {
                    node.preferred_child = pos;
                }
                return self.right();
            }
        }

        let index = self.claim_index(index);
        self.attach(TreeNode::new(coord, color, index, None, fields));
        let diff = coord.and_then(|c| self.board.play(c, color));
        self.arena.set_diff(index, diff.clone());
        diff
    }

    /// Add a pass under `current`. Captures carry over from the parent.
    pub fn add_pass_node(&mut self, color: Color, fields: Fields, index: Option<usize>) {
        self.any_move();
        let index = self.claim_index(index);
        self.attach(TreeNode::new(None, color, index, None, fields));
        self.arena.set_diff(index, None);
    }

    /// Add a setup node (AB/AW/AE) under `current`
    pub fn add_field_node(&mut self, fields: Fields, index: Option<usize>) -> Diff {
        self.any_move();
        let diff = Self::setup_diff(&self.board, &fields);
        let index = self.claim_index(index);
        self.attach(TreeNode::new(None, Color::Empty, index, None, fields));
        self.board.apply_diff(&diff);
        self.arena.set_diff(index, Some(diff.clone()));
        diff
    }

    /// Push a move from a live feed as the new first child of `head`.
    ///
    /// If the viewer was sitting on `head` it follows along; otherwise the
    /// viewer's cursor and board are left where they were.
    pub fn push_head(&mut self, coord: Option<Coord>, color: Color) {
        let index = self.take_index();
        let mv = PatternMove::new(coord, color);
        let head = self.head;

        let mut node = TreeNode::new(coord, color, index, Some(head), mv.fields());
        node.depth = self.arena[head].depth + 1;
        self.arena.insert_front(node);

        let tracking = self.current == head;
        let diff = if tracking {
            let diff = coord.and_then(|c| self.board.play(c, color));
            self.current = index;
            diff
        } else {
            let save = self.current;
            let prefs = self.prefs();
            // the cursors are live, so neither jump can fail
            let _ = self.goto_index(head);
            let diff = coord.and_then(|c| self.board.play(c, color));
            let _ = self.goto_index(save);
            self.set_prefs(&prefs);
            diff
        };

        self.head = index;
        self.arena.set_diff(index, diff);
        tracing::trace!(index, tracking, "pushed live move");
    }

    /// Make sure a sequence of moves exists from the root, following
    /// matching children and creating the rest. The cursor is restored.
    pub fn add_stones_to_trunk(&mut self, moves: &[PatternMove]) {
        let save = self.current;
        let mut node = self.root;
        for mv in moves {
            let existing = self.arena[node].down.iter().copied().find(|c| {
                let child = &self.arena[*c];
                child.coord == mv.coord && (mv.coord.is_none() || child.color == mv.color)
            });
            if let Some(child) = existing {
                node = child;
                continue;
            }
            let _ = self.goto_index(node);
            match mv.coord {
                None => self.add_pass_node(mv.color, mv.fields(), None),
                Some(c) => {
                    self.add_node(Some(c), mv.color, mv.fields(), None, false);
                }
            }
            node = self.current;
        }
        let _ = self.goto_index(save);
    }

    /// Graft a variation under `parent`, reusing moves that already exist.
    /// Preferred children along the way and the cursor are left as they
    /// were.
    pub fn smart_graft(&mut self, parent: usize, moves: &[PatternMove]) -> Result<()> {
        if !self.arena.contains(parent) {
            return Err(GameError::IndexNotFound(parent));
        }
        let save = self.current;
        let mut saved_prefs: HashMap<usize, usize> = HashMap::new();
        let mut first_new = None;
        let mut up = parent;

        for mv in moves {
            self.goto_index(up)?;
            saved_prefs.insert(up, self.arena[up].preferred_child);

            if let Some(child) = self.arena.has_child(up, mv.coord, mv.color) {
                up = child;
                continue;
            }

            let index = self.take_index();
            let node = TreeNode::new(mv.coord, mv.color, index, Some(up), mv.fields());
            self.arena.insert(node);
            first_new.get_or_insert(index);
            let diff = mv.coord.and_then(|c| self.board.play(c, mv.color));
            self.arena.set_diff(index, diff);
            up = index;
        }

        if let Some(first) = first_new {
            self.arena.recompute_depth(first);
        }
        self.goto_index(save)?;
        for (index, pref) in saved_prefs {
            if let Some(node) = self.arena.get_mut(index) {
                node.preferred_child = pref;
            }
        }
        Ok(())
    }

    /// Detach `current` and its subtree into the clipboard and step to the
    /// parent. The root cannot be cut.
    pub fn cut(&mut self) -> Option<Diff> {
        self.any_move();
        let index = self.current;
        self.arena[index].up?;
        let diff = self.left();
        if self.arena.preorder(index).contains(&self.head) {
            self.head = self.current;
        }
        self.clipboard = self.arena.remove_subtree(index);
        diff
    }

    /// Put a detached copy of `current` and its subtree in the clipboard
    pub fn copy(&mut self) {
        self.clipboard = self.arena.copy_branch(self.current);
    }

    /// Add a fresh copy of the clipboard under `current`. Every pasted node
    /// gets a new index and a diff recomputed against its new parent. The
    /// cursor and preferred child of `current` do not change.
    pub fn paste(&mut self) -> bool {
        let Some(branch) = self.clipboard.clone() else {
            return false;
        };
        self.any_move();
        let parent = self.current;
        let saved_pref = self.arena[parent].preferred_child;

        // rebuild the subtree in pre-order, replaying the board along the
        // path from the top of the branch to the node being added
        let mut indices: Vec<usize> = Vec::with_capacity(branch.len());
        let mut path: Vec<(usize, Option<Diff>)> = Vec::new();
        for (pos, b) in branch.nodes.iter().enumerate() {
            while path.last().is_some_and(|(p, _)| Some(*p) != b.parent) {
                if let Some((_, Some(d))) = path.pop() {
                    self.board.apply_diff(&d.invert());
                }
            }
            let up = b.parent.and_then(|p| indices.get(p).copied()).unwrap_or(parent);

            let index = self.take_index();
            let mut node = TreeNode::new(b.coord, b.color, index, Some(up), b.fields.clone());
            node.preferred_child = b.preferred_child;
            self.arena.insert(node);
            indices.push(index);

            let diff = if b.fields.is_move() {
                b.coord.and_then(|c| self.board.play(c, b.color))
            } else {
                let d = Self::setup_diff(&self.board, &b.fields);
                self.board.apply_diff(&d);
                Some(d)
            };
            self.arena.set_diff(index, diff.clone());
            path.push((pos, diff));
        }
        while let Some((_, diff)) = path.pop() {
            if let Some(d) = diff {
                self.board.apply_diff(&d.invert());
            }
        }
        let top = indices.first().copied();

        if let Some(top) = top {
            self.arena.recompute_depth(top);
        }
        self.arena[parent].preferred_child = saved_pref;
        true
    }
}
