// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arena storage for the move tree
//!
//! Nodes live in a flat index -> node table. Children are owned top-down
//! through `down`; `up` is a plain index used only for navigation.

use crate::coord::Coord;
use crate::diff::Diff;
use crate::fields::Fields;
use crate::Color;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

/// One position in the game record
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Move coordinate; `None` for passes and setup nodes
    pub coord: Option<Coord>,
    pub color: Color,
    /// Children, in display order
    pub down: Vec<usize>,
    /// Parent index; `None` only for the root
    pub up: Option<usize>,
    pub index: usize,
    /// Position in `down` of the branch shown by default
    pub preferred_child: usize,
    pub fields: Fields,
    /// Delta from the parent's board to this node's board
    pub diff: Option<Diff>,
    pub depth: usize,
    pub black_caps: usize,
    pub white_caps: usize,
}

impl TreeNode {
    pub fn new(coord: Option<Coord>, color: Color, index: usize, up: Option<usize>, fields: Fields) -> Self {
        Self {
            coord,
            color,
            down: Vec::new(),
            up,
            index,
            preferred_child: 0,
            fields,
            diff: None,
            depth: 0,
            black_caps: 0,
            white_caps: 0,
        }
    }

    pub fn is_move(&self) -> bool {
        self.fields.is_move()
    }

    pub fn has_comment(&self) -> bool {
        !self.fields.get_field("C").is_empty()
    }

    /// Child holding the branch shown by default
    pub fn preferred(&self) -> Option<usize> {
        self.down.get(self.preferred_child).copied()
    }
}

/// One node of a detached subtree
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub coord: Option<Coord>,
    pub color: Color,
    pub fields: Fields,
    pub preferred_child: usize,
    /// Position of the parent in [`Branch::nodes`]; `None` for the top
    pub parent: Option<usize>,
}

/// A subtree detached from any arena, used by the clipboard. Nodes are
/// stored flat in pre-order, so parents always come before children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    pub nodes: Vec<BranchNode>,
}

impl Branch {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Flat index -> node table
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: HashMap<usize, TreeNode>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(&index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TreeNode> {
        self.nodes.get_mut(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.nodes.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = &usize> {
        self.nodes.keys()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut TreeNode> {
        self.nodes.values_mut()
    }

    /// Insert a node and hook it under its parent, if it has one
    pub fn insert(&mut self, node: TreeNode) {
        let index = node.index;
        let parent = node.up;
        self.nodes.insert(index, node);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.down.push(index);
        }
        self.recompute_depth(index);
    }

    /// Insert a node as the first child of its parent. The parent keeps
    /// preferring the same branch it preferred before.
    pub fn insert_front(&mut self, node: TreeNode) {
        let index = node.index;
        let parent = node.up;
        self.nodes.insert(index, node);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            if !p.down.is_empty() {
                p.preferred_child += 1;
            }
            p.down.insert(0, index);
        }
        self.recompute_depth(index);
    }

    /// Pre-order walk starting at `start`
    pub fn preorder(&self, start: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            let Some(node) = self.nodes.get(&i) else {
                continue;
            };
            out.push(i);
            stack.extend(node.down.iter().rev().copied());
        }
        out
    }

    /// Depth = parent depth + 1, for `start` and everything below it
    pub fn recompute_depth(&mut self, start: usize) {
        let base = self
            .nodes
            .get(&start)
            .and_then(|n| n.up)
            .and_then(|p| self.nodes.get(&p))
            .map(|p| p.depth + 1)
            .unwrap_or(0);
        let mut stack = vec![(start, base)];
        while let Some((i, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&i) {
                node.depth = depth;
                stack.extend(node.down.iter().map(|c| (*c, depth + 1)));
            }
        }
    }

    /// Store a node's diff and derive its capture counts from the parent
    pub fn set_diff(&mut self, index: usize, diff: Option<Diff>) {
        let (mut black, mut white) = self
            .nodes
            .get(&index)
            .and_then(|n| n.up)
            .and_then(|p| self.nodes.get(&p))
            .map(|p| (p.black_caps, p.white_caps))
            .unwrap_or((0, 0));
        if let Some(d) = &diff {
            black += d.removed_count(Color::White);
            white += d.removed_count(Color::Black);
        }
        if let Some(node) = self.nodes.get_mut(&index) {
            node.diff = diff;
            node.black_caps = black;
            node.white_caps = white;
        }
    }

    /// Deepest depth below `start`
    pub fn max_depth(&self, start: usize) -> usize {
        self.preorder(start)
            .into_iter()
            .filter_map(|i| self.nodes.get(&i).map(|n| n.depth))
            .max()
            .unwrap_or(0)
    }

    /// Index of the node `n` steps down the first-child line from `root`
    pub fn trunk_num(&self, root: usize, n: usize) -> Option<usize> {
        let mut cur = self.nodes.get(&root)?;
        for _ in 0..n {
            cur = self.nodes.get(cur.down.first()?)?;
        }
        Some(cur.index)
    }

    /// Child of `parent` holding the same move
    pub fn has_child(&self, parent: usize, coord: Option<Coord>, color: Color) -> Option<usize> {
        let node = self.nodes.get(&parent)?;
        node.down.iter().copied().find(|c| {
            self.nodes
                .get(c)
                .map(|child| child.coord.is_some() && child.coord == coord && child.color == color)
                .unwrap_or(false)
        })
    }

    /// Detach `index` from its parent and purge it and its descendants
    pub fn remove_subtree(&mut self, index: usize) -> Option<Branch> {
        let branch = self.copy_branch(index)?;
        if let Some(parent) = self.nodes.get(&index).and_then(|n| n.up) {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.down.retain(|c| *c != index);
                if p.preferred_child >= p.down.len() {
                    p.preferred_child = 0;
                }
            }
        }
        for i in self.preorder(index) {
            self.nodes.remove(&i);
        }
        Some(branch)
    }

    /// Deep copy of the subtree at `index`, detached from any indices
    pub fn copy_branch(&self, index: usize) -> Option<Branch> {
        self.nodes.get(&index)?;
        let mut branch = Branch::default();
        let mut stack = vec![(index, None)];
        while let Some((i, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(&i) else {
                continue;
            };
            let pos = branch.nodes.len();
            branch.nodes.push(BranchNode {
                coord: node.coord,
                color: node.color,
                fields: node.fields.clone(),
                preferred_child: node.preferred_child,
                parent,
            });
            stack.extend(node.down.iter().rev().map(|c| (*c, Some(pos))));
        }
        Some(branch)
    }
}

/// Direct access for indices the caller knows are live (root, current,
/// head). Panics on a missing index.
impl Index<usize> for Arena {
    type Output = TreeNode;

    fn index(&self, index: usize) -> &TreeNode {
        &self.nodes[&index]
    }
}

impl IndexMut<usize> for Arena {
    fn index_mut(&mut self, index: usize) -> &mut TreeNode {
        self.nodes.get_mut(&index).unwrap_or_else(|| panic!("no tree node {index}"))
    }
}
