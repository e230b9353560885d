// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invertible board deltas

use crate::coord::StoneSet;
use serde::{Deserialize, Serialize};

/// Stones to add and stones to remove when stepping between two positions.
///
/// Adds are applied before removes, so a diff may re-add a point it also
/// clears only if the caller builds it that way on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub add: Vec<StoneSet>,
    pub remove: Vec<StoneSet>,
}

impl Diff {
    pub fn new(add: Vec<StoneSet>, remove: Vec<StoneSet>) -> Self {
        Self { add, remove }
    }

    /// The diff that undoes this one
    pub fn invert(&self) -> Diff {
        Diff {
            add: self.remove.clone(),
            remove: self.add.clone(),
        }
    }

    /// Total number of stones removed, per color
    pub fn removed_count(&self, color: crate::Color) -> usize {
        self.remove
            .iter()
            .filter(|s| s.color == color)
            .map(|s| s.coords.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.add.iter().all(|s| s.coords.is_empty()) && self.remove.iter().all(|s| s.coords.is_empty())
    }
}
