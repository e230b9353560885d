// SPDX-License-Identifier: MIT OR Apache-2.0

use super::GameTree;
use crate::coord::Coord;
use crate::scoring::ScoreResult;
use crate::Color;

impl GameTree {
    /// Toggle a dead-stone or dame marking at `coord`. An empty point
    /// toggles its whole empty region as dame; a stone toggles its group
    /// as dead.
    pub fn mark_dead(&mut self, coord: Coord) {
        if !coord.is_valid(self.size) {
            return;
        }
        if self.board.get(coord) == Color::Empty {
            let (area, _) = self.board.find_area(coord, &self.marked_dead);
            if self.marked_dame.has(&coord) {
                self.marked_dame.remove_all(&area);
            } else {
                self.marked_dame.add_all(&area);
            }
        } else {
            let group = self.board.find_group(coord);
            if self.marked_dead.has(&coord) {
                self.marked_dead.remove_all(&group.coords);
            } else {
                self.marked_dead.add_all(&group.coords);
            }
        }
    }

    /// Score the position at `current` with the current markings
    pub fn score(&self) -> ScoreResult {
        self.board.score(&self.marked_dead, &self.marked_dame)
    }
}
