// SPDX-License-Identifier: MIT OR Apache-2.0

//! Area scoring with dead-stone and dame marking

use crate::board::Board;
use crate::coord::{Coord, CoordSet};
use crate::Color;
use serde::Serialize;

/// Who an empty region belongs to, built up as a bitmask of the
/// colors seen on its border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    NotCovered = 0,
    Black = 1,
    White = 2,
    Dame = 3,
}

impl AreaKind {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => AreaKind::Black,
            2 => AreaKind::White,
            3 => AreaKind::Dame,
            _ => AreaKind::NotCovered,
        }
    }
}

/// Final tally of a position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub black_area: Vec<Coord>,
    pub white_area: Vec<Coord>,
    pub black_dead: Vec<Coord>,
    pub white_dead: Vec<Coord>,
    pub dame: Vec<Coord>,
}

impl Board {
    /// Flood fill the empty region containing `start` and classify it by
    /// the living stones on its border. Stones in `dead` count as the
    /// opposite color.
    pub fn find_area(&self, start: Coord, dead: &CoordSet) -> (CoordSet, AreaKind) {
        if self.get(start) != Color::Empty {
            return (CoordSet::new(), AreaKind::NotCovered);
        }

        let mut bits = 0u8;
        let mut stack = vec![start];
        let mut area = CoordSet::new();
        while let Some(point) = stack.pop() {
            if area.has(&point) {
                continue;
            }
            area.add(point);
            for nb in self.neighbors(point) {
                let owner = match self.get(nb) {
                    Color::Empty => {
                        if !area.has(&nb) {
                            stack.push(nb);
                        }
                        continue;
                    }
                    c if dead.has(&nb) => c.opposite(),
                    c => c,
                };
                bits |= match owner {
                    Color::Black => AreaKind::Black as u8,
                    Color::White => AreaKind::White as u8,
                    Color::Empty => 0,
                };
            }
        }
        (area, AreaKind::from_bits(bits))
    }

    /// Score the position. `dead` stones are credited to the opponent as
    /// both area and captures; `marked_dame` points are never territory.
    pub fn score(&self, dead: &CoordSet, marked_dame: &CoordSet) -> ScoreResult {
        let mut black_area = CoordSet::new();
        let mut white_area = CoordSet::new();
        let mut black_dead = CoordSet::new();
        let mut white_dead = CoordSet::new();
        let mut dame = CoordSet::new();
        let mut covered = CoordSet::new();

        for c in dead.iter() {
            match self.get(*c) {
                Color::Black => {
                    white_area.add(*c);
                    black_dead.add(*c);
                }
                Color::White => {
                    black_area.add(*c);
                    white_dead.add(*c);
                }
                Color::Empty => {}
            }
        }
        dame.add_all(marked_dame);

        for y in 0..self.size() {
            for x in 0..self.size() {
                let c = Coord::new(x, y);
                if self.get(c) != Color::Empty || covered.has(&c) {
                    continue;
                }
                let (area, kind) = self.find_area(c, dead);
                for p in area.iter() {
                    covered.add(*p);
                    if dame.has(p) {
                        continue;
                    }
                    match kind {
                        AreaKind::Black => black_area.add(*p),
                        AreaKind::White => white_area.add(*p),
                        AreaKind::Dame => dame.add(*p),
                        AreaKind::NotCovered => {}
                    }
                }
            }
        }

        for p in self.atari_dame(dead, &dame).iter() {
            black_area.remove(p);
            white_area.remove(p);
            dame.add(*p);
        }

        for p in dame.list() {
            if self.is_snapback(p, Color::White) {
                dame.remove(&p);
                black_area.add(p);
            } else if self.is_snapback(p, Color::Black) {
                dame.remove(&p);
                white_area.add(p);
            }
        }

        ScoreResult {
            black_area: black_area.list(),
            white_area: white_area.list(),
            black_dead: black_dead.list(),
            white_dead: white_dead.list(),
            dame: dame.list(),
        }
    }

    /// Points that must be filled once the dame are played out, because a
    /// living group would otherwise be left in atari. Only points found
    /// whichever color fills the dame are reported.
    fn atari_dame(&self, dead: &CoordSet, dame: &CoordSet) -> CoordSet {
        let by_black = FillBoard::new(self, dame, Color::Black).atari_points(dead);
        let by_white = FillBoard::new(self, dame, Color::White).atari_points(dead);
        by_black.intersect(&by_white)
    }

    /// Playing `color` at `c` captures exactly one stone and leaves the
    /// capturing stone with a single liberty.
    fn is_snapback(&self, c: Coord, color: Color) -> bool {
        let mut copy = self.clone();
        let Some(diff) = copy.play(c, color) else {
            return false;
        };
        let captured: usize = diff.remove.iter().map(|s| s.coords.len()).sum();
        captured == 1 && copy.find_group(c).libs.len() == 1
    }
}

/// Board copy where dame are filled with placeholder stones. Placeholders
/// join groups of their color but never start one.
struct FillBoard {
    size: u8,
    cells: Vec<(Color, bool)>,
}

impl FillBoard {
    fn new(board: &Board, dame: &CoordSet, filler: Color) -> Self {
        let size = board.size();
        let mut cells = Vec::with_capacity(size as usize * size as usize);
        for y in 0..size {
            for x in 0..size {
                cells.push((board.get(Coord::new(x, y)), false));
            }
        }
        let mut fb = Self { size, cells };
        for d in dame.iter() {
            fb.fill(*d, filler);
        }
        fb
    }

    fn idx(&self, c: Coord) -> usize {
        c.y as usize * self.size as usize + c.x as usize
    }

    fn color(&self, c: Coord) -> Color {
        self.cells[self.idx(c)].0
    }

    fn fill(&mut self, c: Coord, color: Color) {
        if c.is_valid(self.size) {
            let i = self.idx(c);
            self.cells[i] = (color, true);
        }
    }

    fn neighbors(&self, c: Coord) -> Vec<Coord> {
        let mut v = Vec::with_capacity(4);
        if c.y > 0 {
            v.push(Coord::new(c.x, c.y - 1));
        }
        if c.y + 1 < self.size {
            v.push(Coord::new(c.x, c.y + 1));
        }
        if c.x > 0 {
            v.push(Coord::new(c.x - 1, c.y));
        }
        if c.x + 1 < self.size {
            v.push(Coord::new(c.x + 1, c.y));
        }
        v
    }

    fn group(&self, start: Coord) -> (CoordSet, CoordSet) {
        let color = self.color(start);
        let mut stack = vec![start];
        let mut coords = CoordSet::new();
        let mut libs = CoordSet::new();
        while let Some(p) = stack.pop() {
            if coords.has(&p) {
                continue;
            }
            coords.add(p);
            for nb in self.neighbors(p) {
                let c = self.color(nb);
                if c == color {
                    stack.push(nb);
                } else if c == Color::Empty {
                    libs.add(nb);
                }
            }
        }
        (coords, libs)
    }

    fn atari_points(mut self, dead: &CoordSet) -> CoordSet {
        let mut points = CoordSet::new();
        loop {
            let mut changed = false;
            let mut seen = CoordSet::new();
            for y in 0..self.size {
                for x in 0..self.size {
                    let c = Coord::new(x, y);
                    let (color, filled) = self.cells[self.idx(c)];
                    if color == Color::Empty || filled || seen.has(&c) {
                        continue;
                    }
                    let (coords, libs) = self.group(c);
                    seen.add_all(&coords);
                    if libs.len() != 1 || dead.has(&c) {
                        continue;
                    }
                    let lib = libs.list()[0];
                    points.add(lib);
                    self.fill(lib, color);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        points
    }
}
