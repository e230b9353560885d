// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board coordinates and sets of them

use crate::{Color, GameError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Board coordinate representing a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column)
    pub x: u8,
    /// Y coordinate (row)
    pub y: u8,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Check if coordinate is valid for a board of given size
    pub fn is_valid(&self, board_size: u8) -> bool {
        self.x < board_size && self.y < board_size
    }

    /// Two-letter SGF form, `a` being zero
    pub fn to_letters(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(LETTERS.get(self.x as usize).copied().unwrap_or(b'?') as char);
        s.push(LETTERS.get(self.y as usize).copied().unwrap_or(b'?') as char);
        s
    }

    /// Parse the two-letter SGF form. Anything but exactly two letters is `None`.
    pub fn from_letters(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_lowercase()) {
            return None;
        }
        Some(Self::new(bytes[0] - b'a', bytes[1] - b'a'))
    }

    /// Parse the human form used by graft commands, e.g. `c17` or `Q4`.
    ///
    /// Columns skip the letter `i`; rows count up from the bottom edge.
    pub fn from_alphanumeric(s: &str, size: u8) -> Result<Self> {
        let bad = || GameError::BadAlphanumeric(s.to_string());
        let lower = s.trim().to_ascii_lowercase();
        let mut chars = lower.chars();
        let letter = chars.next().ok_or_else(bad)?;
        if !letter.is_ascii_lowercase() || letter == 'i' {
            return Err(bad());
        }
        let number: u32 = chars.as_str().parse().map_err(|_| bad())?;

        let mut x = letter as u32 - 'a' as u32;
        if letter > 'i' {
            x -= 1;
        }
        if number == 0 || number > size as u32 || x >= size as u32 {
            return Err(bad());
        }
        let y = size as u32 - number;
        Ok(Self::new(x as u8, y as u8))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A move or placement: a colored stone, where `None` means pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stone {
    pub coord: Option<Coord>,
    pub color: Color,
}

impl Stone {
    pub fn new(coord: Option<Coord>, color: Color) -> Self {
        Self { coord, color }
    }
}

/// Unordered set of unique coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordSet(HashSet<Coord>);

impl CoordSet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn add(&mut self, c: Coord) {
        self.0.insert(c);
    }

    pub fn add_all(&mut self, other: &CoordSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn remove(&mut self, c: &Coord) {
        self.0.remove(c);
    }

    pub fn remove_all(&mut self, other: &CoordSet) {
        for c in &other.0 {
            self.0.remove(c);
        }
    }

    pub fn has(&self, c: &Coord) -> bool {
        self.0.contains(c)
    }

    /// Points present in both sets
    pub fn intersect(&self, other: &CoordSet) -> CoordSet {
        CoordSet(self.0.intersection(&other.0).copied().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted list, so output is deterministic
    pub fn list(&self) -> Vec<Coord> {
        let mut v: Vec<Coord> = self.0.iter().copied().collect();
        v.sort();
        v
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coord> {
        self.0.iter()
    }
}

impl FromIterator<Coord> for CoordSet {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        CoordSet(iter.into_iter().collect())
    }
}

impl Serialize for CoordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.list().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CoordSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = Vec::<Coord>::deserialize(deserializer)?;
        Ok(v.into_iter().collect())
    }
}

/// A set of coordinates sharing one color
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneSet {
    pub coords: CoordSet,
    pub color: Color,
}

impl StoneSet {
    pub fn new(coords: CoordSet, color: Color) -> Self {
        Self { coords, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip() {
        let c = Coord::new(2, 3);
        assert_eq!(c.to_letters(), "cd");
        assert_eq!(Coord::from_letters("cd"), Some(c));
        assert_eq!(Coord::from_letters("CD"), Some(c));
        assert_eq!(Coord::from_letters(""), None);
        assert_eq!(Coord::from_letters("abc"), None);
    }

    #[test]
    fn alphanumeric_skips_i() {
        assert_eq!(Coord::from_alphanumeric("a19", 19).unwrap(), Coord::new(0, 0));
        assert_eq!(Coord::from_alphanumeric("c17", 19).unwrap(), Coord::new(2, 2));
        assert_eq!(Coord::from_alphanumeric("j10", 19).unwrap(), Coord::new(8, 9));
        assert_eq!(Coord::from_alphanumeric("T1", 19).unwrap(), Coord::new(18, 18));
        assert!(Coord::from_alphanumeric("i5", 19).is_err());
        assert!(Coord::from_alphanumeric("a20", 19).is_err());
        assert!(Coord::from_alphanumeric("zz", 19).is_err());
    }

    #[test]
    fn coord_set_operations() {
        let mut a: CoordSet = [Coord::new(0, 0), Coord::new(1, 1)].into_iter().collect();
        let b: CoordSet = [Coord::new(1, 1), Coord::new(2, 2)].into_iter().collect();
        assert_eq!(a.intersect(&b).list(), vec![Coord::new(1, 1)]);
        a.add(Coord::new(1, 1));
        assert_eq!(a.len(), 2);
        a.remove_all(&b);
        assert_eq!(a.list(), vec![Coord::new(0, 0)]);
    }

    #[test]
    fn stone_set_json_shape() {
        let s = StoneSet::new([Coord::new(3, 4)].into_iter().collect(), Color::Black);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["color"], 1);
        assert_eq!(v["coords"][0]["x"], 3);
        assert_eq!(v["coords"][0]["y"], 4);
    }
}
