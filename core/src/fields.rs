// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered SGF property multimap

use crate::{Color, Coord};
use serde::{Deserialize, Serialize};

/// One SGF property with all of its values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub values: Vec<String>,
}

/// Properties of a node, in insertion order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Vec<Field>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|f| f.key == key)
    }

    /// Append a value, creating the key if needed
    pub fn add_field(&mut self, key: &str, value: impl Into<String>) {
        match self.position(key) {
            Some(i) => self.0[i].values.push(value.into()),
            None => self.0.push(Field {
                key: key.to_string(),
                values: vec![value.into()],
            }),
        }
    }

    /// Values stored under `key`, empty if absent
    pub fn get_field(&self, key: &str) -> &[String] {
        match self.position(key) {
            Some(i) => &self.0[i].values,
            None => &[],
        }
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Replace every value of `key`
    pub fn set_field(&mut self, key: &str, values: Vec<String>) {
        match self.position(key) {
            Some(i) => self.0[i].values = values,
            None => self.0.push(Field {
                key: key.to_string(),
                values,
            }),
        }
    }

    /// Replace every value of `key` with a single one
    pub fn overwrite_field(&mut self, key: &str, value: impl Into<String>) {
        self.set_field(key, vec![value.into()]);
    }

    pub fn delete_field(&mut self, key: &str) {
        if let Some(i) = self.position(key) {
            self.0.remove(i);
        }
    }

    /// Remove one value; the key goes away once it has none left
    pub fn remove_field(&mut self, key: &str, value: &str) {
        let Some(i) = self.position(key) else {
            return;
        };
        if let Some(j) = self.0[i].values.iter().position(|v| v == value) {
            self.0[i].values.remove(j);
        }
        if self.0[i].values.is_empty() {
            self.0.remove(i);
        }
    }

    pub fn sort_fields(&mut self) {
        self.0.sort_by(|a, b| a.key.cmp(&b.key));
    }

    pub fn all_fields(&self) -> &[Field] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if there is a B or W property
    pub fn is_move(&self) -> bool {
        !self.get_field("B").is_empty() || !self.get_field("W").is_empty()
    }

    /// True if the move property holds the empty pass value
    pub fn is_pass(&self) -> bool {
        let single_empty = |v: &[String]| v.len() == 1 && v[0].is_empty();
        single_empty(self.get_field("B")) || single_empty(self.get_field("W"))
    }

    /// Color of the move property, `Empty` for non-move nodes
    pub fn color(&self) -> Color {
        if !self.get_field("B").is_empty() {
            Color::Black
        } else if !self.get_field("W").is_empty() {
            Color::White
        } else {
            Color::Empty
        }
    }

    /// Coordinate of the move property, `None` for passes and setup nodes
    pub fn coord(&self) -> Option<Coord> {
        let b = self.get_field("B");
        let w = self.get_field("W");
        if b.len() == 1 {
            return Coord::from_letters(&b[0]);
        }
        if w.len() == 1 {
            return Coord::from_letters(&w[0]);
        }
        None
    }
}
