// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frames: what clients need to redraw after a change

use crate::coord::Coord;
use crate::diff::Diff;
use crate::fields::Fields;
use crate::Color;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeMap;

/// Whether a frame patches the client's board or replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum FrameType {
    Diff = 0,
    Full = 1,
}

/// How much of the tree a frame carries. Levels are cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TreeJsonType {
    CurrentOnly,
    CurrentAndPreferred,
    PartialNodes,
    Full,
}

/// Text label drawn on a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub coord: Coord,
    pub text: String,
}

/// Freehand pen stroke in board coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
}

impl Pen {
    /// Read a stored `x0:y0:x1:y1:color` value
    pub fn from_field(value: &str) -> Option<Pen> {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 5 {
            return None;
        }
        Some(Pen {
            x0: parts[0].parse().ok()?,
            y0: parts[1].parse().ok()?,
            x1: parts[2].parse().ok()?,
            y1: parts[3].parse().ok()?,
            color: parts[4].to_string(),
        })
    }

    pub fn to_field(&self) -> String {
        format!("{:.4}:{:.4}:{:.4}:{:.4}:{}", self.x0, self.y0, self.x1, self.y1, self.color)
    }
}

/// Annotations on the current node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marks {
    pub current: Option<Coord>,
    pub squares: Vec<Coord>,
    pub triangles: Vec<Coord>,
    pub labels: Vec<Label>,
    pub pens: Vec<Pen>,
}

/// Root properties and board size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub size: u8,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    pub color: Color,
    pub down: Vec<usize>,
    pub depth: usize,
    pub comment: bool,
}

/// Tree shape sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeJson {
    pub nodes: Option<BTreeMap<usize, NodeJson>>,
    pub current: usize,
    pub preferred: Option<Vec<usize>>,
    pub depth: usize,
    /// Parent of the first node in `nodes` when only a subtree is sent
    pub up: usize,
    /// First node in `nodes` when only a subtree is sent
    pub root: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub diff: Option<Diff>,
    pub marks: Option<Marks>,
    pub comments: Option<Vec<String>>,
    pub metadata: Option<Metadata>,
    pub tree: Option<TreeJson>,
    pub black_caps: usize,
    pub white_caps: usize,
    pub black_area: Option<Vec<Coord>>,
    pub white_area: Option<Vec<Coord>>,
    pub dame: Option<Vec<Coord>>,
}

impl Frame {
    /// An empty frame of the given type
    pub fn new(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            diff: None,
            marks: None,
            comments: None,
            metadata: None,
            tree: None,
            black_caps: 0,
            white_caps: 0,
            black_area: None,
            white_area: None,
            dame: None,
        }
    }

    /// A diff frame carrying only a board delta
    pub fn with_diff(diff: Option<Diff>) -> Self {
        Self {
            diff,
            ..Self::new(FrameType::Diff)
        }
    }
}
