// SPDX-License-Identifier: MIT OR Apache-2.0

//! SGF import/export and the snapshot form used for persistence

use super::GameTree;
use crate::sgf::{write_fields, SgfTree};
use crate::{GameError, Result, MAX_BOARD_SIZE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to rebuild a tree exactly, including node indices,
/// branch preferences and the viewer's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateJson {
    /// base64 of the SGF with `IX` indices
    pub sgf: String,
    pub loc: String,
    pub prefs: HashMap<String, usize>,
    pub buffer: u64,
    pub next_index: usize,
}

impl GameTree {
    /// Serialize the whole tree. With `indexes`, every node carries an
    /// `IX` property holding its index.
    pub fn to_sgf(&self, indexes: bool) -> String {
        enum Item {
            Node(usize),
            Text(char),
        }

        let mut out = String::from("(");
        let mut stack = vec![Item::Node(self.root)];
        while let Some(item) = stack.pop() {
            let i = match item {
                Item::Text(c) => {
                    out.push(c);
                    continue;
                }
                Item::Node(i) => i,
            };
            let Some(node) = self.arena.get(i) else {
                continue;
            };
            out.push(';');
            let mut fields = node.fields.clone();
            fields.delete_field("IX");
            fields.sort_fields();
            write_fields(&mut out, &fields);
            if indexes {
                out.push_str(&format!("IX[{}]", node.index));
            }

            if node.down.len() == 1 {
                stack.push(Item::Node(node.down[0]));
            } else {
                for child in node.down.iter().rev() {
                    stack.push(Item::Text(')'));
                    stack.push(Item::Node(*child));
                    stack.push(Item::Text('('));
                }
            }
        }
        out.push(')');
        out
    }

    /// Build a tree from SGF text. Nothing is built unless the whole
    /// record is valid.
    pub fn from_sgf(text: &str) -> Result<GameTree> {
        let parsed = SgfTree::parse(text)?;
        let root = parsed
            .root()
            .ok_or_else(|| GameError::Parse { position: 0, message: "empty game tree".into() })?;
        let size = board_size(root.fields.get_field("SZ"))?;

        enum Item {
            Node(usize),
            Left,
        }

        let mut tree = GameTree::empty(size);
        let mut stack = vec![Item::Node(0)];
        while let Some(item) = stack.pop() {
            let i = match item {
                Item::Left => {
                    tree.left();
                    continue;
                }
                Item::Node(i) => i,
            };
            let Some(node) = parsed.nodes.get(i) else {
                continue;
            };

            let index = node
                .fields
                .get_field("IX")
                .first()
                .and_then(|v| v.trim().parse::<usize>().ok());
            let mut fields = node.fields.clone();
            fields.delete_field("IX");
            let color = fields.color();
            let coord = fields.coord();

            if let Some(c) = coord {
                if !c.is_valid(size) {
                    return Err(GameError::OffBoard(c));
                }
                if !tree.board.legal(c, color) {
                    return Err(GameError::SuicideInRecord);
                }
            }

            if fields.is_pass() {
                tree.add_pass_node(color, fields, index);
            } else if fields.is_move() {
                tree.add_node(coord, color, fields, index, true);
            } else {
                tree.add_field_node(fields, index);
            }

            for child in node.down.iter().rev() {
                stack.push(Item::Left);
                stack.push(Item::Node(*child));
            }
            tree.head = tree.current;
        }

        tree.rewind();
        tree.reset_prefs();
        Ok(tree)
    }

    /// Snapshot for persistence
    pub fn save(&self) -> StateJson {
        StateJson {
            sgf: STANDARD.encode(self.to_sgf(true)),
            loc: self.locate(),
            prefs: self.prefs(),
            buffer: self.input_buffer,
            next_index: self.next_index,
        }
    }

    /// Rebuild a tree from a snapshot made by [`GameTree::save`]
    pub fn load(state: &StateJson) -> Result<GameTree> {
        let bytes = STANDARD
            .decode(state.sgf.as_bytes())
            .map_err(|e| GameError::BadState(format!("sgf is not base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| GameError::BadState(format!("sgf is not utf-8: {e}")))?;
        let mut tree = GameTree::from_sgf(&text)?;
        tree.set_prefs(&state.prefs);
        tree.next_index = tree.next_index.max(state.next_index);
        tree.input_buffer = state.buffer;
        tree.set_location(&state.loc);
        Ok(tree)
    }
}

/// SZ must be absent (19) or one number between 1 and the largest board
fn board_size(values: &[String]) -> Result<u8> {
    match values {
        [] => Ok(19),
        [one] => one
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=MAX_BOARD_SIZE).contains(n))
            .ok_or_else(|| GameError::BadSize(one.clone())),
        _ => Err(GameError::BadSize("SZ cannot be a multifield".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Coord};

    #[test]
    fn import_reads_size_moves_and_variations() {
        let tree = GameTree::from_sgf("(;GM[1]SZ[9];B[cc];W[dd](;B[ee])(;B[ff]))").unwrap();
        assert_eq!(tree.size(), 9);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.current(), tree.root());
        assert_eq!(tree.next_index(), 5);
        let dd = tree.node(2).unwrap();
        assert_eq!(dd.down.len(), 2);
        assert_eq!(dd.color, Color::White);
    }

    #[test]
    fn import_rejects_bad_records() {
        assert!(matches!(GameTree::from_sgf("(;SZ[9][13])"), Err(GameError::BadSize(_))));
        assert!(matches!(GameTree::from_sgf("(;SZ[x])"), Err(GameError::BadSize(_))));
        assert!(matches!(GameTree::from_sgf("(;SZ[40])"), Err(GameError::BadSize(_))));
        assert!(matches!(GameTree::from_sgf("(;SZ[9];B[cc"), Err(GameError::Parse { .. })));
        // white plays into the corner black already surrounds
        let suicide = "(;SZ[9]AB[ba][ab];W[aa])";
        assert_eq!(GameTree::from_sgf(suicide).unwrap_err(), GameError::SuicideInRecord);
        assert_eq!(
            GameTree::from_sgf("(;SZ[9];B[kk])").unwrap_err(),
            GameError::OffBoard(Coord::new(10, 10))
        );
    }

    #[test]
    fn tt_is_a_pass() {
        let tree = GameTree::from_sgf("(;SZ[19];B[tt];W[aa])").unwrap();
        let pass = tree.node(1).unwrap();
        assert_eq!(pass.coord, None);
        assert!(pass.diff.is_none());
    }

    #[test]
    fn indexes_survive_export() {
        let tree = GameTree::from_sgf("(;SZ[9]IX[4];B[cc]IX[9];W[dd])").unwrap();
        assert_eq!(tree.root(), 4);
        assert!(tree.node(9).is_some());
        assert!(tree.next_index() > 9);
        let text = tree.to_sgf(true);
        assert!(text.contains("IX[9]"));
        assert!(!tree.to_sgf(false).contains("IX"));
    }

    #[test]
    fn save_and_load_keep_position() {
        let mut tree = GameTree::new(9);
        tree.add_node(Some(Coord::new(2, 2)), Color::Black, Default::default(), None, false);
        tree.left();
        tree.add_node(Some(Coord::new(3, 3)), Color::Black, Default::default(), None, false);
        tree.add_node(Some(Coord::new(4, 4)), Color::White, Default::default(), None, false);
        tree.set_input_buffer(400);
        let state = tree.save();

        let loaded = GameTree::load(&state).unwrap();
        assert_eq!(loaded.current(), tree.current());
        assert_eq!(loaded.board(), tree.board());
        assert_eq!(loaded.prefs(), tree.prefs());
        assert_eq!(loaded.input_buffer(), 400);
        assert_eq!(loaded.next_index(), tree.next_index());
    }

    #[test]
    fn load_rejects_garbage() {
        let state = StateJson {
            sgf: "***".into(),
            loc: String::new(),
            prefs: HashMap::new(),
            buffer: 0,
            next_index: 0,
        };
        assert!(matches!(GameTree::load(&state), Err(GameError::BadState(_))));
    }
}
