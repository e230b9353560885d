// SPDX-License-Identifier: MIT OR Apache-2.0

//! SGF (Smart Game Format) parsing, generation and merging
//!
//! Parsed records are kept in a flat node list, and parsing tracks open
//! branches on an explicit stack, so neither long games nor deeply nested
//! variations recurse when they are read, walked, printed or dropped.

use crate::fields::Fields;
use crate::{GameError, Result};

/// A parsed node: its properties and the positions of its children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SgfNode {
    pub fields: Fields,
    pub down: Vec<usize>,
}

/// A parsed game record. Node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SgfTree {
    pub nodes: Vec<SgfNode>,
}

impl SgfTree {
    /// Parse SGF text. Anything before the first `(` is ignored.
    pub fn parse(text: &str) -> Result<SgfTree> {
        let mut parser = Parser::new(text);
        parser.skip_until('(')?;
        let mut tree = SgfTree::default();
        match parser.parse_branch(&mut tree)? {
            Some(0) => Ok(tree),
            Some(_) | None => Err(parser.error("empty game tree")),
        }
    }

    pub fn root(&self) -> Option<&SgfNode> {
        self.nodes.first()
    }

    pub fn root_mut(&mut self) -> Option<&mut SgfNode> {
        self.nodes.first_mut()
    }

    fn push(&mut self, fields: Fields) -> usize {
        self.nodes.push(SgfNode {
            fields,
            down: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Copy the subtree at `start` of `other` under `parent` in this tree
    pub fn graft(&mut self, parent: usize, other: &SgfTree, start: usize) {
        let mut stack = vec![(parent, start)];
        while let Some((parent, src)) = stack.pop() {
            let Some(node) = other.nodes.get(src) else {
                continue;
            };
            let new = self.push(node.fields.clone());
            self.nodes[parent].down.push(new);
            // children are pushed in reverse so they are re-added in order
            for child in node.down.iter().rev() {
                stack.push((new, *child));
            }
        }
    }

    /// Serialize with keys sorted, `]` escaped, and parentheses only
    /// around variations.
    pub fn to_sgf(&self) -> String {
        enum Item {
            Node(usize),
            Text(char),
        }

        let mut out = String::from("(");
        let mut stack = vec![Item::Node(0)];
        while let Some(item) = stack.pop() {
            let i = match item {
                Item::Text(c) => {
                    out.push(c);
                    continue;
                }
                Item::Node(i) => i,
            };
            let Some(node) = self.nodes.get(i) else {
                continue;
            };
            out.push(';');
            let mut fields = node.fields.clone();
            fields.sort_fields();
            write_fields(&mut out, &fields);

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
}

/// Append `KEY[value][value]` for every field, escaping `]`
pub(crate) fn write_fields(out: &mut String, fields: &Fields) {
    for field in fields.all_fields() {
        out.push_str(&field.key);
        for value in &field.values {
            out.push('[');
            out.push_str(&value.replace(']', "\\]"));
            out.push(']');
        }
    }
}

/// Combine several records into one collection, each game a child of a
/// fresh root.
///
/// Games whose root already holds stones are attached whole (minus rule
/// and timing properties); otherwise each first move is attached with the
/// game's player and result properties rewritten as comments. Inputs that
/// do not parse are skipped. If board sizes disagree the first input is
/// returned unchanged.
pub fn merge(sgfs: &[String]) -> String {
    match sgfs.len() {
        0 => return String::new(),
        1 => return sgfs[0].clone(),
        _ => {}
    }

    let mut merged = SgfTree::default();
    let mut root = Fields::new();
    for (k, v) in [
        ("GM", "1"),
        ("FF", "4"),
        ("CA", "UTF-8"),
        ("PB", "Black"),
        ("PW", "White"),
        ("RU", "Japanese"),
        ("KM", "6.5"),
    ] {
        root.add_field(k, v);
    }
    merged.push(root);

    let mut size: Option<String> = None;
    for sgf in sgfs {
        let mut tree = match SgfTree::parse(sgf) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("skipping unparseable sgf in merge: {}", e);
                continue;
            }
        };
        let Some(game_root) = tree.root_mut() else {
            continue;
        };

        let each_size = game_root
            .fields
            .get_field("SZ")
            .first()
            .cloned()
            .unwrap_or_else(|| "19".to_string());
        let size = size.get_or_insert_with(|| each_size.clone());
        if *size != each_size {
            tracing::warn!("merge size mismatch ({} vs {}), keeping first record", size, each_size);
            return sgfs[0].clone();
        }

        let has_stones = ["B", "W", "AB", "AW"]
            .iter()
            .any(|k| !game_root.fields.get_field(k).is_empty());
        if has_stones {
            for key in ["RU", "SZ", "KM", "TM", "OT"] {
                game_root.fields.delete_field(key);
            }
            merged.graft(0, &tree, 0);
        } else {
            let notes: Vec<String> = ["PB", "PW", "RE", "KM", "DT"]
                .iter()
                .filter_map(|k| game_root.fields.get_field(k).first().map(|v| format!("{k}: {v}")))
                .collect();
            let children = game_root.down.clone();
            for child in children {
                for note in &notes {
                    tree.nodes[child].fields.add_field("C", note.clone());
                }
                merged.graft(0, &tree, child);
            }
        }
    }

    if let Some(root) = merged.root_mut() {
        root.fields.add_field("SZ", size.unwrap_or_else(|| "19".to_string()));
    }
    merged.to_sgf()
}

struct Parser {
    text: Vec<char>,
    index: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            index: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> GameError {
        GameError::Parse {
            position: self.index,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text.get(self.index).copied()
    }

    fn read(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    fn require(&mut self, want: char) -> Result<()> {
        match self.read() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(format!("expected {want}, got {c}"))),
            None => Err(self.error(format!("expected {want}, got end of input"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.index += 1;
        }
    }

    fn skip_until(&mut self, want: char) -> Result<()> {
        while let Some(c) = self.peek() {
            if c == want {
                return Ok(());
            }
            self.index += 1;
        }
        Err(self.error(format!("no {want} found")))
    }

    /// `(` nodes-and-branches `)`. Returns the position of the branch's
    /// first node.
    ///
    /// Nested branches are tracked on an explicit stack of
    /// (first node, last node) pairs, so nesting depth is bounded only by
    /// the input size.
    fn parse_branch(&mut self, tree: &mut SgfTree) -> Result<Option<usize>> {
        self.require('(')?;
        let mut open: Vec<(Option<usize>, Option<usize>)> = vec![(None, None)];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unfinished branch, expected ')'")),
                Some(';') => {
                    let fields = self.parse_node()?;
                    let i = tree.push(fields);
                    let Some((first, current)) = open.last_mut() else {
                        return Err(self.error("unbalanced branch"));
                    };
                    match *current {
                        Some(c) => tree.nodes[c].down.push(i),
                        None => *first = Some(i),
                    }
                    *current = Some(i);
                }
                Some('(') => {
                    self.index += 1;
                    open.push((None, None));
                }
                Some(')') => {
                    self.index += 1;
                    let Some((sub, _)) = open.pop() else {
                        return Err(self.error("unbalanced branch"));
                    };
                    let Some((first, current)) = open.last_mut() else {
                        return Ok(sub);
                    };
                    match (*current, sub) {
                        (Some(c), Some(s)) => tree.nodes[c].down.push(s),
                        (None, Some(s)) => {
                            *first = Some(s);
                            *current = Some(s);
                        }
                        (_, None) => {}
                    }
                }
                Some(c) => return Err(self.error(format!("improperly formatted branch {c}"))),
            }
        }
    }

    fn parse_node(&mut self) -> Result<Fields> {
        self.require(';')?;
        let mut fields = Fields::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('(') | Some(';') | Some(')') | None => break,
                Some(c) if c.is_ascii_alphabetic() => {
                    let key = self.parse_key()?;
                    self.skip_whitespace();
                    let values = self.parse_values(&key)?;
                    fields.set_field(&key, values);
                }
                Some(c) => return Err(self.error(format!("bad property (expected key) {c}"))),
            }
        }
        Ok(fields)
    }

    fn parse_key(&mut self) -> Result<String> {
        let mut key = String::new();
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphabetic() => {
                    key.push(c.to_ascii_uppercase());
                    self.index += 1;
                }
                Some('[') => return Ok(key),
                Some(c) if c.is_whitespace() => self.skip_whitespace(),
                Some(c) => return Err(self.error(format!("bad key {c}"))),
                None => return Err(self.error("unexpected end of input in key")),
            }
        }
    }

    fn parse_values(&mut self, key: &str) -> Result<Vec<String>> {
        let mut values = vec![self.parse_value(key)?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some('[') {
                return Ok(values);
            }
            values.push(self.parse_value(key)?);
        }
    }

    fn parse_value(&mut self, key: &str) -> Result<String> {
        self.require('[')?;
        let mut value = String::new();
        loop {
            match self.read() {
                None => return Err(self.error("bad field")),
                Some(']') => break,
                Some('\\') if self.peek() == Some(']') => {
                    self.index += 1;
                    value.push(']');
                }
                Some(c) => value.push(c),
            }
        }
        // historic pass encoding
        if (key == "B" || key == "W") && value == "tt" {
            value.clear();
        }
        Ok(value)
    }
}
