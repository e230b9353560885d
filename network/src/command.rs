// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed board commands.
//!
//! Events arrive with loosely typed JSON values. [`decode`] turns them into
//! a closed set of [`Command`]s before anything touches the tree, and
//! [`execute`] applies a command and says what clients should redraw.

use crate::event::Event;
use goboard_core::{
    Color, Coord, Diff, Fields, Frame, GameError, GameTree, PatternMove, Pen, TreeJsonType,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("bad value for {event}: expected {expected}")]
    WrongShape { event: String, expected: &'static str },

    #[error("unhandled event type: {0}")]
    UnknownEvent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddStone { coord: Coord, color: Color },
    Pass { color: Color },
    RemoveStone { coord: Coord },
    Triangle { coord: Coord },
    Square { coord: Coord },
    Letter { coord: Coord, letter: String },
    Number { coord: Coord, number: i64 },
    RemoveMark { coord: Coord },
    Left,
    Right,
    Up,
    Down,
    Rewind,
    FastForward,
    GotoGrid { index: usize },
    GotoCoord { coord: Coord },
    Comment { text: String },
    /// A pen stroke; a missing start point is stored as -1
    Draw { pen: Pen },
    ErasePen,
    Cut,
    Copy,
    Clipboard,
    Graft { text: String },
    Score,
    MarkDead { coord: Coord },
}

/// Turn an inbound event into a command
pub fn decode(evt: &Event) -> Result<Command, DecodeError> {
    let name = evt.event.as_str();
    let value = &evt.value;
    let cmd = match name {
        "add_stone" => Command::AddStone {
            coord: coord(name, field(name, value, "coords")?)?,
            color: stone_color(name, field(name, value, "color")?)?,
        },
        "pass" => Command::Pass {
            color: stone_color(name, present(name, value)?)?,
        },
        "remove_stone" => Command::RemoveStone { coord: coord(name, value)? },
        "triangle" => Command::Triangle { coord: coord(name, value)? },
        "square" => Command::Square { coord: coord(name, value)? },
        "letter" => Command::Letter {
            coord: coord(name, field(name, value, "coords")?)?,
            letter: string(name, field(name, value, "letter")?)?,
        },
        "number" => {
            let number = field(name, value, "number")?
                .as_f64()
                .ok_or_else(|| shape(name, "a number"))?;
            Command::Number {
                coord: coord(name, field(name, value, "coords")?)?,
                number: number as i64,
            }
        }
        "remove_mark" => Command::RemoveMark { coord: coord(name, value)? },
        "left" => Command::Left,
        "right" => Command::Right,
        "up" => Command::Up,
        "down" => Command::Down,
        "rewind" => Command::Rewind,
        "fastforward" => Command::FastForward,
        "goto_grid" => Command::GotoGrid {
            index: present(name, value)?
                .as_u64()
                .ok_or_else(|| shape(name, "a node index"))? as usize,
        },
        "goto_coord" => Command::GotoCoord { coord: coord(name, value)? },
        "comment" => Command::Comment {
            text: string(name, present(name, value)?)?,
        },
        "draw" => Command::Draw { pen: pen(name, present(name, value)?)? },
        "erase_pen" => Command::ErasePen,
        "cut" => Command::Cut,
        "copy" => Command::Copy,
        "clipboard" => Command::Clipboard,
        "graft" => Command::Graft {
            text: string(name, present(name, value)?)?,
        },
        "score" => Command::Score,
        "markdead" => Command::MarkDead { coord: coord(name, value)? },
        _ => return Err(DecodeError::UnknownEvent(name.to_string())),
    };
    Ok(cmd)
}

fn shape(event: &str, expected: &'static str) -> DecodeError {
    DecodeError::WrongShape {
        event: event.to_string(),
        expected,
    }
}

fn present<'a>(event: &str, value: &'a Value) -> Result<&'a Value, DecodeError> {
    if value.is_null() {
        Err(DecodeError::MissingValue(event.to_string()))
    } else {
        Ok(value)
    }
}

fn field<'a>(event: &str, value: &'a Value, key: &'static str) -> Result<&'a Value, DecodeError> {
    let obj = present(event, value)?
        .as_object()
        .ok_or_else(|| shape(event, "an object"))?;
    obj.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| DecodeError::MissingValue(format!("{event}.{key}")))
}

fn string(event: &str, value: &Value) -> Result<String, DecodeError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| shape(event, "a string"))
}

/// A whole, non-negative number small enough for a board axis
fn axis(value: &Value) -> Option<u8> {
    let f = value.as_f64()?;
    if f.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&f) {
        Some(f as u8)
    } else {
        None
    }
}

fn coord(event: &str, value: &Value) -> Result<Coord, DecodeError> {
    let arr = present(event, value)?
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| shape(event, "[x, y]"))?;
    match (axis(&arr[0]), axis(&arr[1])) {
        (Some(x), Some(y)) => Ok(Coord::new(x, y)),
        _ => Err(shape(event, "[x, y]")),
    }
}

fn stone_color(event: &str, value: &Value) -> Result<Color, DecodeError> {
    match value.as_i64().and_then(Color::from_number) {
        Some(c @ (Color::Black | Color::White)) => Ok(c),
        _ => Err(shape(event, "1 (black) or 2 (white)")),
    }
}

fn pen(event: &str, value: &Value) -> Result<Pen, DecodeError> {
    const EXPECTED: &str = "[x0, y0, x1, y1, color]";
    let arr = value
        .as_array()
        .filter(|a| a.len() == 5)
        .ok_or_else(|| shape(event, EXPECTED))?;
    let start = |v: &Value| -> Result<f64, DecodeError> {
        if v.is_null() {
            Ok(-1.0)
        } else {
            v.as_f64().ok_or_else(|| shape(event, EXPECTED))
        }
    };
    let end = |v: &Value| v.as_f64().ok_or_else(|| shape(event, EXPECTED));
    Ok(Pen {
        x0: start(&arr[0])?,
        y0: start(&arr[1])?,
        x1: end(&arr[2])?,
        y1: end(&arr[3])?,
        color: arr[4]
            .as_str()
            .ok_or_else(|| shape(event, EXPECTED))?
            .to_string(),
    })
}

/// A diff frame with the current marks and tree at `level`
fn diff_frame(tree: &GameTree, diff: Option<Diff>, level: TreeJsonType) -> Frame {
    let node = tree.current_node();
    Frame {
        marks: Some(tree.marks()),
        tree: Some(tree.tree_json(level)),
        black_caps: node.black_caps,
        white_caps: node.white_caps,
        ..Frame::with_diff(diff)
    }
}

/// After a single step along the tree
fn step_frame(tree: &GameTree, diff: Option<Diff>) -> Frame {
    Frame {
        comments: Some(tree.comments()),
        ..diff_frame(tree, diff, TreeJsonType::CurrentOnly)
    }
}

fn move_fields(coord: Option<Coord>, color: Color) -> Fields {
    let mut fields = Fields::new();
    fields.add_field(
        color.move_key(),
        coord.map(|c| c.to_letters()).unwrap_or_default(),
    );
    fields
}

/// Apply a command to the tree.
///
/// `Ok(None)` means the tree has nothing new to draw and the caller should
/// echo the original event (or drop it, for rejected moves).
pub fn execute(tree: &mut GameTree, cmd: Command) -> Result<Option<Frame>, GameError> {
    let frame = match cmd {
        Command::AddStone { coord, color } => {
            if !coord.is_valid(tree.size()) {
                return Ok(None);
            }
            if tree.child_with(Some(coord), color).is_some() {
                tree.add_node(Some(coord), color, Fields::new(), None, false);
                return Ok(Some(tree.full_frame(TreeJsonType::CurrentAndPreferred)));
            }
            let mut probe = tree.board().clone();
            if !probe.legal(coord, color) {
                return Ok(None);
            }
            let diff = tree.add_node(Some(coord), color, move_fields(Some(coord), color), None, false);
            diff_frame(tree, diff, TreeJsonType::PartialNodes)
        }
        Command::Pass { color } => {
            tree.add_pass_node(color, move_fields(None, color), None);
            diff_frame(tree, None, TreeJsonType::PartialNodes)
        }
        Command::RemoveStone { coord } => {
            if !coord.is_valid(tree.size()) {
                return Ok(None);
            }
            let mut fields = Fields::new();
            fields.add_field("AE", coord.to_letters());
            let diff = tree.add_field_node(fields, None);
            diff_frame(tree, Some(diff), TreeJsonType::PartialNodes)
        }
        Command::Triangle { coord } => {
            tree.add_current_field("TR", coord.to_letters());
            return Ok(None);
        }
        Command::Square { coord } => {
            tree.add_current_field("SQ", coord.to_letters());
            return Ok(None);
        }
        Command::Letter { coord, letter } => {
            tree.add_current_field("LB", format!("{}:{letter}", coord.to_letters()));
            return Ok(None);
        }
        Command::Number { coord, number } => {
            tree.add_current_field("LB", format!("{}:{number}", coord.to_letters()));
            return Ok(None);
        }
        Command::RemoveMark { coord } => {
            let at = coord.to_letters();
            let labels: Vec<String> = tree
                .current_node()
                .fields
                .get_field("LB")
                .iter()
                .filter(|v| v.starts_with(&at))
                .cloned()
                .collect();
            for label in labels {
                tree.remove_current_field("LB", &label);
            }
            tree.remove_current_field("SQ", &at);
            tree.remove_current_field("TR", &at);
            return Ok(None);
        }
        Command::Left => {
            let diff = tree.left();
            step_frame(tree, diff)
        }
        Command::Right => {
            let diff = tree.right();
            step_frame(tree, diff)
        }
        Command::Up => {
            tree.up();
            diff_frame(tree, None, TreeJsonType::CurrentAndPreferred)
        }
        Command::Down => {
            tree.down();
            diff_frame(tree, None, TreeJsonType::CurrentAndPreferred)
        }
        Command::Rewind => {
            tree.rewind();
            tree.full_frame(TreeJsonType::CurrentOnly)
        }
        Command::FastForward => {
            tree.fast_forward();
            tree.full_frame(TreeJsonType::CurrentOnly)
        }
        Command::GotoGrid { index } => {
            tree.goto_index(index)?;
            tree.full_frame(TreeJsonType::CurrentAndPreferred)
        }
        Command::GotoCoord { coord } => {
            tree.goto_coord(coord);
            tree.full_frame(TreeJsonType::CurrentAndPreferred)
        }
        Command::Comment { text } => {
            tree.add_current_field("C", format!("{text}\n"));
            return Ok(None);
        }
        Command::Draw { pen } => {
            tree.add_current_field("PX", pen.to_field());
            return Ok(None);
        }
        Command::ErasePen => {
            tree.delete_current_field("PX");
            return Ok(None);
        }
        Command::Cut => {
            let diff = tree.cut();
            Frame {
                comments: Some(tree.comments()),
                ..diff_frame(tree, diff, TreeJsonType::Full)
            }
        }
        Command::Copy => {
            tree.copy();
            return Ok(None);
        }
        Command::Clipboard => {
            tree.paste();
            diff_frame(tree, None, TreeJsonType::Full)
        }
        Command::Graft { text } => {
            graft(tree, &text)?;
            return Ok(None);
        }
        Command::Score => tree.score_frame(),
        Command::MarkDead { coord } => {
            tree.mark_dead(coord);
            tree.score_frame()
        }
    };
    Ok(Some(frame))
}

/// `"[N] tok tok ..."`: alternate colors from the parent's move, under
/// main-line move N or the current node.
fn graft(tree: &mut GameTree, text: &str) -> Result<(), GameError> {
    let mut tokens = text.split_whitespace().peekable();
    let parent = match tokens.peek().and_then(|t| t.parse::<usize>().ok()) {
        Some(n) => {
            tokens.next();
            tree.trunk_num(n)?
        }
        None => tree.current(),
    };

    let mut color = tree
        .node(parent)
        .map(|n| n.color)
        .filter(|c| *c != Color::Empty)
        .unwrap_or(Color::White);
    let mut moves = Vec::new();
    for tok in tokens {
        let coord = Coord::from_alphanumeric(tok, tree.size())?;
        color = color.opposite();
        moves.push(PatternMove::new(Some(coord), color));
    }
    tree.smart_graft(parent, &moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evt(name: &str, value: Value) -> Event {
        Event::new(name, value)
    }

    #[test]
    fn decode_add_stone() {
        let cmd = decode(&evt("add_stone", json!({"coords": [3, 4], "color": 1}))).unwrap();
        assert_eq!(
            cmd,
            Command::AddStone {
                coord: Coord::new(3, 4),
                color: Color::Black
            }
        );
    }

    #[test]
    fn decode_rejects_bad_shapes() {
        assert!(matches!(
            decode(&evt("add_stone", json!({"coords": [3], "color": 1}))),
            Err(DecodeError::WrongShape { .. })
        ));
        assert!(matches!(
            decode(&evt("add_stone", json!({"coords": [-1, 2], "color": 1}))),
            Err(DecodeError::WrongShape { .. })
        ));
        assert!(matches!(
            decode(&evt("pass", json!(7))),
            Err(DecodeError::WrongShape { .. })
        ));
        assert_eq!(
            decode(&evt("comment", Value::Null)),
            Err(DecodeError::MissingValue("comment".into()))
        );
        assert_eq!(
            decode(&evt("letter", json!({"coords": [1, 1]}))),
            Err(DecodeError::MissingValue("letter.letter".into()))
        );
        assert_eq!(
            decode(&evt("wiggle", Value::Null)),
            Err(DecodeError::UnknownEvent("wiggle".into()))
        );
    }

    #[test]
    fn decode_draw_null_start() {
        let cmd = decode(&evt("draw", json!([null, null, 0.5, 0.25, "#f00"]))).unwrap();
        let Command::Draw { pen } = cmd else {
            panic!("expected draw");
        };
        assert_eq!((pen.x0, pen.y0, pen.x1), (-1.0, -1.0, 0.5));
        assert_eq!(pen.color, "#f00");
    }

    #[test]
    fn add_stone_frames() {
        let mut tree = GameTree::new(9);
        let cmd = Command::AddStone {
            coord: Coord::new(2, 2),
            color: Color::Black,
        };
        let frame = execute(&mut tree, cmd.clone()).unwrap().unwrap();
        assert!(frame.diff.is_some());
        assert_eq!(frame.marks.unwrap().current, Some(Coord::new(2, 2)));

        tree.left();
        let again = execute(&mut tree, cmd).unwrap().unwrap();
        assert_eq!(again.frame_type, goboard_core::FrameType::Full);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn off_board_and_occupied_moves_draw_nothing() {
        let mut tree = GameTree::new(9);
        let off = Command::AddStone {
            coord: Coord::new(9, 0),
            color: Color::Black,
        };
        assert!(execute(&mut tree, off).unwrap().is_none());

        execute(
            &mut tree,
            Command::AddStone {
                coord: Coord::new(1, 1),
                color: Color::Black,
            },
        )
        .unwrap();
        let taken = Command::AddStone {
            coord: Coord::new(1, 1),
            color: Color::White,
        };
        assert!(execute(&mut tree, taken).unwrap().is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn marks_are_added_and_removed() {
        let mut tree = GameTree::new(9);
        let at = Coord::new(0, 1);
        execute(&mut tree, Command::Triangle { coord: at }).unwrap();
        execute(&mut tree, Command::Square { coord: at }).unwrap();
        execute(&mut tree, Command::Number { coord: at, number: 3 }).unwrap();
        assert_eq!(tree.marks().labels.len(), 1);

        execute(&mut tree, Command::RemoveMark { coord: at }).unwrap();
        let marks = tree.marks();
        assert!(marks.labels.is_empty() && marks.squares.is_empty() && marks.triangles.is_empty());
    }

    #[test]
    fn goto_unknown_index_is_an_error() {
        let mut tree = GameTree::new(9);
        assert_eq!(
            execute(&mut tree, Command::GotoGrid { index: 42 }),
            Err(GameError::IndexNotFound(42))
        );
    }

    #[test]
    fn graft_under_trunk_move() {
        let mut tree = GameTree::new(19);
        execute(
            &mut tree,
            Command::AddStone {
                coord: Coord::new(3, 3),
                color: Color::Black,
            },
        )
        .unwrap();
        let before = tree.current();
        execute(&mut tree, Command::Graft { text: "1 c17 e15".into() }).unwrap();
        assert_eq!(tree.current(), before);
        assert_eq!(tree.len(), 4);

        let first = tree.current_node().down[0];
        assert_eq!(tree.node(first).unwrap().color, Color::White);
        assert_eq!(
            execute(&mut tree, Command::Graft { text: "9 c17".into() }),
            Err(GameError::TrunkTooShort)
        );
    }

    #[test]
    fn comment_appends_newline() {
        let mut tree = GameTree::new(9);
        execute(&mut tree, Command::Comment { text: "hi".into() }).unwrap();
        assert_eq!(tree.comments(), vec!["hi\n".to_string()]);
    }
}
