// SPDX-License-Identifier: MIT OR Apache-2.0

use goboard_core::{Board, Color, Coord, Fields, GameTree};
use proptest::prelude::*;

#[test]
fn capture_single_stone() {
    let mut board = Board::new(5);
    board.set(Coord::new(1, 1), Color::White);
    board.set(Coord::new(0, 1), Color::Black);
    board.set(Coord::new(1, 0), Color::Black);
    board.set(Coord::new(2, 1), Color::Black);

    let diff = board.play(Coord::new(1, 2), Color::Black).unwrap();
    assert_eq!(board.get(Coord::new(1, 1)), Color::Empty);
    assert_eq!(diff.removed_count(Color::White), 1);
    assert_eq!(board.get(Coord::new(1, 2)), Color::Black);
}

#[test]
fn suicide_is_rejected_without_change() {
    let mut tree = GameTree::new(5);
    let mut setup = Fields::new();
    setup.add_field("AB", "ba");
    setup.add_field("AB", "ab");
    tree.add_field_node(setup, None);

    let before = tree.board().clone();
    let cur = tree.current();
    let mut board = tree.board().clone();
    assert!(!board.legal(Coord::new(0, 0), Color::White));
    assert!(board.play(Coord::new(0, 0), Color::White).is_none());
    assert_eq!(board, before);
    assert_eq!(tree.current(), cur);
    assert_eq!(tree.len(), 2);
}

#[test]
fn capture_beats_suicide() {
    let mut board = Board::from_ascii(
        "WB...
         B....
         .....
         .....
         .....",
    )
    .unwrap();
    board.set(Coord::new(0, 0), Color::Empty);
    board.set(Coord::new(1, 1), Color::White);
    board.set(Coord::new(2, 0), Color::White);
    board.set(Coord::new(0, 2), Color::White);
    // black stones at (1,0) and (0,1) have no liberty but (0,0);
    // white playing there takes them both
    let diff = board.play(Coord::new(0, 0), Color::White).unwrap();
    assert_eq!(diff.removed_count(Color::Black), 2);
}

#[test]
fn navigation_closure() {
    let mut tree = GameTree::new(9);
    tree.add_node(Some(Coord::new(2, 2)), Color::Black, Fields::new(), None, false);
    tree.add_node(Some(Coord::new(2, 3)), Color::White, Fields::new(), None, false);
    tree.add_node(Some(Coord::new(3, 3)), Color::Black, Fields::new(), None, false);
    tree.left();

    let (cur, board) = (tree.current(), tree.board().clone());
    tree.left();
    tree.right();
    assert_eq!((tree.current(), tree.board()), (cur, &board));
    tree.right();
    tree.left();
    assert_eq!((tree.current(), tree.board()), (cur, &board));
}

#[test]
fn idempotent_resubmission() {
    let mut tree = GameTree::new(9);
    let at = Some(Coord::new(4, 4));
    tree.add_node(at, Color::Black, Fields::new(), None, false);
    let first = tree.current();
    tree.left();
    tree.add_node(at, Color::Black, Fields::new(), None, false);
    assert_eq!(tree.current(), first);
    assert_eq!(tree.root_node().down.len(), 1);
}

proptest! {
    #[test]
    fn diff_invertibility(moves in proptest::collection::vec((0u8..9, 0u8..9), 1..60)) {
        let mut board = Board::new(9);
        let mut color = Color::Black;
        for (x, y) in moves {
            let before = board.clone();
            if let Some(diff) = board.play(Coord::new(x, y), color) {
                let mut undo = board.clone();
                undo.apply_diff(&diff.invert());
                prop_assert_eq!(&undo, &before);
                prop_assert_eq!(diff.invert().invert(), diff);
                color = color.opposite();
            } else {
                prop_assert_eq!(&board, &before);
            }
        }
    }

    #[test]
    fn tree_left_right_matches_replay(moves in proptest::collection::vec((0u8..7, 0u8..7), 1..40)) {
        let mut tree = GameTree::new(7);
        let mut color = Color::Black;
        for (x, y) in moves {
            let c = Coord::new(x, y);
            let mut probe = tree.board().clone();
            if probe.legal(c, color) {
                tree.add_node(Some(c), color, Fields::new(), None, true);
                color = color.opposite();
            }
        }
        let end = tree.board().clone();
        tree.rewind();
        tree.fast_forward();
        prop_assert_eq!(tree.board(), &end);
    }
}
