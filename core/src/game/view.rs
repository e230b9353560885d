// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building frames and tree views from the current state

use super::GameTree;
use crate::coord::{Coord, CoordSet};
use crate::frame::{Frame, FrameType, Label, Marks, Metadata, NodeJson, Pen, TreeJson, TreeJsonType};
use std::collections::BTreeMap;

impl GameTree {
    /// Marks on the current node
    pub fn marks(&self) -> Marks {
        let node = &self.arena[self.current];
        let coords = |key: &str| -> Vec<Coord> {
            node.fields
                .get_field(key)
                .iter()
                .filter_map(|v| Coord::from_letters(v))
                .collect::<CoordSet>()
                .list()
        };
        let labels = node
            .fields
            .get_field("LB")
            .iter()
            .filter_map(|v| {
                let (at, text) = v.split_once(':')?;
                Some(Label {
                    coord: Coord::from_letters(at)?,
                    text: text.to_string(),
                })
            })
            .collect();
        let pens = node
            .fields
            .get_field("PX")
            .iter()
            .filter_map(|v| Pen::from_field(v))
            .collect();

        Marks {
            current: node.coord,
            squares: coords("SQ"),
            triangles: coords("TR"),
            labels,
            pens,
        }
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            size: self.size,
            fields: self.arena[self.root].fields.clone(),
        }
    }

    /// Comment lines of the current node
    pub fn comments(&self) -> Vec<String> {
        self.arena[self.current].fields.get_field("C").to_vec()
    }

    /// The tree shape at the requested level of detail
    pub fn tree_json(&self, level: TreeJsonType) -> TreeJson {
        let mut up = 0;
        let mut root = 0;
        let nodes = if level >= TreeJsonType::PartialNodes {
            let start = if level == TreeJsonType::Full {
                self.root
            } else {
                let cur = &self.arena[self.current];
                up = cur.up.unwrap_or(cur.index);
                root = cur.index;
                self.current
            };
            let map: BTreeMap<usize, NodeJson> = self
                .arena
                .preorder(start)
                .into_iter()
                .map(|i| {
                    let n = &self.arena[i];
                    let json = NodeJson {
                        color: n.color,
                        down: n.down.clone(),
                        depth: n.depth,
                        comment: n.has_comment(),
                    };
                    (i, json)
                })
                .collect();
            Some(map)
        } else {
            None
        };

        let preferred = (level >= TreeJsonType::CurrentAndPreferred).then(|| {
            let mut path = vec![self.root];
            let mut node = &self.arena[self.root];
            while let Some(next) = node.preferred() {
                path.push(next);
                node = &self.arena[next];
            }
            path
        });

        TreeJson {
            nodes,
            current: self.current,
            preferred,
            depth: self.arena.max_depth(self.root),
            up,
            root,
        }
    }

    /// Everything a client needs to redraw from scratch
    pub fn full_frame(&self, level: TreeJsonType) -> Frame {
        let node = &self.arena[self.current];
        Frame {
            diff: Some(self.board.current_diff()),
            marks: Some(self.marks()),
            comments: Some(self.comments()),
            metadata: Some(self.metadata()),
            tree: Some(self.tree_json(level)),
            black_caps: node.black_caps,
            white_caps: node.white_caps,
            ..Frame::new(FrameType::Full)
        }
    }

    /// Diff frame showing territory. Dead stones count as captures for
    /// the side that owns the territory around them.
    pub fn score_frame(&self) -> Frame {
        let result = self.score();
        let node = &self.arena[self.current];
        Frame {
            black_caps: node.black_caps + result.black_area.len() + result.white_dead.len(),
            white_caps: node.white_caps + result.white_area.len() + result.black_dead.len(),
            black_area: Some(result.black_area),
            white_area: Some(result.white_area),
            dame: Some(result.dame),
            ..Frame::new(FrameType::Diff)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Color, Coord, Fields, FrameType, GameTree, TreeJsonType};

    fn sample() -> GameTree {
        let mut tree = GameTree::new(9);
        tree.add_node(Some(Coord::new(2, 2)), Color::Black, Fields::new(), None, false);
        tree.add_node(Some(Coord::new(3, 3)), Color::White, Fields::new(), None, false);
        tree.left();
        tree.add_node(Some(Coord::new(4, 4)), Color::White, Fields::new(), None, false);
        tree
    }

    #[test]
    fn marks_read_annotations() {
        let mut tree = sample();
        tree.add_current_field("TR", "aa");
        tree.add_current_field("TR", "aa");
        tree.add_current_field("SQ", "bb");
        tree.add_current_field("LB", "cc:A");
        tree.add_current_field("LB", "broken");
        tree.add_current_field("PX", "1:2:3:4:red");
        tree.add_current_field("PX", "1:2:red");
        let marks = tree.marks();
        assert_eq!(marks.current, Some(Coord::new(4, 4)));
        assert_eq!(marks.triangles, vec![Coord::new(0, 0)]);
        assert_eq!(marks.squares, vec![Coord::new(1, 1)]);
        assert_eq!(marks.labels.len(), 1);
        assert_eq!(marks.labels[0].text, "A");
        assert_eq!(marks.pens.len(), 1);
    }

    #[test]
    fn tree_levels() {
        let tree = sample();
        let only = tree.tree_json(TreeJsonType::CurrentOnly);
        assert!(only.nodes.is_none() && only.preferred.is_none());
        assert_eq!(only.depth, 2);

        let pref = tree.tree_json(TreeJsonType::CurrentAndPreferred);
        assert_eq!(pref.preferred, Some(vec![0, 1, 3]));

        let partial = tree.tree_json(TreeJsonType::PartialNodes);
        let nodes = partial.nodes.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(partial.up, 1);
        assert_eq!(partial.root, 3);

        let full = tree.tree_json(TreeJsonType::Full);
        assert_eq!(full.nodes.unwrap().len(), 4);
    }

    #[test]
    fn full_frame_carries_board() {
        let tree = sample();
        let frame = tree.full_frame(TreeJsonType::Full);
        assert_eq!(frame.frame_type, FrameType::Full);
        let diff = frame.diff.unwrap();
        assert_eq!(diff.add[0].coords.len(), 1);
        assert_eq!(diff.add[1].coords.len(), 1);
        assert_eq!(frame.metadata.unwrap().size, 9);
    }
}
