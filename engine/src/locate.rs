//! Tree locator: resolve a structural path against one outline snapshot.

use outline::Outline;
use outline::block::{Block, List, NodeId};

use crate::handle::NodePath;

/// What kind of structural node a path landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Heading,
    List,
    Item,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Heading => "heading",
            NodeKind::List => "list",
            NodeKind::Item => "list item",
        }
    }
}

/// A located node with its parent context, returned by value — no shared
/// mutable traversal state leaks out of the walk.
#[derive(Debug, Clone)]
pub struct Found {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Visible text (empty for lists, which have none of their own).
    pub text: String,
    /// Index among structural siblings at the final level.
    pub index: usize,
    /// The list owning the matched item, if the match is an item.
    pub enclosing_list: Option<NodeId>,
}

/// One level of the walk: either the document's top-level block sequence or
/// a list's item collection.
enum Level<'a> {
    Blocks(&'a [Block]),
    Items(&'a List),
}

/// Resolve a structural path to a node within `outline`.
///
/// Descent rules per segment: a list descends into its items; an item into
/// its nested list's items; a heading into the list immediately following
/// it in the same parent collection (the mind-map rendering convention —
/// a heading's visual children are not a grammar relation). Any index past
/// the structural siblings at a level, or a descent into a node without
/// children, resolves to None.
pub fn locate(outline: &Outline, path: &NodePath) -> Option<Found> {
    let mut level = Level::Blocks(&outline.blocks);
    let segments = path.segments();

    for (depth, &segment) in segments.iter().enumerate() {
        let last = depth + 1 == segments.len();

        match level {
            Level::Blocks(blocks) => {
                let position = nth_structural(blocks, segment)?;
                match &blocks[position] {
                    Block::Heading(h) => {
                        if last {
                            return Some(Found {
                                id: h.id,
                                kind: NodeKind::Heading,
                                text: h.text.clone(),
                                index: segment,
                                enclosing_list: None,
                            });
                        }
                        let following = following_list(blocks, position)?;
                        level = Level::Items(following);
                    }
                    Block::List(l) => {
                        if last {
                            return Some(Found {
                                id: l.id,
                                kind: NodeKind::List,
                                text: String::new(),
                                index: segment,
                                enclosing_list: None,
                            });
                        }
                        level = Level::Items(l);
                    }
                    Block::Paragraph(_) => unreachable!("paragraphs are not structural"),
                }
            }

            Level::Items(list) => {
                let item = list.items.get(segment)?;
                if last {
                    return Some(Found {
                        id: item.id,
                        kind: NodeKind::Item,
                        text: item.text.clone(),
                        index: segment,
                        enclosing_list: Some(list.id),
                    });
                }
                level = Level::Items(item.nested.as_ref()?);
            }
        }
    }

    None
}

/// Position of the nth structural block in a top-level sequence.
fn nth_structural(blocks: &[Block], n: usize) -> Option<usize> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_structural())
        .nth(n)
        .map(|(position, _)| position)
}

/// The list immediately following a heading in the same collection:
/// the first list after it, skipping paragraphs, stopping at any heading.
pub(crate) fn following_list(blocks: &[Block], heading_position: usize) -> Option<&List> {
    following_list_position(blocks, heading_position).map(|position| {
        match &blocks[position] {
            Block::List(l) => l,
            _ => unreachable!("position points at a list"),
        }
    })
}

pub(crate) fn following_list_position(blocks: &[Block], heading_position: usize) -> Option<usize> {
    for (position, block) in blocks.iter().enumerate().skip(heading_position + 1) {
        match block {
            Block::List(_) => return Some(position),
            Block::Heading(_) => return None,
            Block::Paragraph(_) => {}
        }
    }
    None
}
