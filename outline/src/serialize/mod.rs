use std::fmt;

use crate::Outline;
use crate::block::{Block, Heading, List, ListItem, NodeId};

/// Serialization failure: a raw-text cache no longer matches the structure
/// it claims to describe. The caches are engine-owned derived data; a
/// mismatch means some mutation skipped its refresh, and emitting the cache
/// would write a tree that disagrees with itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializeError {
    StaleCache { id: NodeId },
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::StaleCache { id } => {
                write!(f, "stale raw-text cache on node {}", id)
            }
        }
    }
}

impl std::error::Error for SerializeError {}

/// Serialize an outline back to markdown text.
///
/// Output is canonical: `#`-headings, `- ` / `1. ` markers with ordered
/// items renumbered from 1, two-space nesting, a blank line before every
/// heading except the first block. For any freshly parsed tree this is the
/// exact structural inverse of the parser.
///
/// Every raw-text cache is validated against a freshly derived rendering
/// before anything is emitted, so a half-refreshed tree is rejected whole
/// rather than written out partially wrong.
pub fn serialize(outline: &Outline) -> Result<String, SerializeError> {
    for block in &outline.blocks {
        match block {
            Block::Heading(h) => validate_heading(h)?,
            Block::List(l) => validate_list(l)?,
            Block::Paragraph(_) => {}
        }
    }

    let mut out = String::new();
    let mut prev: Option<&Block> = None;

    for block in &outline.blocks {
        if needs_separator(prev, block) {
            out.push('\n');
        }
        match block {
            Block::Heading(h) => {
                out.push_str(&h.raw);
                out.push('\n');
            }
            Block::List(l) => {
                out.push_str(&l.raw);
            }
            Block::Paragraph(p) => {
                out.push_str(&p.text);
                out.push('\n');
            }
        }
        prev = Some(block);
    }

    Ok(out)
}

/// Blank line between top-level blocks, except that a list attaches
/// directly under the heading it belongs to.
fn needs_separator(prev: Option<&Block>, cur: &Block) -> bool {
    match prev {
        None => false,
        Some(Block::Heading(_)) => !matches!(cur, Block::List(_)),
        Some(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Cache validation
// ---------------------------------------------------------------------------

fn validate_heading(heading: &Heading) -> Result<(), SerializeError> {
    if heading.raw != heading.rendered() {
        return Err(SerializeError::StaleCache { id: heading.id });
    }
    Ok(())
}

fn validate_list(list: &List) -> Result<(), SerializeError> {
    if list.raw != fresh_list(list) {
        return Err(SerializeError::StaleCache { id: list.id });
    }
    for (index, item) in list.items.iter().enumerate() {
        if item.raw != fresh_item(item, list.ordered, index) {
            return Err(SerializeError::StaleCache { id: item.id });
        }
        if let Some(nested) = &item.nested {
            validate_list(nested)?;
        }
    }
    Ok(())
}

/// Derive a list's rendering from structure alone, ignoring every cache.
fn fresh_list(list: &List) -> String {
    list.items
        .iter()
        .enumerate()
        .map(|(index, item)| fresh_item(item, list.ordered, index))
        .collect()
}

fn fresh_item(item: &ListItem, ordered: bool, index: usize) -> String {
    let mut out = format!("{}{}\n", ListItem::marker(ordered, index), item.text);
    if let Some(nested) = &item.nested {
        for line in fresh_list(nested).lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
