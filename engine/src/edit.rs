//! The mutation engine: reparent and rename as whole-operation,
//! clone-then-commit-or-rollback transformations.
//!
//! Every entry point takes outline source text and returns either new text
//! or a diagnostic plus the untouched original — the engine holds no state
//! between calls, and no caller ever observes a half-mutated tree. Each
//! operation parses the source into a pristine tree, deep-clones it as the
//! working draft, mutates only the draft, and serializes it on success. If
//! the draft fails to serialize, the pristine clone is serialized instead.

use outline::Outline;
use outline::block::{Block, Heading, List, ListItem, NodeId};
use outline::parser::Parser;
use outline::serialize::serialize;

use crate::error::{EditError, EditWarning};
use crate::handle;
use crate::locate::{Found, NodeKind, following_list_position, locate};

/// The only reparent relation the engine implements.
pub const RELATION_CHILD: &str = "child";

/// A successful reparent. `clear_selection` tells the caller to drop any
/// tracked selection: every handle derived from the old snapshot is stale.
#[derive(Debug)]
pub struct Reparented {
    pub text: String,
    pub clear_selection: bool,
}

/// A successful rename, possibly with non-fatal diagnostics.
#[derive(Debug)]
pub struct Renamed {
    pub text: String,
    pub warnings: Vec<EditWarning>,
}

/// Move the node at `dragged_handle` under the node at `target_handle`.
///
/// Both handles are resolved to identity tags against the pristine tree
/// *before* any mutation; all later steps address nodes by id. Re-decoding
/// the target's path after detachment would pick the wrong node whenever
/// the target sat after the dragged node in a shared collection.
pub fn reparent(
    source: &str,
    dragged_handle: &str,
    target_handle: &str,
    relation: &str,
) -> Result<Reparented, EditError> {
    if relation != RELATION_CHILD {
        return Err(EditError::UnsupportedRelation(relation.to_string()));
    }
    if dragged_handle == target_handle {
        return Err(EditError::SelfReference);
    }

    let dragged_path = handle::decode(dragged_handle)
        .ok_or_else(|| EditError::HandleDecode(dragged_handle.to_string()))?;
    let target_path = handle::decode(target_handle)
        .ok_or_else(|| EditError::HandleDecode(target_handle.to_string()))?;

    let pristine = Parser::new(source.to_string(), 0).parse().outline;
    let mut draft = pristine.clone();

    let dragged = locate(&draft, &dragged_path)
        .ok_or_else(|| EditError::NodeNotFound(dragged_handle.to_string()))?;
    let target = locate(&draft, &target_path)
        .ok_or_else(|| EditError::NodeNotFound(target_handle.to_string()))?;

    if dragged.id == target.id {
        return Err(EditError::SelfReference);
    }
    if target.kind == NodeKind::List {
        return Err(EditError::UnsupportedTarget {
            handle: target_handle.to_string(),
            kind: target.kind.label(),
        });
    }

    log::debug!(
        "reparent {} ({}) under {} ({})",
        dragged_handle,
        dragged.kind.label(),
        target_handle,
        target.kind.label()
    );

    let detached = detach(&mut draft, dragged.id)
        .ok_or_else(|| EditError::NodeNotFound(dragged_handle.to_string()))?;
    let item = coerce_to_item(detached);

    let nested_list_id = draft.fresh_id();
    let attached = match target.kind {
        NodeKind::Item => {
            let mut slot = Some(item);
            attach_under_item(&mut draft, target.id, &mut slot, nested_list_id)
        }
        NodeKind::Heading => attach_under_heading(&mut draft, target.id, item, nested_list_id),
        NodeKind::List => unreachable!("list targets rejected above"),
    };
    if !attached {
        // The target vanished mid-operation: it lived inside the dragged
        // subtree. The draft is discarded, so nothing was harmed.
        return Err(EditError::NodeNotFound(target_handle.to_string()));
    }

    let text = commit_or_rollback(&draft, &pristine, source)?;
    Ok(Reparented {
        text,
        clear_selection: true,
    })
}

/// Rename the node at `handle` to `new_text`.
///
/// Handle resolution is authoritative. The legacy text-match fallback (find
/// the first node whose text equals or contains `original_text`) only runs
/// when the handle fails to resolve, and always attaches a warning — with
/// duplicate text it can pick the wrong node, which is why it is not the
/// primary path.
pub fn rename(
    source: &str,
    handle: &str,
    original_text: &str,
    new_text: &str,
) -> Result<Renamed, EditError> {
    let pristine = Parser::new(source.to_string(), 0).parse().outline;
    let mut draft = pristine.clone();
    let mut warnings = Vec::new();

    let resolved = handle::decode(handle).and_then(|path| locate(&draft, &path));

    let target = match resolved {
        Some(Found { kind: NodeKind::List, .. }) => {
            return Err(EditError::UnsupportedTarget {
                handle: handle.to_string(),
                kind: NodeKind::List.label(),
            });
        }
        Some(found) => {
            if found.text.trim() != original_text.trim() {
                warnings.push(EditWarning::RenameAmbiguity(format!(
                    "node at '{}' reads '{}', not '{}'; renamed by handle anyway",
                    handle, found.text, original_text
                )));
            }
            Some(found.id)
        }
        None => {
            let candidates = text_matches(&draft, original_text);
            match candidates.split_first() {
                None => {
                    warnings.push(EditWarning::RenameAmbiguity(format!(
                        "handle '{}' did not resolve and no node matches '{}'; \
                         document unchanged",
                        handle, original_text
                    )));
                    None
                }
                Some((first, rest)) => {
                    let detail = if rest.is_empty() {
                        "renamed by text match".to_string()
                    } else {
                        format!(
                            "{} nodes match; renamed the first in document order",
                            candidates.len()
                        )
                    };
                    warnings.push(EditWarning::RenameAmbiguity(format!(
                        "handle '{}' did not resolve; {}",
                        handle, detail
                    )));
                    Some(*first)
                }
            }
        }
    };

    if let Some(id) = target {
        log::debug!("rename node {} to '{}'", id, new_text);
        if !set_text(&mut draft, id, new_text) {
            return Err(EditError::NodeNotFound(handle.to_string()));
        }
    }

    let text = commit_or_rollback(&draft, &pristine, source)?;
    Ok(Renamed { text, warnings })
}

/// Serialize the draft, or fall back to the pristine pre-mutation clone.
///
/// The pristine tree is untouched since parse, so its caches are valid by
/// construction and the caller is guaranteed syntactically valid text even
/// when the mutated structure cannot be serialized.
pub fn commit_or_rollback(
    draft: &Outline,
    pristine: &Outline,
    source: &str,
) -> Result<String, EditError> {
    match serialize(draft) {
        Ok(text) => Ok(text),
        Err(err) => {
            log::warn!("draft failed to serialize ({}); rolling back", err);
            let recovered = serialize(pristine).unwrap_or_else(|_| source.to_string());
            Err(EditError::Reconstruction { recovered })
        }
    }
}

// ---------------------------------------------------------------------------
// Detach
// ---------------------------------------------------------------------------

enum Detached {
    /// A heading travels with the list that follows it — its visual
    /// children — so reparenting a heading does not orphan its subtree
    /// in place.
    Heading {
        heading: Heading,
        children: Option<List>,
    },
    List(List),
    Item(ListItem),
}

fn detach(outline: &mut Outline, id: NodeId) -> Option<Detached> {
    if let Some(position) = outline.blocks.iter().position(|b| b.id() == Some(id)) {
        return Some(match outline.blocks.remove(position) {
            Block::Heading(heading) => {
                let children = take_following_list(&mut outline.blocks, position);
                Detached::Heading { heading, children }
            }
            Block::List(list) => Detached::List(list),
            Block::Paragraph(_) => unreachable!("paragraphs carry no id"),
        });
    }

    for block in &mut outline.blocks {
        if let Block::List(list) = block {
            if let Some(item) = detach_item(list, id) {
                return Some(Detached::Item(item));
            }
        }
    }
    None
}

/// Remove the first list at or after `from`, stopping at the next heading.
/// `from` is the slot the detached heading vacated.
fn take_following_list(blocks: &mut Vec<Block>, from: usize) -> Option<List> {
    let mut j = from;
    while j < blocks.len() {
        match &blocks[j] {
            Block::List(_) => {
                let Block::List(list) = blocks.remove(j) else {
                    unreachable!("just matched a list");
                };
                return Some(list);
            }
            Block::Heading(_) => return None,
            Block::Paragraph(_) => j += 1,
        }
    }
    None
}

/// Remove the item with this id from the list subtree, refreshing the raw
/// cache of every list on the unwind path. A nested list left empty is
/// dropped entirely.
fn detach_item(list: &mut List, id: NodeId) -> Option<ListItem> {
    if let Some(position) = list.items.iter().position(|item| item.id == id) {
        let item = list.items.remove(position);
        list.refresh_deep();
        return Some(item);
    }

    for index in 0..list.items.len() {
        let found = match &mut list.items[index].nested {
            Some(nested) => detach_item(nested, id),
            None => None,
        };
        if let Some(found) = found {
            let now_empty = list.items[index]
                .nested
                .as_ref()
                .is_some_and(|nested| nested.items.is_empty());
            if now_empty {
                list.items[index].nested = None;
            }
            list.refresh_deep();
            return Some(found);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Coercion and attach
// ---------------------------------------------------------------------------

/// Coerce a detached node into a list item so it can join an item
/// collection.
///
/// Lossy, best-effort shim for non-items: a heading keeps only its visible
/// text and its detached child list is dropped; a list collapses to its
/// first item's text. Never silent — callers reach this only through an
/// explicit reparent, and the loss is pinned down by test.
fn coerce_to_item(detached: Detached) -> ListItem {
    match detached {
        Detached::Item(item) => item,
        Detached::Heading { heading, .. } => ListItem::new(heading.id, heading.text),
        Detached::List(list) => {
            let text = list
                .items
                .first()
                .map(|item| item.text.clone())
                .unwrap_or_default();
            ListItem::new(list.id, text)
        }
    }
}

/// Append `slot` to the target item's nested list, creating the list
/// (with the pre-allocated id) if the item has none yet.
fn attach_under_item(
    outline: &mut Outline,
    target: NodeId,
    slot: &mut Option<ListItem>,
    nested_list_id: NodeId,
) -> bool {
    for block in &mut outline.blocks {
        if let Block::List(list) = block {
            if attach_in_list(list, target, slot, nested_list_id) {
                return true;
            }
        }
    }
    false
}

fn attach_in_list(
    list: &mut List,
    target: NodeId,
    slot: &mut Option<ListItem>,
    nested_list_id: NodeId,
) -> bool {
    for index in 0..list.items.len() {
        if list.items[index].id == target {
            let nested = list.items[index]
                .nested
                .get_or_insert_with(|| List::new(nested_list_id, false));
            if let Some(item) = slot.take() {
                nested.items.push(item);
            }
            list.refresh_deep();
            return true;
        }

        let descended = match &mut list.items[index].nested {
            Some(nested) => attach_in_list(nested, target, slot, nested_list_id),
            None => false,
        };
        if descended {
            list.refresh_deep();
            return true;
        }
    }
    false
}

/// Append to the list following the target heading, inserting a fresh list
/// right after the heading when none follows it yet.
fn attach_under_heading(
    outline: &mut Outline,
    target: NodeId,
    item: ListItem,
    new_list_id: NodeId,
) -> bool {
    let Some(position) = outline
        .blocks
        .iter()
        .position(|b| matches!(b, Block::Heading(h) if h.id == target))
    else {
        return false;
    };

    match following_list_position(&outline.blocks, position) {
        Some(list_position) => {
            let Block::List(list) = &mut outline.blocks[list_position] else {
                unreachable!("position points at a list");
            };
            list.items.push(item);
            list.refresh_deep();
        }
        None => {
            let mut list = List::new(new_list_id, false);
            list.items.push(item);
            list.refresh_deep();
            outline.blocks.insert(position + 1, Block::List(list));
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Rename plumbing
// ---------------------------------------------------------------------------

/// Set the text of the heading or item with this id, refreshing the raw
/// caches on its spine. Returns false if the id is not in the tree.
fn set_text(outline: &mut Outline, id: NodeId, text: &str) -> bool {
    for block in &mut outline.blocks {
        match block {
            Block::Heading(h) if h.id == id => {
                h.text = text.to_string();
                h.refresh_raw();
                return true;
            }
            Block::List(list) => {
                if set_item_text(list, id, text) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn set_item_text(list: &mut List, id: NodeId, text: &str) -> bool {
    for index in 0..list.items.len() {
        if list.items[index].id == id {
            list.items[index].text = text.to_string();
            list.refresh_deep();
            return true;
        }
        let descended = match &mut list.items[index].nested {
            Some(nested) => set_item_text(nested, id, text),
            None => false,
        };
        if descended {
            list.refresh_deep();
            return true;
        }
    }
    false
}

/// Depth-first text match over headings and items, document order.
/// Exact (trimmed) matches shadow substring matches entirely.
fn text_matches(outline: &Outline, needle: &str) -> Vec<NodeId> {
    let needle = needle.trim();
    let mut exact = Vec::new();
    let mut partial = Vec::new();

    let mut visit = |id: NodeId, text: &str| {
        if text.trim() == needle {
            exact.push(id);
        } else if !needle.is_empty() && text.contains(needle) {
            partial.push(id);
        }
    };

    for block in &outline.blocks {
        match block {
            Block::Heading(h) => visit(h.id, &h.text),
            Block::List(list) => visit_list_texts(list, &mut visit),
            Block::Paragraph(_) => {}
        }
    }

    if exact.is_empty() { partial } else { exact }
}

fn visit_list_texts(list: &List, visit: &mut impl FnMut(NodeId, &str)) {
    for item in &list.items {
        visit(item.id, &item.text);
        if let Some(nested) = &item.nested {
            visit_list_texts(nested, visit);
        }
    }
}
