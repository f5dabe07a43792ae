//! Handle addressing: the opaque string contract shared with the renderer.
//!
//! A handle is the prefix `mm` followed by 1-based structural sibling
//! indices, one per nesting level, joined with `-`: path `[0, 1]` is
//! `"mm-1-2"`. Handles are positional — valid only against the snapshot
//! they were derived from.

/// Fixed handle prefix, matching the ids the renderer assigns to nodes.
pub const HANDLE_PREFIX: &str = "mm";

const SEPARATOR: char = '-';

/// A structural path: 0-based indices among structural siblings
/// (headings, lists, list items — paragraphs are not counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn segments(&self) -> &[usize] {
        &self.0
    }
}

/// Encode a structural path as a handle string.
pub fn encode(path: &NodePath) -> String {
    let mut out = String::from(HANDLE_PREFIX);
    for segment in &path.0 {
        out.push(SEPARATOR);
        out.push_str(&(segment + 1).to_string());
    }
    out
}

/// Decode a handle back to a structural path.
///
/// Returns None on a malformed prefix, a non-numeric or zero segment, or an
/// empty path. Callers surface this as a decode error, never a panic.
pub fn decode(handle: &str) -> Option<NodePath> {
    let mut parts = handle.split(SEPARATOR);
    if parts.next() != Some(HANDLE_PREFIX) {
        return None;
    }

    let mut segments = Vec::new();
    for part in parts {
        let n: usize = part.parse().ok()?;
        if n == 0 {
            return None;
        }
        segments.push(n - 1);
    }

    if segments.is_empty() {
        return None;
    }
    Some(NodePath(segments))
}
