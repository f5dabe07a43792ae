use std::fmt;

/// Ephemeral identity tag assigned to every structural node at parse time.
///
/// Ids are stable for the lifetime of one parsed tree and every clone of it,
/// which lets an edit operation keep addressing a node after sibling indices
/// have shifted. They are never persisted and never survive a re-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A top-level outline block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(Heading),
    List(List),
    Paragraph(Paragraph),
}

impl Block {
    /// Structural blocks participate in path indexing; paragraphs do not.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Block::Paragraph(_))
    }

    pub fn id(&self) -> Option<NodeId> {
        match self {
            Block::Heading(h) => Some(h.id),
            Block::List(l) => Some(l.id),
            Block::Paragraph(_) => None,
        }
    }
}

/// An ATX heading. Its visual children in the mind-map are the list that
/// textually follows it at the same level; the heading does not own them.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub id: NodeId,
    /// 1 = `#`, up to 6 = `######`.
    pub level: u8,
    /// Inline text, whitespace-normalized.
    pub text: String,
    /// Serialized fragment, kept consistent with `level`/`text`.
    pub raw: String,
}

impl Heading {
    pub fn rendered(&self) -> String {
        format!("{} {}", "#".repeat(self.level as usize), self.text)
    }

    pub fn refresh_raw(&mut self) {
        self.raw = self.rendered();
    }
}

/// An ordered or unordered list. Items are the only permitted children.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub id: NodeId,
    pub ordered: bool,
    pub items: Vec<ListItem>,
    /// Serialized fragment at depth zero; nested lists are indented two
    /// spaces per level relative to their parent item.
    pub raw: String,
}

impl List {
    pub fn new(id: NodeId, ordered: bool) -> Self {
        List {
            id,
            ordered,
            items: Vec::new(),
            raw: String::new(),
        }
    }

    /// Recompute the raw-text caches of this list and everything below it,
    /// bottom-up. Ordered-list markers depend on item position, so a detach
    /// or insert invalidates every sibling cache at the touched level.
    pub fn refresh_deep(&mut self) {
        let ordered = self.ordered;
        for (index, item) in self.items.iter_mut().enumerate() {
            if let Some(nested) = &mut item.nested {
                nested.refresh_deep();
            }
            item.refresh_raw(ordered, index);
        }
        self.raw = self.items.iter().map(|item| item.raw.as_str()).collect();
    }
}

/// A single list item, optionally carrying one nested list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub id: NodeId,
    pub text: String,
    pub nested: Option<List>,
    pub raw: String,
}

impl ListItem {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        ListItem {
            id,
            text: text.into(),
            nested: None,
            raw: String::new(),
        }
    }

    pub fn marker(ordered: bool, index: usize) -> String {
        if ordered {
            format!("{}. ", index + 1)
        } else {
            "- ".to_string()
        }
    }

    /// Recompute this item's raw cache from its text and its nested list's
    /// cache. The nested list must already be fresh.
    pub fn refresh_raw(&mut self, ordered: bool, index: usize) {
        let mut raw = format!("{}{}\n", Self::marker(ordered, index), self.text);
        if let Some(nested) = &self.nested {
            for line in nested.raw.lines() {
                raw.push_str("  ");
                raw.push_str(line);
                raw.push('\n');
            }
        }
        self.raw = raw;
    }
}

/// Plain paragraph text. Not structural: excluded from path indexing and
/// never the subject of an edit operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
}
