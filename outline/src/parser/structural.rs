use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::Outline;
use crate::block::{Block, Heading, List, ListItem, NodeId, Paragraph};
use crate::parser::Parsed;
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse markdown source text into an outline tree.
pub fn parse_outline(source: &str, file_id: usize) -> Parsed {
    // Tables are enabled so they arrive as table events and can be reported
    // as a single skipped block instead of degrading into stray paragraphs.
    let options = Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut state = ParseState::new(file_id);
    state.process_events(&events);
    state.finalize()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    file_id: usize,
    /// Completed top-level blocks in document order.
    blocks: Vec<Block>,
    warnings: Vec<ParseError>,
    /// Identity counter; every structural node gets the next value in
    /// document order, so two parses of the same text tag nodes identically.
    next_id: u32,
}

impl ParseState {
    fn new(file_id: usize) -> Self {
        ParseState {
            file_id,
            blocks: Vec::new(),
            warnings: Vec::new(),
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn process_events(&mut self, events: &[(Event<'_>, Range<usize>)]) {
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            match ev {
                Event::Start(Tag::Heading { level, .. }) => {
                    let level = heading_level_to_u8(level);
                    i += 1;
                    let text = normalize_text(&collect_plain_text(events, &mut i, &|e| {
                        matches!(e, TagEnd::Heading(_))
                    }));
                    let mut heading = Heading {
                        id: self.fresh_id(),
                        level,
                        text,
                        raw: String::new(),
                    };
                    heading.refresh_raw();
                    self.blocks.push(Block::Heading(heading));
                }

                Event::Start(Tag::List(start)) => {
                    let ordered = start.is_some();
                    i += 1;
                    let mut list = self.parse_list(events, &mut i, ordered);
                    list.refresh_deep();
                    self.blocks.push(Block::List(list));
                }

                Event::Start(Tag::Paragraph) => {
                    i += 1;
                    let text = normalize_text(&collect_plain_text(events, &mut i, &|e| {
                        matches!(e, TagEnd::Paragraph)
                    }));
                    self.blocks.push(Block::Paragraph(Paragraph { text }));
                }

                Event::Rule => {
                    self.warnings.push(ParseError::unsupported_block(
                        "horizontal rule",
                        range.clone(),
                        self.file_id,
                    ));
                    i += 1;
                }

                Event::Start(tag) => {
                    if let Some(kind) = unsupported_block_kind(tag) {
                        self.warnings.push(ParseError::unsupported_block(
                            kind,
                            range.clone(),
                            self.file_id,
                        ));
                    }
                    i += 1;
                    skip_container(events, &mut i);
                }

                _ => {
                    i += 1;
                }
            }
        }
    }

    /// Parse list events (the Start(List) has already been consumed).
    fn parse_list(
        &mut self,
        events: &[(Event<'_>, Range<usize>)],
        i: &mut usize,
        ordered: bool,
    ) -> List {
        let id = self.fresh_id();
        let mut items = Vec::new();

        while *i < events.len() {
            let (ref ev, _) = events[*i];
            match ev {
                Event::End(TagEnd::List(_)) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Item) => {
                    *i += 1;
                    items.push(self.parse_item(events, i));
                }
                _ => {
                    *i += 1;
                }
            }
        }

        List {
            id,
            ordered,
            items,
            raw: String::new(),
        }
    }

    /// Parse a single list item: its inline text plus at most one nested
    /// list. A second sub-list in the same item (legal markdown, outside the
    /// outline invariant) is merged into the first.
    fn parse_item(&mut self, events: &[(Event<'_>, Range<usize>)], i: &mut usize) -> ListItem {
        let id = self.fresh_id();
        let mut text = String::new();
        let mut nested: Option<List> = None;

        while *i < events.len() {
            let (ref ev, ref range) = events[*i];
            match ev {
                Event::End(TagEnd::Item) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::List(start)) => {
                    let ordered = start.is_some();
                    *i += 1;
                    let sub = self.parse_list(events, i, ordered);
                    match &mut nested {
                        Some(list) => list.items.extend(sub.items),
                        None => nested = Some(sub),
                    }
                }
                Event::Start(Tag::Paragraph) => {
                    *i += 1;
                    let chunk = collect_plain_text(events, i, &|e| {
                        matches!(e, TagEnd::Paragraph)
                    });
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&chunk);
                }
                Event::Text(s) => {
                    text.push_str(s);
                    *i += 1;
                }
                Event::Code(s) => {
                    text.push_str(s);
                    *i += 1;
                }
                Event::SoftBreak | Event::HardBreak => {
                    text.push(' ');
                    *i += 1;
                }
                Event::Start(tag) => {
                    if let Some(kind) = unsupported_block_kind(tag) {
                        self.warnings.push(ParseError::unsupported_block(
                            kind,
                            range.clone(),
                            self.file_id,
                        ));
                        *i += 1;
                        skip_container(events, i);
                    } else {
                        // Inline markup: keep walking, its Text events carry
                        // the visible content.
                        *i += 1;
                    }
                }
                _ => {
                    *i += 1;
                }
            }
        }

        ListItem {
            id,
            text: normalize_text(&text),
            nested,
            raw: String::new(),
        }
    }

    fn finalize(self) -> Parsed {
        Parsed {
            outline: Outline::new(self.blocks, self.file_id, self.next_id),
            warnings: self.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Block-level constructs outside the outline grammar. Inline tags return
/// None so their text content is still collected.
fn unsupported_block_kind(tag: &Tag<'_>) -> Option<&'static str> {
    match tag {
        Tag::CodeBlock(_) => Some("code block"),
        Tag::Table(_) => Some("table"),
        Tag::BlockQuote(_) => Some("blockquote"),
        Tag::HtmlBlock => Some("html block"),
        Tag::FootnoteDefinition(_) => Some("footnote definition"),
        Tag::MetadataBlock(_) => Some("metadata block"),
        Tag::Heading { .. } => Some("nested heading"),
        _ => None,
    }
}

/// Collect visible text (all Text/Code events) until the matching end tag,
/// flattening inline markup and turning line breaks into spaces.
fn collect_plain_text(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();

    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) => {
                text.push_str(s);
                *i += 1;
            }
            Event::Code(s) => {
                text.push_str(s);
                *i += 1;
            }
            Event::SoftBreak | Event::HardBreak => {
                text.push(' ');
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }

    text
}

/// Skip past the end of the container whose Start event was just consumed.
/// Events are well-nested, so a plain depth counter suffices.
fn skip_container(events: &[(Event<'_>, Range<usize>)], i: &mut usize) {
    let mut depth = 1u32;
    while *i < events.len() && depth > 0 {
        match &events[*i].0 {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            _ => {}
        }
        *i += 1;
    }
}

/// Strip leading/trailing whitespace, collapse interior whitespace.
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
