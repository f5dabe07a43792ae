pub mod error;
mod structural;

pub use error::ParseError;

use crate::Outline;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

/// A parse result: the outline tree plus non-fatal diagnostics.
///
/// Parsing the supported grammar never hard-fails; constructs outside it
/// (code fences, tables, blockquotes, rules) are skipped and reported as
/// warnings so the caller can surface them without losing the document.
#[derive(Debug)]
pub struct Parsed {
    pub outline: Outline,
    pub warnings: Vec<ParseError>,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source markdown into an outline tree.
    pub fn parse(&self) -> Parsed {
        structural::parse_outline(&self.source, self.file_id)
    }
}
