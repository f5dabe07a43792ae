pub mod block;
pub mod parser;
pub mod serialize;

use crate::block::{Block, NodeId};

/// A parsed outline document.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Top-level blocks in document order.
    pub blocks: Vec<Block>,
    /// The source file ID (for diagnostics with codespan-reporting).
    pub source_id: usize,
    next_id: u32,
}

impl Outline {
    pub fn new(blocks: Vec<Block>, source_id: usize, next_id: u32) -> Self {
        Outline {
            blocks,
            source_id,
            next_id,
        }
    }

    /// Allocate an identity tag unused anywhere in this tree. Edit
    /// operations use this when they synthesize nodes mid-mutation.
    pub fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}
