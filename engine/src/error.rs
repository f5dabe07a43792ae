use std::fmt;

/// Edit operation failures.
///
/// Every variant is recovered at the operation boundary: the caller keeps
/// the original outline text plus this diagnostic, never a half-mutated
/// tree. `Reconstruction` is the one variant that carries text — the
/// re-serialization of the untouched pre-mutation clone.
#[derive(Debug)]
pub enum EditError {
    /// Malformed handle: wrong prefix, non-numeric segment, or empty path.
    HandleDecode(String),
    /// The handle decoded but resolves to nothing in this snapshot.
    NodeNotFound(String),
    /// Dragged and target handles are identical.
    SelfReference,
    /// The target node's kind cannot accept children this way.
    UnsupportedTarget {
        handle: String,
        kind: &'static str,
    },
    /// Only the "child" relation is implemented.
    UnsupportedRelation(String),
    /// The mutated tree failed to serialize; `recovered` is the untouched
    /// pre-mutation tree serialized instead, guaranteed valid.
    Reconstruction { recovered: String },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::HandleDecode(handle) => {
                write!(f, "malformed node handle: '{}'", handle)
            }
            EditError::NodeNotFound(handle) => {
                write!(f, "no node at handle '{}' in this snapshot", handle)
            }
            EditError::SelfReference => {
                write!(f, "cannot reparent a node under itself")
            }
            EditError::UnsupportedTarget { handle, kind } => {
                write!(f, "target '{}' is a {} and cannot take children", handle, kind)
            }
            EditError::UnsupportedRelation(relation) => {
                write!(f, "unsupported relation '{}' (only \"child\")", relation)
            }
            EditError::Reconstruction { .. } => {
                write!(
                    f,
                    "mutated tree failed to serialize; original text recovered"
                )
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Non-fatal diagnostics attached to a successful rename.
#[derive(Debug, Clone, PartialEq)]
pub enum EditWarning {
    /// Handle resolution was bypassed or contradicted by the supplied
    /// original text; the rename still applied, but to a node chosen on
    /// weaker evidence than the caller may expect.
    RenameAmbiguity(String),
}

impl fmt::Display for EditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditWarning::RenameAmbiguity(msg) => write!(f, "rename ambiguity: {}", msg),
        }
    }
}
