pub mod edit;
pub mod error;
pub mod handle;
pub mod locate;

pub use edit::{RELATION_CHILD, Renamed, Reparented, commit_or_rollback, rename, reparent};
pub use error::{EditError, EditWarning};
pub use handle::{NodePath, decode, encode};
pub use locate::{Found, NodeKind, locate};
