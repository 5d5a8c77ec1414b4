//! Errors raised by document mutations.

use crate::NodeKey;
use thiserror::Error;

/// Failure of a document operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The key does not name a live node of this document.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeKey),
    /// An insertion reference node is not a child of the requested parent.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeKey, child: NodeKey },
    /// The operation requires an element node.
    #[error("{0:?} is not an element")]
    NotAnElement(NodeKey),
    /// The tree rejected the insertion (cycle or self-insertion).
    #[error("cannot insert {node:?}: {reason}")]
    Hierarchy { node: NodeKey, reason: String },
    /// The document went away before the awaited node appeared.
    #[error("document was closed")]
    Closed,
}
