//! Insertion points for style nodes.

use dom::{Document, DomError, NodeKey, NodeKind};

/// Where style nodes are inserted and which active sheet list observes them.
///
/// For the main tree the insertion point is the head and the scope is the
/// document node; for a shadow root both are the shadow root itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StyleRoot {
    pub insertion: NodeKey,
    pub scope: NodeKey,
}

impl StyleRoot {
    /// The head of `document`.
    #[inline]
    pub const fn head(document: &Document) -> Self {
        Self {
            insertion: document.head(),
            scope: NodeKey::ROOT,
        }
    }

    /// An isolated sub-root of `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if `shadow_root` is not a shadow root of `document`.
    pub fn shadow(document: &Document, shadow_root: NodeKey) -> Result<Self, DomError> {
        let node = document
            .node(shadow_root)
            .ok_or(DomError::UnknownNode(shadow_root))?;
        if !matches!(node.kind, NodeKind::ShadowRoot { .. }) {
            return Err(DomError::Hierarchy {
                node: shadow_root,
                reason: String::from("not a shadow root"),
            });
        }
        Ok(Self {
            insertion: shadow_root,
            scope: shadow_root,
        })
    }
}
