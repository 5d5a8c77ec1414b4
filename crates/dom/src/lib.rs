//! Host document model used by the style injection runtime.
//!
//! The [`Document`] owns an `indextree` arena with a `#document > html > head`
//! skeleton, optional body and any number of shadow roots. Every mutation is
//! broadcast as a batch of [`DOMUpdate`] values so subsystems (the stylesheet
//! list, renderers, indices) can mirror the tree on their own schedule.

pub mod document;
pub mod error;
pub mod updating;

pub use document::body::{wait_for_body, wait_for_body_signal};
pub use document::{DOMNode, Document, NodeKind, SharedDocument};
pub use error::DomError;
pub use updating::{DOMMirror, DOMSubscriber, DOMUpdate};

/// A 64-bit stable key for DOM nodes used to correlate asynchronous updates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

/// Identity of a window-equivalent scope (a browsing context) that owns documents.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct WindowId(pub u32);
