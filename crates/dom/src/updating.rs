//! DOM update model and the mirror pattern used to observe a [`Document`](crate::Document).

use crate::NodeKey;
use anyhow::{Result, anyhow};
use log::trace;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// A batchable update applied to the document and mirrored to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveNode {
        node: NodeKey,
    },
    /// A shadow root was attached to `host`; `root` starts a new tree scope.
    AttachShadow {
        host: NodeKey,
        root: NodeKey,
    },
}

/// A subscriber that receives `DOMUpdate` values and mirrors them into its own state.
pub trait DOMSubscriber {
    /// Apply a single `DOMUpdate` to the subscriber state.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber cannot represent the update.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()>;
}

/// Generic mirror that applies incoming DOM update batches to a subscriber.
pub struct DOMMirror<T: DOMSubscriber> {
    in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
    mirror: T,
}

impl<T: DOMSubscriber> DOMMirror<T> {
    /// Create a new `DOMMirror` wrapping a subscriber implementation.
    #[inline]
    pub const fn new(in_updater: broadcast::Receiver<Vec<DOMUpdate>>, mirror: T) -> Self {
        Self { in_updater, mirror }
    }

    /// Drain and apply every pending update batch without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel closed or the subscriber rejected an update.
    #[inline]
    pub fn try_update_sync(&mut self) -> Result<()> {
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    for update in batch {
                        self.mirror.apply_update(update)?;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    trace!("mirror lagged behind by {skipped} batches");
                }
                Err(TryRecvError::Closed) => {
                    return Err(anyhow!("update channel was closed before the document ended"));
                }
            }
        }
        Ok(())
    }


    /// Access the inner mirror immutably.
    #[inline]
    pub const fn mirror(&self) -> &T {
        &self.mirror
    }
}
