//! Detecting when an inserted stylesheet has been taken in by the style engine.
//!
//! The host offers no load notification for inline style nodes, so readiness
//! is checked once synchronously and then on a fixed interval until the node
//! shows up in the active sheet list of its scope.

use crate::config::InjectorConfig;
use crate::root::StyleRoot;
use core::time::Duration;
use css::ActiveStyleSheets;
use dom::NodeKey;
use log::{debug, warn};
use std::rc::Rc;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

/// How a pending readiness wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The sheet became active and the callback ran.
    Loaded,
    /// The configured poll cap was reached; the callback never ran.
    GaveUp { polls: u32 },
    /// The wait was cancelled through its handle.
    Cancelled,
}

/// Handle to a running readiness poll.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Stop polling. The callback will not run if it has not already.
    #[inline]
    pub fn cancel(&self) {
        self.task.abort();
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll to end.
    pub async fn outcome(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_panic() {
                    warn!("readiness callback panicked: {err}");
                }
                PollOutcome::Cancelled
            }
        }
    }
}

/// Notifies callers once a style node is an active stylesheet of its root.
#[derive(Clone)]
pub struct StyleReadinessPoller {
    sheets: Rc<dyn ActiveStyleSheets>,
    interval: Duration,
    max_polls: Option<u32>,
}

impl StyleReadinessPoller {
    pub fn new(sheets: Rc<dyn ActiveStyleSheets>, config: &InjectorConfig) -> Self {
        Self {
            sheets,
            interval: config.poll_interval(),
            max_polls: config.max_polls,
        }
    }

    #[inline]
    pub fn is_loaded(&self, root: StyleRoot, node: NodeKey) -> bool {
        self.sheets.owns_sheet(root.scope, node)
    }

    /// Run `callback` once `node` is active in `root`'s scope.
    ///
    /// Runs the callback before returning when the sheet is already active;
    /// otherwise spawns a poll on the current `LocalSet` and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if a poll is needed and this is called outside a
    /// `tokio::task::LocalSet`.
    pub fn notify_when_loaded(
        &self,
        root: StyleRoot,
        node: NodeKey,
        callback: impl FnOnce(NodeKey) + 'static,
    ) -> Option<PollHandle> {
        if self.is_loaded(root, node) {
            callback(node);
            return None;
        }
        let sheets = Rc::clone(&self.sheets);
        let period = self.interval;
        let max_polls = self.max_polls;
        let task = task::spawn_local(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut polls: u32 = 0;
            loop {
                ticker.tick().await;
                polls = polls.saturating_add(1);
                if sheets.owns_sheet(root.scope, node) {
                    debug!("stylesheet {node:?} active after {polls} polls");
                    callback(node);
                    return PollOutcome::Loaded;
                }
                if max_polls.is_some_and(|limit| polls >= limit) {
                    warn!("stylesheet {node:?} still inactive after {polls} polls, giving up");
                    return PollOutcome::GaveUp { polls };
                }
            }
        });
        Some(PollHandle { task })
    }
}
