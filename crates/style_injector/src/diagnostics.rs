//! Error reporting that never interrupts the caller.

use anyhow::Error;
use log::{debug, error};
use tokio::sync::mpsc;

/// Reports errors out of band: logged immediately and, when a listener is
/// attached, delivered on a channel the host drains later.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    sink: Option<mpsc::UnboundedSender<Error>>,
}

impl Diagnostics {
    /// Diagnostics that only log.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { sink: None }
    }

    /// Diagnostics that also forward every reported error to the returned receiver.
    #[inline]
    #[must_use]
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Error>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sink: Some(sender) }, receiver)
    }

    /// Report `err` without affecting the current control flow.
    pub fn rethrow_async(&self, err: Error) {
        error!("{err:#}");
        let Some(sink) = &self.sink else {
            return;
        };
        if sink.send(err).is_err() {
            debug!("diagnostics listener is gone");
        }
    }
}

/// Outcome of a step whose failure must never block the caller.
#[must_use = "best-effort outcomes should be settled with `settle`"]
#[derive(Debug)]
pub struct BestEffort {
    step: &'static str,
    outcome: anyhow::Result<()>,
}

impl BestEffort {
    #[inline]
    pub const fn new(step: &'static str, outcome: anyhow::Result<()>) -> Self {
        Self { step, outcome }
    }

    /// Log a failure and discard it. Returns whether the step succeeded.
    #[inline]
    pub fn settle(self) -> bool {
        match self.outcome {
            Ok(()) => true,
            Err(err) => {
                debug!("{} failed and was ignored: {err:#}", self.step);
                false
            }
        }
    }
}
