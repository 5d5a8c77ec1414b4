//! Error types surfaced by the style injector.

use core::cell::BorrowMutError;
use dom::{DomError, WindowId};
use thiserror::Error;

/// Failure to install a stylesheet.
#[derive(Debug, Error)]
pub enum InstallError {
    /// An extension stylesheet was requested before the runtime stylesheet exists.
    #[error("extension stylesheet `{extension}` installed before the runtime stylesheet")]
    RuntimeStyleMissing { extension: String },
    #[error(transparent)]
    Dom(#[from] DomError),
    /// The document is mutably borrowed elsewhere on this thread.
    #[error("document is busy: {0}")]
    Busy(#[from] BorrowMutError),
}

/// Precondition violations of the visibility coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    /// The document is not displayed in any window.
    #[error("document has no default view")]
    NoWindow,
    /// The document belongs to a different window than the coordinator.
    #[error("document belongs to {found:?}, coordinator manages {expected:?}")]
    ForeignWindow { expected: WindowId, found: WindowId },
    /// The document is mutably borrowed by the caller.
    #[error("document is busy")]
    DocumentBusy,
}

/// A collaborator could not be resolved for a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0} service is not registered")]
    Missing(&'static str),
}
