//! Waiting for the body element.

use super::SharedDocument;
use crate::{DomError, NodeKey};
use tokio::sync::watch;

/// Resolve once the document has a body.
///
/// Returns without suspending when the body already exists.
///
/// # Errors
///
/// Returns [`DomError::Closed`] if the document is dropped first.
pub async fn wait_for_body(document: &SharedDocument) -> Result<NodeKey, DomError> {
    let ready = {
        let doc = document.borrow();
        if let Some(body) = doc.body() {
            return Ok(body);
        }
        doc.body_ready()
    };
    wait_for_body_signal(ready).await
}

/// Resolve once `ready` reports a body, without keeping the document alive.
///
/// # Errors
///
/// Returns [`DomError::Closed`] if the document is dropped first.
pub async fn wait_for_body_signal(
    mut ready: watch::Receiver<Option<NodeKey>>,
) -> Result<NodeKey, DomError> {
    let body = ready
        .wait_for(Option::is_some)
        .await
        .map_err(|_closed| DomError::Closed)?;
    (*body).ok_or(DomError::Closed)
}
