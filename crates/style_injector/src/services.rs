//! Collaborators resolved per document.
//!
//! The coordinator only talks to these through the [`ServiceLocator`]; hosts
//! register concrete implementations in a [`ServiceRegistry`].

use crate::error::ServiceError;
use dom::{Document, WindowId};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Name of a service that may hold back the first render.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceId(pub String);

/// Resource and layout scheduling for a document.
pub trait Resources {
    /// Rendering of the document has started.
    ///
    /// # Errors
    ///
    /// May fail while the runtime is still initializing.
    fn render_started(&self) -> anyhow::Result<()>;

    /// Request a layout pass, optionally re-laying out every element.
    fn schedule_pass(&self, priority: u32, relayout_all: bool);
}

/// Performance timing marks.
pub trait Performance {
    /// Record a timing mark.
    ///
    /// # Errors
    ///
    /// Returns an error if the mark cannot be recorded.
    fn tick(&self, label: &str) -> anyhow::Result<()>;

    /// Flush recorded marks to the reporting backend.
    ///
    /// # Errors
    ///
    /// Returns an error if reporting fails.
    fn flush(&self) -> anyhow::Result<()>;
}

/// Readiness gate for services that must be ready before the body is shown.
pub trait RenderDelayingServices {
    /// Resolves to the services that were waited on.
    fn wait_for_services(&self, window: WindowId) -> LocalBoxFuture<'static, anyhow::Result<Vec<ServiceId>>>;
}

/// Resolves the collaborators of a document.
pub trait ServiceLocator {
    /// # Errors
    ///
    /// Returns an error if no resources service is available for `document`.
    fn resources(&self, document: &Document) -> Result<Rc<dyn Resources>, ServiceError>;

    /// # Errors
    ///
    /// Returns an error if no performance service is available for `document`.
    fn performance(&self, document: &Document) -> Result<Rc<dyn Performance>, ServiceError>;

    /// # Errors
    ///
    /// Returns an error if no readiness gate is available for `document`.
    fn render_delaying(&self, document: &Document) -> Result<Rc<dyn RenderDelayingServices>, ServiceError>;
}

/// A locator holding one instance of each collaborator for a window.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    resources: Option<Rc<dyn Resources>>,
    performance: Option<Rc<dyn Performance>>,
    render_delaying: Option<Rc<dyn RenderDelayingServices>>,
}

impl ServiceRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_resources(mut self, resources: Rc<dyn Resources>) -> Self {
        self.resources = Some(resources);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_performance(mut self, performance: Rc<dyn Performance>) -> Self {
        self.performance = Some(performance);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_render_delaying(mut self, gate: Rc<dyn RenderDelayingServices>) -> Self {
        self.render_delaying = Some(gate);
        self
    }
}

impl ServiceLocator for ServiceRegistry {
    fn resources(&self, _document: &Document) -> Result<Rc<dyn Resources>, ServiceError> {
        self.resources.clone().ok_or(ServiceError::Missing("resources"))
    }

    fn performance(&self, _document: &Document) -> Result<Rc<dyn Performance>, ServiceError> {
        self.performance.clone().ok_or(ServiceError::Missing("performance"))
    }

    fn render_delaying(&self, _document: &Document) -> Result<Rc<dyn RenderDelayingServices>, ServiceError> {
        self.render_delaying
            .clone()
            .ok_or(ServiceError::Missing("render-delaying services"))
    }
}
