//! Hidden to visible transition of a document body.
//!
//! Documents start with a hidden body so unstyled content never flashes. The
//! [`VisibilityCoordinator`] of a window performs the transition exactly once:
//! it waits for the body, optionally for services that delay the first render,
//! then makes the body visible and notifies the resources and performance
//! collaborators.

use crate::config::InjectorConfig;
use crate::diagnostics::{BestEffort, Diagnostics};
use crate::error::VisibilityError;
use crate::services::{Performance, RenderDelayingServices, Resources, ServiceLocator};
use anyhow::{Context as _, anyhow};
use dom::{Document, DomError, NodeKey, SharedDocument, WindowId, wait_for_body_signal};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tokio::sync::watch;
use tokio::task;
use tracing::info_span;

/// Inline styles applied to the body by the visible-state transition.
pub const VISIBLE_BODY_STYLES: [(&str, &str); 3] = [
    ("opacity", "1"),
    ("visibility", "visible"),
    ("animation", "none"),
];

/// Timing mark recorded once the body was made visible after waiting on services.
pub const BODY_VISIBLE_MARK: &str = "mbv";

/// Owns the visibility sentinel of one window.
///
/// Create one coordinator per window and drop it with the window. All waits
/// are spawned on the current `LocalSet`.
pub struct VisibilityCoordinator {
    window: WindowId,
    visible: Cell<bool>,
    services: Rc<dyn ServiceLocator>,
    diagnostics: Diagnostics,
    relayout_priority: u32,
}

impl VisibilityCoordinator {
    pub fn new(
        window: WindowId,
        services: Rc<dyn ServiceLocator>,
        diagnostics: Diagnostics,
        config: &InjectorConfig,
    ) -> Rc<Self> {
        Rc::new(Self {
            window,
            visible: Cell::new(false),
            services,
            diagnostics,
            relayout_priority: config.relayout_priority,
        })
    }

    #[inline]
    pub const fn window(&self) -> WindowId {
        self.window
    }

    /// Whether the transition happened or was declared unnecessary.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Declare that this window never needs the hidden to visible transition.
    ///
    /// Later `make_visible` calls become no-ops. Body styles are left alone and
    /// no collaborator is notified.
    #[inline]
    pub fn body_always_visible(&self) {
        debug!("body of {:?} is always visible", self.window);
        self.visible.set(true);
    }

    /// Make the body of `document` visible once it exists.
    ///
    /// With `wait_for_services`, the transition is held back until the
    /// render-delaying services resolve; a failure there is reported through
    /// the diagnostics and treated as no services. Returns before any wait.
    ///
    /// # Errors
    ///
    /// Returns a [`VisibilityError`] if `document` is not displayed in this
    /// coordinator's window, or if it is mutably borrowed by the caller.
    ///
    /// # Panics
    ///
    /// Panics if the body does not exist yet or `wait_for_services` is set,
    /// and this is called outside a `tokio::task::LocalSet`.
    pub fn make_visible(
        self: &Rc<Self>,
        document: &SharedDocument,
        wait_for_services: bool,
    ) -> Result<(), VisibilityError> {
        let _span = info_span!("visibility.make_visible", window = ?self.window, wait_for_services)
            .entered();
        let body_ready = {
            let doc = document
                .try_borrow()
                .map_err(|_busy| VisibilityError::DocumentBusy)?;
            self.check_window(&doc)?;
            if self.visible.get() {
                debug!("body already visible, nothing to do");
                return Ok(());
            }
            doc.body().is_none().then(|| doc.body_ready())
        };
        match body_ready {
            None => self.on_body_available(document, wait_for_services),
            Some(ready) => {
                debug!("waiting for the body before making it visible");
                let this = Rc::clone(self);
                let weak = Rc::downgrade(document);
                drop(task::spawn_local(async move {
                    if let Err(err) = this.await_body(&weak, ready, wait_for_services).await {
                        this.recover(&weak, err);
                    }
                }));
            }
        }
        Ok(())
    }

    /// Force the body visible after a failed boot.
    ///
    /// Applies the transition right away when the body exists, skipping any
    /// service wait, and otherwise behaves like `make_visible(document, false)`.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`make_visible`](Self::make_visible).
    ///
    /// # Panics
    ///
    /// Panics if the body does not exist yet and this is called outside a
    /// `tokio::task::LocalSet`.
    pub fn make_visible_recovery(self: &Rc<Self>, document: &SharedDocument) -> Result<(), VisibilityError> {
        let has_body = {
            let doc = document
                .try_borrow()
                .map_err(|_busy| VisibilityError::DocumentBusy)?;
            self.check_window(&doc)?;
            if self.visible.get() {
                return Ok(());
            }
            doc.body().is_some()
        };
        if has_body {
            info!("forcing body of {:?} visible", self.window);
            self.set(document);
            return Ok(());
        }
        self.make_visible(document, false)
    }

    fn check_window(&self, document: &Document) -> Result<(), VisibilityError> {
        match document.default_view() {
            None => Err(VisibilityError::NoWindow),
            Some(found) if found != self.window => Err(VisibilityError::ForeignWindow {
                expected: self.window,
                found,
            }),
            Some(_) => Ok(()),
        }
    }

    async fn await_body(
        self: &Rc<Self>,
        document: &Weak<RefCell<Document>>,
        ready: watch::Receiver<Option<NodeKey>>,
        wait_for_services: bool,
    ) -> anyhow::Result<()> {
        let body = wait_for_body_signal(ready)
            .await
            .context("waiting for the document body")?;
        let document = document.upgrade().ok_or(DomError::Closed)?;
        debug!("body {body:?} available");
        self.on_body_available(&document, wait_for_services);
        Ok(())
    }

    fn on_body_available(self: &Rc<Self>, document: &SharedDocument, wait_for_services: bool) {
        if self.visible.replace(true) {
            debug!("body was made visible while waiting, skipping");
            return;
        }
        if !wait_for_services {
            self.set(document);
            return;
        }
        let gate = self.render_delaying(document);
        let window = self.window;
        let this = Rc::clone(self);
        let weak = Rc::downgrade(document);
        drop(task::spawn_local(async move {
            let waited = match gate {
                Ok(pending) => pending.wait_for_services(window).await,
                Err(err) => Err(err),
            };
            let services = waited.unwrap_or_else(|err| {
                this.diagnostics
                    .rethrow_async(err.context("render-delaying services failed"));
                Vec::new()
            });
            let Some(live) = weak.upgrade() else {
                debug!("document dropped while waiting on services");
                return;
            };
            this.set(&live);
            if !services.is_empty() {
                debug!("waited on {} services, scheduling relayout", services.len());
                match this.resources(&live) {
                    Ok(resources) => resources.schedule_pass(this.relayout_priority, true),
                    Err(err) => this.diagnostics.rethrow_async(err),
                }
            }
            this.mark_visible(&live).settle();
        }));
    }

    /// The visible-state transition.
    fn set(&self, document: &SharedDocument) {
        self.visible.set(true);
        match document.try_borrow_mut() {
            Ok(mut doc) => match doc.body() {
                Some(body) => {
                    if let Err(err) = doc.set_styles(body, &VISIBLE_BODY_STYLES) {
                        self.diagnostics.rethrow_async(err.into());
                    }
                }
                None => warn!("document has no body to make visible"),
            },
            Err(err) => self
                .diagnostics
                .rethrow_async(anyhow!("cannot style the body: {err}")),
        }
        info!("body of {:?} visible", self.window);
        self.render_started(document).settle();
    }

    fn recover(&self, document: &Weak<RefCell<Document>>, err: anyhow::Error) {
        match document.upgrade() {
            Some(document) => self.set(&document),
            None => warn!("document dropped before its body could be made visible"),
        }
        self.diagnostics.rethrow_async(err);
    }

    fn render_started(&self, document: &SharedDocument) -> BestEffort {
        let outcome = self
            .resources(document)
            .and_then(|resources| resources.render_started());
        BestEffort::new("render started notification", outcome)
    }

    fn mark_visible(&self, document: &SharedDocument) -> BestEffort {
        let outcome = self.performance(document).and_then(|performance| {
            performance.tick(BODY_VISIBLE_MARK)?;
            performance.flush()
        });
        BestEffort::new("body visible timing mark", outcome)
    }

    fn resources(&self, document: &SharedDocument) -> anyhow::Result<Rc<dyn Resources>> {
        let doc = document.try_borrow()?;
        Ok(self.services.resources(&doc)?)
    }

    fn performance(&self, document: &SharedDocument) -> anyhow::Result<Rc<dyn Performance>> {
        let doc = document.try_borrow()?;
        Ok(self.services.performance(&doc)?)
    }

    fn render_delaying(&self, document: &SharedDocument) -> anyhow::Result<Rc<dyn RenderDelayingServices>> {
        let doc = document.try_borrow()?;
        Ok(self.services.render_delaying(&doc)?)
    }
}
