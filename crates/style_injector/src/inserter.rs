//! Installing stylesheets under a root with deterministic ordering.
//!
//! Within one root the runtime stylesheet is always the first child, extension
//! stylesheets follow it directly, and any other stylesheet is appended after
//! whatever the root holds at the time of insertion.

use crate::config::InjectorConfig;
use crate::error::InstallError;
use crate::key::StyleKey;
use crate::readiness::StyleReadinessPoller;
use crate::registry::StyleRegistry;
use crate::root::StyleRoot;
use crate::transform::CssTransformHook;
use css::ActiveStyleSheets;
use dom::{Document, NodeKey, SharedDocument};
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::info_span;

/// Invoked with the style node once its sheet is active.
pub type ReadyCallback = Box<dyn FnOnce(NodeKey)>;

/// A stylesheet to install.
pub struct StyleRequest {
    css: String,
    is_runtime: bool,
    extension: Option<String>,
    on_ready: Option<ReadyCallback>,
}

impl StyleRequest {
    #[inline]
    pub fn new(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            is_runtime: false,
            extension: None,
            on_ready: None,
        }
    }

    /// Mark this as the main runtime stylesheet.
    #[inline]
    #[must_use]
    pub const fn runtime(mut self) -> Self {
        self.is_runtime = true;
        self
    }

    /// Name the extension this stylesheet belongs to.
    #[inline]
    #[must_use]
    pub fn extension(mut self, name: impl Into<String>) -> Self {
        self.extension = Some(name.into());
        self
    }

    /// Run `callback` once the installed sheet is active.
    #[inline]
    #[must_use]
    pub fn on_ready(mut self, callback: impl FnOnce(NodeKey) + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }
}

/// Inserts style nodes and owns the per-root registries and transform hooks.
pub struct StyleInserter {
    registries: HashMap<NodeKey, StyleRegistry>,
    transforms: HashMap<NodeKey, CssTransformHook>,
    poller: StyleReadinessPoller,
}

impl StyleInserter {
    pub fn new(sheets: Rc<dyn ActiveStyleSheets>, config: &InjectorConfig) -> Self {
        Self {
            registries: HashMap::new(),
            transforms: HashMap::new(),
            poller: StyleReadinessPoller::new(sheets, config),
        }
    }

    #[inline]
    pub fn registry(&self, root: StyleRoot) -> Option<&StyleRegistry> {
        self.registries.get(&root.insertion)
    }

    /// Run CSS installed under `root` from now on through `transform`.
    /// Replaces any previous transform; existing nodes are left alone.
    pub fn install_css_transformer(
        &mut self,
        root: StyleRoot,
        transform: impl Fn(&str) -> String + 'static,
    ) {
        let previous = self
            .transforms
            .insert(root.insertion, CssTransformHook::new(transform));
        if previous.is_some() {
            debug!("replaced css transformer of {:?}", root.insertion);
        }
    }

    /// Install a stylesheet under `root` and return the node owning it.
    ///
    /// Keyed stylesheets (runtime, named extensions) are installed at most once
    /// per root; repeated calls return the existing node untouched. The ready
    /// callback runs for new and existing nodes alike, possibly before this
    /// returns, so it must not expect the document to be borrowed by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::RuntimeStyleMissing`] for an extension stylesheet
    /// installed before the runtime stylesheet, and DOM errors if `root` is not
    /// a live insertion point.
    ///
    /// # Panics
    ///
    /// Panics if a ready callback is given, the sheet is not active yet, and
    /// this is called outside a `tokio::task::LocalSet`.
    pub fn install(
        &mut self,
        document: &SharedDocument,
        root: StyleRoot,
        request: StyleRequest,
    ) -> Result<NodeKey, InstallError> {
        let StyleRequest {
            css,
            is_runtime,
            extension,
            on_ready,
        } = request;
        let key = StyleKey::resolve(is_runtime, extension.as_deref());
        let _span = info_span!("styles.install", key = ?key).entered();
        let node = {
            let mut doc = document.try_borrow_mut()?;
            self.insert_style_element(&mut doc, root, &css, key, extension.as_deref())?
        };
        if let Some(callback) = on_ready {
            // The poll is detached; it ends once the sheet is active.
            self.poller.notify_when_loaded(root, node, callback);
        }
        Ok(node)
    }

    fn insert_style_element(
        &mut self,
        document: &mut Document,
        root: StyleRoot,
        css: &str,
        key: Option<StyleKey>,
        extension: Option<&str>,
    ) -> Result<NodeKey, InstallError> {
        let registry = self.registries.entry(root.insertion).or_default();
        if let Some(existing) = key
            .as_ref()
            .and_then(|logical| registry.lookup(document, root.insertion, logical))
        {
            debug!("style {existing:?} already installed, reusing it");
            return Ok(existing);
        }

        let after = match &key {
            Some(StyleKey::Runtime) => None,
            Some(StyleKey::Extension(name)) => Some(
                registry
                    .lookup(document, root.insertion, &StyleKey::Runtime)
                    .ok_or_else(|| InstallError::RuntimeStyleMissing {
                        extension: name.clone(),
                    })?,
            ),
            None => document.last_child(root.insertion),
        };

        let text = match self.transforms.get(&root.insertion) {
            Some(hook) => hook.apply(css),
            None => css.to_owned(),
        };
        let style = document.create_element("style");
        document.set_text_content(style, &text)?;
        match (&key, extension) {
            (Some(logical), _) => {
                let (name, value) = logical.marker();
                document.set_attribute(style, name, value)?;
            }
            (None, Some(tag)) if !tag.is_empty() => document.set_attribute(style, tag, "")?,
            (None, _) => {}
        }
        document.insert_after_or_at_start(root.insertion, style, after)?;

        if let Some(key) = key {
            debug!("installed `{key}` style {style:?}");
            registry.record(key, style);
        }
        Ok(style)
    }
}
