//! Active stylesheet tracking for the style injection runtime.
//!
//! [`StyleSheetList`] mirrors the document through `DOMUpdate` batches and
//! records which `<style>` elements the style engine has taken in, per tree
//! scope. A sheet only becomes active once the mirror has drained the batch
//! that inserted it, which is what readiness polling observes.

use anyhow::Result;
use dom::{DOMMirror, DOMSubscriber, DOMUpdate, NodeKey};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Read access to the host's list of active stylesheets.
pub trait ActiveStyleSheets {
    /// Whether the active sheet list of `scope` has an entry owned by `node`.
    fn owns_sheet(&self, scope: NodeKey, node: NodeKey) -> bool;
}

/// A `<style>` element the engine has registered as a stylesheet.
#[derive(Debug, Clone)]
pub struct ActiveSheet {
    pub node: NodeKey,
    pub scope: NodeKey,
    chunks: Vec<(NodeKey, String)>,
}

impl ActiveSheet {
    /// Source text of the sheet as currently mirrored.
    pub fn text(&self) -> String {
        self.chunks.iter().map(|(_, text)| text.as_str()).collect()
    }
}

#[derive(Debug)]
pub struct StyleSheetList {
    parents: HashMap<NodeKey, NodeKey>,
    /// Tree scopes: the document node plus every attached shadow root.
    scopes: HashSet<NodeKey>,
    sheets: Vec<ActiveSheet>,
    /// Text node -> owning style node.
    text_owner: HashMap<NodeKey, NodeKey>,
}

impl Default for StyleSheetList {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSheetList {
    pub fn new() -> Self {
        Self {
            parents: HashMap::new(),
            scopes: HashSet::from([NodeKey::ROOT]),
            sheets: Vec::new(),
            text_owner: HashMap::new(),
        }
    }

    /// Active sheets of `scope`, in the order the engine registered them.
    pub fn sheets(&self, scope: NodeKey) -> impl Iterator<Item = &ActiveSheet> {
        self.sheets.iter().filter(move |sheet| sheet.scope == scope)
    }

    pub fn sheet_text(&self, node: NodeKey) -> Option<String> {
        self.sheet(node).map(ActiveSheet::text)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    fn sheet(&self, node: NodeKey) -> Option<&ActiveSheet> {
        self.sheets.iter().find(|sheet| sheet.node == node)
    }

    /// Walk up to the top of `node`'s subtree; `None` unless that is a known scope.
    fn scope_of(&self, node: NodeKey) -> Option<NodeKey> {
        let mut current = node;
        for _ in 0..=self.parents.len() {
            match self.parents.get(&current) {
                Some(&parent) => current = parent,
                None => return self.scopes.contains(&current).then_some(current),
            }
        }
        None
    }

    fn register_style(&mut self, node: NodeKey) {
        if self.sheet(node).is_some() {
            return;
        }
        match self.scope_of(node) {
            Some(scope) => {
                debug!("stylesheet {node:?} active in scope {scope:?}");
                self.sheets.push(ActiveSheet {
                    node,
                    scope,
                    chunks: Vec::new(),
                });
            }
            None => trace!("style {node:?} is not connected to a tree scope"),
        }
    }

    fn forget(&mut self, node: NodeKey) {
        self.parents.remove(&node);
        let before = self.sheets.len();
        self.sheets.retain(|sheet| sheet.node != node);
        if self.sheets.len() != before {
            debug!("stylesheet {node:?} retracted");
        }
        let owner = self.text_owner.remove(&node);
        if let Some(sheet) = owner.and_then(|style| self.sheets.iter_mut().find(|sheet| sheet.node == style)) {
            sheet.chunks.retain(|(text_node, _)| *text_node != node);
        }
    }
}

impl DOMSubscriber for StyleSheetList {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()> {
        use DOMUpdate::*;
        match update {
            InsertElement {
                parent, node, tag, ..
            } => {
                self.parents.insert(node, parent);
                if tag.eq_ignore_ascii_case("style") {
                    self.register_style(node);
                }
            }
            InsertText {
                parent, node, text, ..
            } => {
                self.parents.insert(node, parent);
                if let Some(sheet) = self.sheets.iter_mut().find(|sheet| sheet.node == parent) {
                    sheet.chunks.push((node, text));
                    self.text_owner.insert(node, parent);
                }
            }
            RemoveNode { node } => self.forget(node),
            AttachShadow { root, .. } => {
                self.scopes.insert(root);
            }
            SetAttr { .. } => {}
        }
        Ok(())
    }
}

impl ActiveStyleSheets for StyleSheetList {
    #[inline]
    fn owns_sheet(&self, scope: NodeKey, node: NodeKey) -> bool {
        self.sheets
            .iter()
            .any(|sheet| sheet.node == node && sheet.scope == scope)
    }
}

impl ActiveStyleSheets for DOMMirror<StyleSheetList> {
    #[inline]
    fn owns_sheet(&self, scope: NodeKey, node: NodeKey) -> bool {
        self.mirror().owns_sheet(scope, node)
    }
}

/// A sheet list that is currently being mutated reports nothing as active; the
/// next poll sees the settled state.
impl<T: ActiveStyleSheets> ActiveStyleSheets for RefCell<T> {
    #[inline]
    fn owns_sheet(&self, scope: NodeKey, node: NodeKey) -> bool {
        self.try_borrow()
            .is_ok_and(|sheets| sheets.owns_sheet(scope, node))
    }
}
