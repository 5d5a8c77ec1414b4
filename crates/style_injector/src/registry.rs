//! Per-root map from logical key to the style node owning it.

use crate::key::StyleKey;
use dom::{Document, NodeKey};
use log::debug;
use std::collections::HashMap;

/// Style nodes installed under one [`StyleRoot`](crate::StyleRoot), by logical key.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: HashMap<StyleKey, NodeKey>,
}

impl StyleRegistry {
    /// Find the node owning `key` under `root`.
    ///
    /// Falls back to the root's children so stylesheets that were already in
    /// the document (server-rendered) are adopted instead of duplicated.
    pub fn lookup(&mut self, document: &Document, root: NodeKey, key: &StyleKey) -> Option<NodeKey> {
        if let Some(&node) = self.styles.get(key) {
            return Some(node);
        }
        let adopted = document
            .children(root)
            .into_iter()
            .find(|&child| key.is_marked(document, child))?;
        debug!("adopting existing `{key}` style {adopted:?}");
        self.styles.insert(key.clone(), adopted);
        Some(adopted)
    }

    #[inline]
    pub fn record(&mut self, key: StyleKey, node: NodeKey) {
        self.styles.insert(key, node);
    }

    #[inline]
    pub fn get(&self, key: &StyleKey) -> Option<NodeKey> {
        self.styles.get(key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
