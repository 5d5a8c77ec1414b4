//! Arena-backed document tree.
//!
//! Nodes live in an `indextree` arena and are addressed from the outside by
//! [`NodeKey`]. Structural mutations are broadcast to mirrors as soon as they
//! happen; mirrors decide when to drain them.

pub mod body;

use crate::{DOMMirror, DOMSubscriber, DOMUpdate, DomError, NodeKey, WindowId};
use indextree::{Arena, Node, NodeId};
use log::trace;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::{broadcast, watch};

/// Capacity of the update broadcast channel, in batches.
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Documents are shared between the injector, the coordinator and pending waits
/// on a single-threaded event loop.
pub type SharedDocument = Rc<RefCell<Document>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
    /// Root of an isolated subtree attached to `host`.
    ShadowRoot {
        host: NodeKey,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
    /// Inline style declarations, in the order they were first set.
    pub styles: SmallVec<(String, String), 4>,
}

impl DOMNode {
    fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    fn is_container(&self) -> bool {
        !matches!(self.kind, NodeKind::Text { .. })
    }
}

#[derive(Debug)]
pub struct Document {
    dom: Arena<DOMNode>,
    ids: HashMap<NodeKey, NodeId>,
    next_key: u64,
    html: NodeKey,
    head: NodeKey,
    body: watch::Sender<Option<NodeKey>>,
    shadow_roots: HashMap<NodeKey, NodeKey>,
    default_view: Option<WindowId>,
    update_sender: broadcast::Sender<Vec<DOMUpdate>>,
}

impl Document {
    /// Create a `#document > html > head` skeleton without a body.
    ///
    /// `default_view` is the window the document is displayed in; detached
    /// documents (templates, parsed fragments) have none.
    pub fn new(default_view: Option<WindowId>) -> Self {
        let (update_sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (body, _) = watch::channel(None);
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let mut document = Self {
            dom,
            ids: HashMap::from([(NodeKey::ROOT, root)]),
            next_key: 1,
            html: NodeKey::ROOT,
            head: NodeKey::ROOT,
            body,
            shadow_roots: HashMap::new(),
            default_view,
            update_sender,
        };
        let html = document.alloc(NodeKind::Element {
            tag: String::from("html"),
        });
        let head = document.alloc(NodeKind::Element {
            tag: String::from("head"),
        });
        if let (Some(&html_id), Some(&head_id)) = (document.ids.get(&html), document.ids.get(&head)) {
            root.append(html_id, &mut document.dom);
            html_id.append(head_id, &mut document.dom);
        }
        document.html = html;
        document.head = head;
        document
    }

    /// Create a document wrapped for shared single-threaded access.
    pub fn new_shared(default_view: Option<WindowId>) -> SharedDocument {
        Rc::new(RefCell::new(Self::new(default_view)))
    }

    #[inline]
    pub const fn default_view(&self) -> Option<WindowId> {
        self.default_view
    }

    /// The head-equivalent insertion point of the main tree.
    #[inline]
    pub const fn head(&self) -> NodeKey {
        self.head
    }

    #[inline]
    pub fn body(&self) -> Option<NodeKey> {
        *self.body.borrow()
    }

    /// A receiver that observes the body being created or removed.
    #[inline]
    pub fn body_ready(&self) -> watch::Receiver<Option<NodeKey>> {
        self.body.subscribe()
    }

    /// Subscribe to raw update batches broadcast from now on.
    #[inline]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.update_sender.subscribe()
    }

    /// Wrap `subscriber` in a mirror seeded with the current tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber rejects one of the replayed updates.
    pub fn mirror<T: DOMSubscriber>(&self, mut subscriber: T) -> anyhow::Result<DOMMirror<T>> {
        let receiver = self.update_sender.subscribe();
        for update in self.replay() {
            subscriber.apply_update(update)?;
        }
        Ok(DOMMirror::new(receiver, subscriber))
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    /// Return the body, creating and appending it to `html` when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be inserted.
    pub fn create_body(&mut self) -> Result<NodeKey, DomError> {
        if let Some(body) = self.body() {
            return Ok(body);
        }
        let body = self.create_element("body");
        self.append_child(self.html, body)?;
        Ok(body)
    }

    /// Append `child` as the last child of `parent`, moving it if it is attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown nodes, text parents or cyclic insertions.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        let parent_id = self.container_id(parent)?;
        let child_id = self.id(child)?;
        let mut batch = self.detach_updates(child_id);
        parent_id
            .checked_append(child_id, &mut self.dom)
            .map_err(|err| DomError::Hierarchy {
                node: child,
                reason: err.to_string(),
            })?;
        self.finish_insert(child_id, &mut batch);
        self.emit(batch);
        Ok(())
    }

    /// Insert `node` immediately after `after`, or as the first child of `root`
    /// when `after` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if `after` is not a child of `root`, or for unknown nodes.
    pub fn insert_after_or_at_start(
        &mut self,
        root: NodeKey,
        node: NodeKey,
        after: Option<NodeKey>,
    ) -> Result<(), DomError> {
        let root_id = self.container_id(root)?;
        let node_id = self.id(node)?;
        let mut batch = self.detach_updates(node_id);
        let inserted = match after {
            Some(after_key) => {
                if self.parent(after_key) != Some(root) {
                    return Err(DomError::NotAChild {
                        parent: root,
                        child: after_key,
                    });
                }
                self.id(after_key)?
                    .checked_insert_after(node_id, &mut self.dom)
            }
            None => root_id.checked_prepend(node_id, &mut self.dom),
        };
        inserted.map_err(|err| DomError::Hierarchy {
            node,
            reason: err.to_string(),
        })?;
        self.finish_insert(node_id, &mut batch);
        self.emit(batch);
        Ok(())
    }

    /// Remove `node` and its subtree from the document.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown nodes or for the document skeleton.
    pub fn remove_node(&mut self, node: NodeKey) -> Result<(), DomError> {
        if node == NodeKey::ROOT || node == self.html || node == self.head {
            return Err(DomError::Hierarchy {
                node,
                reason: String::from("the document skeleton cannot be removed"),
            });
        }
        let id = self.id(node)?;
        let removed = self.subtree_keys(id);
        id.remove_subtree(&mut self.dom);
        for key in &removed {
            self.ids.remove(key);
        }
        if self.body().is_some_and(|body| removed.contains(&body)) {
            self.body.send_replace(None);
        }
        self.emit(
            removed
                .into_iter()
                .rev()
                .map(|key| DOMUpdate::RemoveNode { node: key })
                .collect(),
        );
        Ok(())
    }

    /// Attach an isolated sub-root to `host`, or return the existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an element.
    pub fn attach_shadow(&mut self, host: NodeKey) -> Result<NodeKey, DomError> {
        self.element(host)?;
        if let Some(&existing) = self.shadow_roots.get(&host) {
            return Ok(existing);
        }
        let root = self.alloc(NodeKind::ShadowRoot { host });
        self.shadow_roots.insert(host, root);
        self.emit(vec![DOMUpdate::AttachShadow { host, root }]);
        Ok(root)
    }

    #[inline]
    pub fn shadow_root(&self, host: NodeKey) -> Option<NodeKey> {
        self.shadow_roots.get(&host).copied()
    }

    /// The tree scope owning `node`: the document node, a shadow root, or the
    /// top of a detached subtree.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown nodes.
    pub fn tree_scope(&self, node: NodeKey) -> Result<NodeKey, DomError> {
        let id = self.id(node)?;
        let top = id.ancestors(&self.dom).last().unwrap_or(id);
        self.key_of(top).ok_or(DomError::UnknownNode(node))
    }

    pub fn node(&self, node: NodeKey) -> Option<&DOMNode> {
        self.ids
            .get(&node)
            .and_then(|id| self.dom.get(*id))
            .map(Node::get)
    }

    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let parent = self.dom.get(*id)?.parent()?;
        self.key_of(parent)
    }

    pub fn children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.ids.get(&node).map_or_else(Vec::new, |id| {
            id.children(&self.dom)
                .filter_map(|child| self.key_of(child))
                .collect()
        })
    }

    pub fn first_child(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let child = self.dom.get(*id)?.first_child()?;
        self.key_of(child)
    }

    pub fn last_child(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let child = self.dom.get(*id)?.last_child()?;
        self.key_of(child)
    }

    /// Lowercase tag name for elements, `None` for any other node.
    pub fn tag_name(&self, node: NodeKey) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Set or replace an attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not an element.
    pub fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let data = self.element_mut(node)?;
        upsert(&mut data.attrs, name, value);
        self.emit(vec![DOMUpdate::SetAttr {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        }]);
        Ok(())
    }

    pub fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        lookup(&self.node(node)?.attrs, name)
    }

    #[inline]
    pub fn has_attribute(&self, node: NodeKey, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Replace all children of `node` with a single text node.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is unknown or is itself a text node.
    pub fn set_text_content(&mut self, node: NodeKey, text: &str) -> Result<(), DomError> {
        let id = self.container_id(node)?;
        let stale: Vec<NodeKey> = id
            .children(&self.dom)
            .filter_map(|child| self.key_of(child))
            .collect();
        for child in stale {
            self.remove_node(child)?;
        }
        let text_node = self.alloc(NodeKind::Text {
            text: text.to_owned(),
        });
        self.append_child(node, text_node)
    }

    /// Concatenated text of every text node below `node`.
    pub fn text_content(&self, node: NodeKey) -> String {
        let Some(id) = self.ids.get(&node) else {
            return String::new();
        };
        id.descendants(&self.dom)
            .filter_map(|desc| self.dom.get(desc))
            .filter_map(|desc| match &desc.get().kind {
                NodeKind::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Apply inline style declarations to an element and reflect them in its
    /// `style` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if `element` is not an element.
    pub fn set_styles(&mut self, element: NodeKey, styles: &[(&str, &str)]) -> Result<(), DomError> {
        let data = self.element_mut(element)?;
        for &(property, value) in styles {
            upsert(&mut data.styles, property, value);
        }
        let serialized = data
            .styles
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(element, "style", &serialized)
    }

    /// Current inline value of `property` on `element`.
    pub fn style(&self, element: NodeKey, property: &str) -> Option<&str> {
        lookup(&self.node(element)?.styles, property)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        let id = self.dom.new_node(DOMNode {
            key,
            kind,
            ..DOMNode::default()
        });
        self.ids.insert(key, id);
        key
    }

    fn id(&self, key: NodeKey) -> Result<NodeId, DomError> {
        self.ids.get(&key).copied().ok_or(DomError::UnknownNode(key))
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.dom.get(id).map(|node| node.get().key)
    }

    fn container_id(&self, key: NodeKey) -> Result<NodeId, DomError> {
        let id = self.id(key)?;
        match self.dom.get(id) {
            Some(node) if node.get().is_container() => Ok(id),
            Some(_) => Err(DomError::NotAnElement(key)),
            None => Err(DomError::UnknownNode(key)),
        }
    }

    fn element(&self, key: NodeKey) -> Result<&DOMNode, DomError> {
        match self.node(key) {
            Some(data) if data.is_element() => Ok(data),
            Some(_) => Err(DomError::NotAnElement(key)),
            None => Err(DomError::UnknownNode(key)),
        }
    }

    fn element_mut(&mut self, key: NodeKey) -> Result<&mut DOMNode, DomError> {
        let id = self.id(key)?;
        match self.dom.get_mut(id).map(Node::get_mut) {
            Some(data) if data.is_element() => Ok(data),
            Some(_) => Err(DomError::NotAnElement(key)),
            None => Err(DomError::UnknownNode(key)),
        }
    }

    fn subtree_keys(&self, id: NodeId) -> Vec<NodeKey> {
        id.descendants(&self.dom)
            .filter_map(|desc| self.key_of(desc))
            .collect()
    }

    /// Removal updates for a node that is about to move to a new parent.
    fn detach_updates(&self, id: NodeId) -> Vec<DOMUpdate> {
        let attached = self.dom.get(id).and_then(Node::parent).is_some();
        if !attached {
            return Vec::new();
        }
        self.subtree_keys(id)
            .into_iter()
            .rev()
            .map(|key| DOMUpdate::RemoveNode { node: key })
            .collect()
    }

    fn finish_insert(&mut self, id: NodeId, batch: &mut Vec<DOMUpdate>) {
        let pos = id.preceding_siblings(&self.dom).count().saturating_sub(1);
        self.collect_insertions(id, pos, batch);
        self.note_body(id);
    }

    /// Track the first `body` element placed directly under `html`.
    fn note_body(&self, id: NodeId) {
        if self.body().is_some() {
            return;
        }
        let Some(key) = self.key_of(id) else {
            return;
        };
        if self.tag_name(key) == Some("body") && self.parent(key) == Some(self.html) {
            trace!("body element {key:?} is available");
            self.body.send_replace(Some(key));
        }
    }

    fn collect_insertions(&self, id: NodeId, pos: usize, out: &mut Vec<DOMUpdate>) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        let data = node.get();
        let parent = node
            .parent()
            .and_then(|parent| self.key_of(parent))
            .unwrap_or(NodeKey::ROOT);
        match &data.kind {
            NodeKind::Element { tag } => {
                out.push(DOMUpdate::InsertElement {
                    parent,
                    node: data.key,
                    tag: tag.clone(),
                    pos,
                });
                for (name, value) in data.attrs.iter() {
                    out.push(DOMUpdate::SetAttr {
                        node: data.key,
                        name: name.clone(),
                        value: value.clone(),
                    });
                }
            }
            NodeKind::Text { text } => out.push(DOMUpdate::InsertText {
                parent,
                node: data.key,
                text: text.clone(),
                pos,
            }),
            NodeKind::Document | NodeKind::ShadowRoot { .. } => {}
        }
        for (index, child) in id.children(&self.dom).enumerate() {
            self.collect_insertions(child, index, out);
        }
        if let Some(&shadow) = self.shadow_roots.get(&data.key) {
            out.push(DOMUpdate::AttachShadow {
                host: data.key,
                root: shadow,
            });
            if let Some(&shadow_id) = self.ids.get(&shadow) {
                for (index, child) in shadow_id.children(&self.dom).enumerate() {
                    self.collect_insertions(child, index, out);
                }
            }
        }
    }

    /// The whole current tree expressed as insertion updates.
    fn replay(&self) -> Vec<DOMUpdate> {
        let mut out = Vec::new();
        if let Some(&root) = self.ids.get(&NodeKey::ROOT) {
            for (index, child) in root.children(&self.dom).enumerate() {
                self.collect_insertions(child, index, &mut out);
            }
        }
        out
    }

    fn emit(&self, batch: Vec<DOMUpdate>) {
        if batch.is_empty() {
            return;
        }
        if self.update_sender.send(batch).is_err() {
            trace!("no mirrors subscribed; dropping update batch");
        }
    }
}

fn upsert(entries: &mut SmallVec<(String, String), 4>, name: &str, value: &str) {
    if let Some(entry) = entries.iter_mut().find(|(existing, _)| existing == name) {
        value.clone_into(&mut entry.1);
    } else {
        entries.push((name.to_owned(), value.to_owned()));
    }
}

fn lookup<'doc>(entries: &'doc SmallVec<(String, String), 4>, name: &str) -> Option<&'doc str> {
    entries
        .iter()
        .find(|(existing, _)| existing == name)
        .map(|(_, value)| value.as_str())
}
