//! In-memory target tree backed by an `indextree` arena.

use crate::{DomSubscriber, DomUpdate, Listener, NodeKey, TargetTree};
use core::mem;
use indextree::{Arena, Node, NodeId};
use log::{trace, warn};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
        svg: bool,
    },
    Text {
        text: String,
    },
    /// Opaque markup installed through [`TargetTree::set_raw_content`].
    Raw {
        markup: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
    pub properties: SmallVec<(String, bool), 2>,
}

/// A headless document. Keys are minted sequentially; `NodeKey::ROOT` is the
/// document node itself.
pub struct Document {
    pub(crate) arena: Arena<DomNode>,
    pub(crate) root: NodeId,
    ids: HashMap<NodeKey, NodeId>,
    next_key: u64,
    listeners: HashMap<(NodeKey, String), Listener>,
    updates: Vec<DomUpdate>,
    record_updates: bool,
    subscribers: Vec<Box<dyn DomSubscriber>>,
}

impl Document {
    /// Create an empty document that records its updates.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::default());
        let mut ids = HashMap::new();
        ids.insert(NodeKey::ROOT, root);
        Self {
            arena,
            root,
            ids,
            next_key: 1,
            listeners: HashMap::new(),
            updates: Vec::new(),
            record_updates: true,
            subscribers: Vec::new(),
        }
    }

    /// The document node.
    pub const fn root(&self) -> NodeKey {
        NodeKey::ROOT
    }

    /// Enable or disable the update log. Subscribers are notified either way.
    pub fn set_record_updates(&mut self, record: bool) {
        self.record_updates = record;
    }

    /// Register a subscriber notified of every subsequent update.
    pub fn subscribe(&mut self, subscriber: Box<dyn DomSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Updates recorded since creation or the last [`Self::take_updates`].
    pub fn updates(&self) -> &[DomUpdate] {
        &self.updates
    }

    pub fn take_updates(&mut self) -> Vec<DomUpdate> {
        mem::take(&mut self.updates)
    }

    pub fn node(&self, key: NodeKey) -> Option<&DomNode> {
        let id = self.ids.get(&key)?;
        self.arena.get(*id).map(Node::get)
    }

    /// Whether `key` is currently reachable from the document root.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        self.ids
            .get(&key)
            .is_some_and(|id| id.ancestors(&self.arena).any(|ancestor| ancestor == self.root))
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.node(key)?
            .attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn property(&self, key: NodeKey, name: &str) -> Option<bool> {
        self.node(key)?
            .properties
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, value)| *value)
    }

    pub fn listener(&self, key: NodeKey, event: &str) -> Option<Listener> {
        self.listeners.get(&(key, event.to_owned())).cloned()
    }

    /// Invoke the listener for `event` on `key`. Returns whether one was attached.
    pub fn dispatch(&self, key: NodeKey, event: &str) -> bool {
        match self.listener(key, event) {
            Some(listener) => {
                listener();
                true
            }
            None => false,
        }
    }

    /// Concatenated text of every text and raw descendant of `key`.
    pub fn text_content(&self, key: NodeKey) -> String {
        let Some(id) = self.ids.get(&key) else {
            return String::new();
        };
        let mut out = String::new();
        for descendant in id.descendants(&self.arena) {
            match self.arena.get(descendant).map(|node| &node.get().kind) {
                Some(NodeKind::Text { text }) => out.push_str(text),
                Some(NodeKind::Raw { markup }) => out.push_str(markup),
                _ => {}
            }
        }
        out
    }

    fn mint(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        let id = self.arena.new_node(DomNode {
            key,
            kind,
            ..DomNode::default()
        });
        self.ids.insert(key, id);
        key
    }

    pub(crate) fn ids_lookup(&self, key: NodeKey) -> Option<NodeId> {
        self.ids.get(&key).copied()
    }

    fn id_of(&self, key: NodeKey) -> Option<NodeId> {
        let found = self.ids.get(&key).copied();
        if found.is_none() {
            warn!("Ignoring operation on unknown node {key}");
        }
        found
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.arena.get(id).map(|node| node.get().key)
    }

    fn node_mut(&mut self, key: NodeKey) -> Option<&mut DomNode> {
        let id = self.id_of(key)?;
        self.arena.get_mut(id).map(Node::get_mut)
    }

    fn emit(&mut self, update: DomUpdate) {
        trace!("dom update: {update:?}");
        for subscriber in &mut self.subscribers {
            if let Err(err) = subscriber.apply_update(&update) {
                warn!("DOM subscriber failed on {update:?}: {err}");
            }
        }
        if self.record_updates {
            self.updates.push(update);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetTree for Document {
    fn create_element(&mut self, tag: &str, svg: bool) -> NodeKey {
        let node = self.mint(NodeKind::Element {
            tag: tag.to_owned(),
            svg,
        });
        self.emit(DomUpdate::CreateElement {
            node,
            tag: tag.to_owned(),
            svg,
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeKey {
        let node = self.mint(NodeKind::Text {
            text: text.to_owned(),
        });
        self.emit(DomUpdate::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn tag_name(&self, node: NodeKey) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn is_text(&self, node: NodeKey) -> bool {
        self.node(node)
            .is_some_and(|dom| matches!(dom.kind, NodeKind::Text { .. }))
    }

    fn set_text(&mut self, node: NodeKey, text: &str) {
        let Some(dom) = self.node_mut(node) else { return };
        if let NodeKind::Text { text: current } = &mut dom.kind {
            text.clone_into(current);
            self.emit(DomUpdate::SetText {
                node,
                text: text.to_owned(),
            });
        } else {
            warn!("set_text on non-text node {node}");
        }
    }

    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) {
        let Some(dom) = self.node_mut(node) else { return };
        match dom.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some((_, current)) => value.clone_into(current),
            None => dom.attrs.push((name.to_owned(), value.to_owned())),
        }
        self.emit(DomUpdate::SetAttr {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    fn remove_attribute(&mut self, node: NodeKey, name: &str) {
        let Some(dom) = self.node_mut(node) else { return };
        dom.attrs.retain(|(attr, _)| attr != name);
        self.emit(DomUpdate::RemoveAttr {
            node,
            name: name.to_owned(),
        });
    }

    fn set_property(&mut self, node: NodeKey, name: &str, value: bool) {
        let Some(dom) = self.node_mut(node) else { return };
        match dom.properties.iter_mut().find(|(prop, _)| prop == name) {
            Some((_, current)) => *current = value,
            None => dom.properties.push((name.to_owned(), value)),
        }
        self.emit(DomUpdate::SetProperty {
            node,
            name: name.to_owned(),
            value,
        });
    }

    fn set_listener(&mut self, node: NodeKey, event: &str, listener: Option<Listener>) {
        if self.id_of(node).is_none() {
            return;
        }
        let attached = listener.is_some();
        let slot = (node, event.to_owned());
        match listener {
            Some(listener) => {
                self.listeners.insert(slot, listener);
            }
            None => {
                self.listeners.remove(&slot);
            }
        }
        self.emit(DomUpdate::SetListener {
            node,
            event: event.to_owned(),
            attached,
        });
    }

    fn set_raw_content(&mut self, node: NodeKey, markup: &str) {
        let Some(id) = self.id_of(node) else { return };
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            child.detach(&mut self.arena);
        }
        if !markup.is_empty() {
            let raw = self.mint(NodeKind::Raw {
                markup: markup.to_owned(),
            });
            let appended = self
                .ids
                .get(&raw)
                .copied()
                .map(|raw_id| id.checked_append(raw_id, &mut self.arena));
            if let Some(Err(err)) = appended {
                warn!("Failed to install raw content under {node}: {err}");
            }
        }
        self.emit(DomUpdate::SetRawContent {
            node,
            markup: markup.to_owned(),
        });
    }

    fn insert_before(&mut self, parent: NodeKey, child: NodeKey, before: Option<NodeKey>) {
        if before == Some(child) {
            return;
        }
        let (Some(parent_id), Some(child_id)) = (self.id_of(parent), self.id_of(child)) else {
            return;
        };
        child_id.detach(&mut self.arena);
        let sibling = before
            .and_then(|key| self.ids.get(&key).copied())
            .filter(|id| self.arena.get(*id).and_then(Node::parent) == Some(parent_id));
        let result = match sibling {
            Some(sibling_id) => sibling_id.checked_insert_before(child_id, &mut self.arena),
            None => parent_id.checked_append(child_id, &mut self.arena),
        };
        if let Err(err) = result {
            warn!("Failed to insert {child} under {parent}: {err}");
            return;
        }
        self.emit(DomUpdate::Insert {
            parent,
            node: child,
            before: sibling.and(before),
        });
    }

    fn remove(&mut self, node: NodeKey) {
        let Some(id) = self.id_of(node) else { return };
        if self.arena.get(id).and_then(Node::parent).is_none() {
            return;
        }
        id.detach(&mut self.arena);
        self.emit(DomUpdate::Remove { node });
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let parent = self.arena.get(*id)?.parent()?;
        self.key_of(parent)
    }

    fn first_child(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let child = self.arena.get(*id)?.first_child()?;
        self.key_of(child)
    }

    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let sibling = self.arena.get(*id)?.next_sibling()?;
        self.key_of(sibling)
    }

    fn child_nodes(&self, node: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.ids.get(&node) else {
            return Vec::new();
        };
        id.children(&self.arena)
            .filter_map(|child| self.key_of(child))
            .collect()
    }
}
