//! Live target tree primitives shared by the reconciler and its hosts.
//!
//! The reconciler never touches a concrete tree directly. It drives the
//! [`TargetTree`] adapter, addressing nodes through stable [`NodeKey`] handles.
//! [`Document`] is the in-memory implementation used by tests and headless
//! hosts; it records every mutation as a [`DomUpdate`] so callers can check
//! that a pass produced the minimal set of changes.
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

use core::fmt;
use serde::Serialize;
use std::rc::Rc;

pub mod document;
mod printing;

pub use document::{Document, DomNode, NodeKind};

/// A stable key for live nodes, valid for the lifetime of the tree that minted it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The root node key (always present in a [`Document`]).
    pub const ROOT: Self = Self(0);
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::ROOT
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Event listener attached to a live node.
pub type Listener = Rc<dyn Fn()>;

/// A single mutation applied to a target tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomUpdate {
    CreateElement {
        node: NodeKey,
        tag: String,
        svg: bool,
    },
    CreateText {
        node: NodeKey,
        text: String,
    },
    Insert {
        parent: NodeKey,
        node: NodeKey,
        before: Option<NodeKey>,
    },
    SetText {
        node: NodeKey,
        text: String,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveAttr {
        node: NodeKey,
        name: String,
    },
    SetProperty {
        node: NodeKey,
        name: String,
        value: bool,
    },
    SetListener {
        node: NodeKey,
        event: String,
        attached: bool,
    },
    SetRawContent {
        node: NodeKey,
        markup: String,
    },
    Remove {
        node: NodeKey,
    },
}

impl DomUpdate {
    /// The node this update targets.
    pub const fn node(&self) -> NodeKey {
        match self {
            Self::CreateElement { node, .. }
            | Self::CreateText { node, .. }
            | Self::Insert { node, .. }
            | Self::SetText { node, .. }
            | Self::SetAttr { node, .. }
            | Self::RemoveAttr { node, .. }
            | Self::SetProperty { node, .. }
            | Self::SetListener { node, .. }
            | Self::SetRawContent { node, .. }
            | Self::Remove { node } => *node,
        }
    }

    /// Whether this update created a brand-new node.
    pub const fn is_creation(&self) -> bool {
        matches!(self, Self::CreateElement { .. } | Self::CreateText { .. })
    }
}

/// A subscriber that observes every update applied to a [`Document`].
pub trait DomSubscriber {
    /// Observe a single update, after it has been applied.
    ///
    /// # Errors
    /// Implementations may fail; the document logs the failure and keeps going.
    fn apply_update(&mut self, update: &DomUpdate) -> anyhow::Result<()>;
}

/// Adapter over the live mutable tree a reconcile pass brings in sync.
///
/// Mutations are infallible from the caller's point of view: implementations
/// ignore (and log) operations on unknown keys, the same way a DOM ignores
/// stale handles.
pub trait TargetTree {
    /// Create a detached element node.
    fn create_element(&mut self, tag: &str, svg: bool) -> NodeKey;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeKey;

    /// Tag name of an element node, `None` for anything else.
    fn tag_name(&self, node: NodeKey) -> Option<&str>;

    /// Whether `node` is a text node.
    fn is_text(&self, node: NodeKey) -> bool;

    /// Replace the payload of a text node.
    fn set_text(&mut self, node: NodeKey, text: &str);

    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeKey, name: &str);

    /// Set a boolean element property (as opposed to a serialized attribute).
    fn set_property(&mut self, node: NodeKey, name: &str, value: bool);

    /// Attach, replace, or (with `None`) detach the listener for `event`.
    fn set_listener(&mut self, node: NodeKey, event: &str, listener: Option<Listener>);

    /// Replace every child of `node` with raw markup.
    fn set_raw_content(&mut self, node: NodeKey, markup: &str);

    /// Insert `child` under `parent` before `before`, or at the end when `before`
    /// is `None` or not a child of `parent`. Moves the node if already attached.
    fn insert_before(&mut self, parent: NodeKey, child: NodeKey, before: Option<NodeKey>);

    /// Detach `node` from its parent.
    fn remove(&mut self, node: NodeKey);

    fn parent(&self, node: NodeKey) -> Option<NodeKey>;

    fn first_child(&self, node: NodeKey) -> Option<NodeKey>;

    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey>;

    /// Children of `node`, in order.
    fn child_nodes(&self, node: NodeKey) -> Vec<NodeKey>;

    /// Take the first node of `pool` matching `tag` (or any text node when `tag`
    /// is `None`), leaving a hole in its place.
    fn locate_child(&self, pool: &mut [Option<NodeKey>], tag: Option<&str>) -> Option<NodeKey> {
        for entry in pool.iter_mut() {
            let Some(node) = *entry else { continue };
            let hit = match tag {
                None => self.is_text(node),
                Some(name) => self.tag_name(node) == Some(name),
            };
            if hit {
                *entry = None;
                return Some(node);
            }
        }
        None
    }
}
