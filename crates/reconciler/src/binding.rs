//! Per-position binding records.
//!
//! The binding tree mirrors the realized tree: one arena node per rendered
//! position, holding the description rendered there last, the live node it
//! owns (elements and text only) and, for components, the instance. Parent
//! links are arena ids and never own anything.

use anyhow::{Result, anyhow};
use indextree::{Arena, Node, NodeId};
use target_tree::NodeKey;

use crate::component::{Component, ComponentType, RenderCallback, State};
use crate::context::{ComponentContext, Context};
use crate::queue::ComponentLink;
use crate::vnode::{Props, VNode};

/// Handle of a binding record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(pub(crate) NodeId);

/// Handle of a component instance; shares the id of the binding owning it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) NodeId);

impl From<InstanceId> for BindingId {
    fn from(id: InstanceId) -> Self {
        Self(id.0)
    }
}

#[derive(Default)]
pub(crate) struct Binding {
    pub vnode: Option<VNode>,
    pub dom: Option<NodeKey>,
    pub instance: Option<Instance>,
}

/// Live component occurrence.
pub(crate) struct Instance {
    pub component: Box<dyn Component>,
    pub ty: ComponentType,
    pub link: ComponentLink,
    pub props: Props,
    pub state: State,
    pub next_state: Option<State>,
    pub context: ComponentContext,
    pub rendered_context: Context,
    pub pending_error: bool,
    pub processing_exception: bool,
    pub render_callbacks: Vec<RenderCallback>,
    pub parent_dom: Option<NodeKey>,
    pub svg: bool,
    /// Provider this instance subscribed to.
    pub provider: Option<InstanceId>,
    /// Consumers subscribed to this instance, when it is a provider.
    pub subscribers: Vec<InstanceId>,
}

pub(crate) fn binding(arena: &Arena<Binding>, id: NodeId) -> Option<&Binding> {
    if id.is_removed(arena) {
        return None;
    }
    arena.get(id).map(Node::get)
}

pub(crate) fn binding_mut(arena: &mut Arena<Binding>, id: NodeId) -> Option<&mut Binding> {
    if id.is_removed(arena) {
        return None;
    }
    arena.get_mut(id).map(Node::get_mut)
}

pub(crate) fn instance(arena: &Arena<Binding>, id: InstanceId) -> Option<&Instance> {
    binding(arena, id.0)?.instance.as_ref()
}

/// Mutable instance lookup over the arena alone, so callers can keep other
/// fields of the reconciler borrowed.
pub(crate) fn instance_in(arena: &mut Arena<Binding>, id: InstanceId) -> Result<&mut Instance> {
    binding_mut(arena, id.0)
        .and_then(|record| record.instance.as_mut())
        .ok_or_else(|| anyhow!("component instance {id:?} is not mounted"))
}

pub(crate) fn parent(arena: &Arena<Binding>, id: NodeId) -> Option<NodeId> {
    if id.is_removed(arena) {
        return None;
    }
    arena.get(id)?.parent()
}

/// Live nodes owned by the top of the subtree at `id`, in order: the node
/// itself for elements and text, otherwise the nodes of its children.
pub(crate) fn top_nodes(arena: &Arena<Binding>, id: NodeId) -> Vec<NodeKey> {
    let mut out = Vec::new();
    collect_top_nodes(arena, id, &mut out);
    out
}

fn collect_top_nodes(arena: &Arena<Binding>, id: NodeId, out: &mut Vec<NodeKey>) {
    let Some(record) = binding(arena, id) else {
        return;
    };
    if let Some(dom) = record.dom {
        out.push(dom);
        return;
    }
    if record.vnode.as_ref().is_some_and(|vnode| vnode.tag_name().is_some()) {
        return;
    }
    for child in id.children(arena) {
        collect_top_nodes(arena, child, out);
    }
}

pub(crate) fn first_node(arena: &Arena<Binding>, id: NodeId) -> Option<NodeKey> {
    let record = binding(arena, id)?;
    if record.dom.is_some() {
        return record.dom;
    }
    id.children(arena).find_map(|child| first_node(arena, child))
}

/// First live node after the subtree at `id` within the same parent node.
pub(crate) fn node_sibling(arena: &Arena<Binding>, id: NodeId) -> Option<NodeKey> {
    let mut current = id;
    loop {
        let found = current
            .following_siblings(arena)
            .skip(1)
            .find_map(|sibling| first_node(arena, sibling));
        if found.is_some() {
            return found;
        }
        let up = parent(arena, current)?;
        if binding(arena, up)?.dom.is_some() {
            return None;
        }
        current = up;
    }
}

pub(crate) fn depth(arena: &Arena<Binding>, id: NodeId) -> usize {
    if id.is_removed(arena) {
        return 0;
    }
    id.ancestors(arena).count()
}
