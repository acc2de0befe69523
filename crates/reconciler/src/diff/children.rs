//! Children reconciliation: matching, placement, stale removal and refs.

use anyhow::Result;
use indextree::NodeId;
use log::trace;
use target_tree::{NodeKey, TargetTree};

use super::{Excess, Mounts, Outcome, Placement, Reconciler};
use crate::binding::{self, Binding, BindingId, InstanceId};
use crate::queue::Trigger;
use crate::vnode::{NodeRef, RefTarget, VNode};

impl<T: TargetTree> Reconciler<T> {
    /// Sync the children of `parent` with `children`.
    ///
    /// Old children are matched by type and key, the same index first. Live
    /// nodes are placed in order inside `at.parent_dom`, starting before
    /// `at.anchor`. Unmatched old children are unmounted once every new child
    /// is in place, then refs are handed their values.
    pub(crate) fn reconcile_children(
        &mut self,
        at: &Placement,
        parent: BindingId,
        children: &[VNode],
        excess: &mut Excess,
        mounts: &mut Mounts,
    ) -> Result<()> {
        let mut old: Vec<Option<NodeId>> = parent.0.children(&self.bindings).map(Some).collect();
        let mut order = Vec::with_capacity(children.len());
        let mut refs: Vec<(NodeRef, Option<RefTarget>)> = Vec::new();
        let mut anchor = at.anchor;

        for (index, child) in children.iter().enumerate() {
            let slot = if let Some(slot) = self.take_match(&mut old, index, child) {
                slot
            } else {
                let slot = self.bindings.new_node(Binding::default());
                parent.0.checked_append(slot, &mut self.bindings)?;
                slot
            };
            let old_ref = binding::binding(&self.bindings, slot)
                .and_then(|record| record.vnode.as_ref())
                .and_then(|vnode| vnode.node_ref().cloned());

            let child_at = Placement {
                anchor,
                ..at.clone()
            };
            let outcome = self.diff(&child_at, BindingId(slot), child.clone(), excess, mounts, Trigger::Parent)?;
            if outcome == Outcome::Rejected {
                slot.remove_subtree(&mut self.bindings);
                continue;
            }
            order.push(slot);
            anchor = self.place(at.parent_dom, slot, anchor);

            let new_ref = child.node_ref();
            if new_ref != old_ref.as_ref() {
                if let Some(stale) = &old_ref {
                    self.apply_ref(stale, None, Some(parent))?;
                }
                if let Some(node_ref) = new_ref {
                    refs.push((node_ref.clone(), self.ref_target(slot)));
                }
            }
        }

        for stale in old.into_iter().flatten() {
            self.unmount(BindingId(stale), Some(parent), false)?;
        }
        for slot in order {
            if slot.is_removed(&self.bindings) {
                continue;
            }
            slot.detach(&mut self.bindings);
            parent.0.checked_append(slot, &mut self.bindings)?;
        }
        for (node_ref, value) in refs {
            self.apply_ref(&node_ref, value, Some(parent))?;
        }
        Ok(())
    }

    /// Take the old child `child` can be diffed against.
    fn take_match(&self, old: &mut [Option<NodeId>], index: usize, child: &VNode) -> Option<NodeId> {
        if child.is_untrusted() {
            return None;
        }
        let is_match = |candidate: &Option<NodeId>| {
            candidate
                .and_then(|id| binding::binding(&self.bindings, id))
                .and_then(|record| record.vnode.as_ref())
                .is_some_and(|previous| previous.matches(child))
        };
        let position = old
            .get(index)
            .filter(|candidate| is_match(*candidate))
            .map(|_| index)
            .or_else(|| old.iter().position(is_match))?;
        old.get_mut(position)?.take()
    }

    /// Put the nodes of `slot` before `anchor`; returns the next anchor.
    fn place(&mut self, parent_dom: NodeKey, slot: NodeId, anchor: Option<NodeKey>) -> Option<NodeKey> {
        let nodes = binding::top_nodes(&self.bindings, slot);
        let Some(&last) = nodes.last() else {
            return anchor;
        };
        // Nodes of a nested pass already sit right before the anchor.
        let settled = self.target.parent(last) == Some(parent_dom)
            && self.target.next_sibling(last) == anchor
            && nodes.windows(2).all(|pair| match pair {
                [first, second] => self.target.next_sibling(*first) == Some(*second),
                _ => false,
            });
        if settled {
            return anchor;
        }
        nodes
            .into_iter()
            .fold(anchor, |current, node| self.place_node(parent_dom, node, current))
    }

    fn place_node(&mut self, parent_dom: NodeKey, node: NodeKey, anchor: Option<NodeKey>) -> Option<NodeKey> {
        if anchor == Some(node) {
            return self.target.next_sibling(node);
        }
        if self.target.parent(node) == Some(parent_dom) {
            if self.target.next_sibling(node) == anchor {
                return anchor;
            }
            if anchor.is_some_and(|current| self.follows(current, node)) {
                return self.target.next_sibling(node);
            }
        }
        trace!("Moving {node} before {anchor:?}");
        self.target.insert_before(parent_dom, node, anchor);
        anchor
    }

    fn follows(&self, anchor: NodeKey, node: NodeKey) -> bool {
        let mut cursor = self.target.next_sibling(anchor);
        while let Some(current) = cursor {
            if current == node {
                return true;
            }
            cursor = self.target.next_sibling(current);
        }
        false
    }

    fn ref_target(&self, slot: NodeId) -> Option<RefTarget> {
        let record = binding::binding(&self.bindings, slot)?;
        if record.instance.is_some() {
            return Some(RefTarget::Instance(InstanceId(slot)));
        }
        binding::first_node(&self.bindings, slot).map(RefTarget::Node)
    }

    /// Hand `value` to `node_ref`, routing a failing callback from `from`.
    pub(crate) fn apply_ref(
        &mut self,
        node_ref: &NodeRef,
        value: Option<RefTarget>,
        from: Option<BindingId>,
    ) -> Result<()> {
        match node_ref.apply(value) {
            Ok(()) => Ok(()),
            Err(err) => self.route_error(err, from),
        }
    }
}
