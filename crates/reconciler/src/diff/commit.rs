//! Commit phase, teardown and single-instance re-renders.

use anyhow::{Error, Result};
use indextree::NodeId;
use log::{debug, trace, warn};
use target_tree::{NodeKey, TargetTree};

use super::{Mounts, Outcome, Placement, Reconciler};
use crate::binding::{self, BindingId, InstanceId, instance_in};
use crate::queue::Trigger;

impl<T: TargetTree> Reconciler<T> {
    /// Run `did_mount` for every instance created during the pass, most
    /// recently created first, then the commit hook.
    ///
    /// # Errors
    /// Returns an unclaimed `did_mount` failure.
    pub fn commit_root(&mut self, mounts: &mut Mounts, root: BindingId) -> Result<()> {
        while let Some(id) = mounts.pop() {
            let Ok(instance) = instance_in(&mut self.bindings, id) else {
                continue;
            };
            let link = instance.link.clone();
            self.lifecycle(id, "did_mount");
            let result = instance_in(&mut self.bindings, id)?.component.did_mount(&link);
            if let Err(err) = result {
                let from = binding::parent(&self.bindings, id.0).map(BindingId);
                self.route_error(err, from)?;
            }
        }
        if let Some(hook) = &self.hooks.on_commit {
            let vnode = binding::binding(&self.bindings, root.0).and_then(|record| record.vnode.as_ref());
            hook(vnode);
        }
        Ok(())
    }

    /// Tear down the subtree at `slot`, parents before children.
    ///
    /// Refs are cleared and `will_unmount` runs for every instance. The
    /// topmost live nodes are detached unless `skip_remove` is set; nodes
    /// below them leave with their ancestor. Failures are routed from
    /// `initiator` and teardown carries on.
    ///
    /// # Errors
    /// Returns the first failure no boundary claimed.
    pub fn unmount(&mut self, slot: BindingId, initiator: Option<BindingId>, skip_remove: bool) -> Result<()> {
        if slot.0.is_removed(&self.bindings) {
            return Ok(());
        }
        let mut unrecovered = None;
        self.teardown(slot.0, initiator, skip_remove, &mut unrecovered);
        if !slot.0.is_removed(&self.bindings) {
            slot.0.remove_subtree(&mut self.bindings);
        }
        unrecovered.map_or(Ok(()), Err)
    }

    fn teardown(
        &mut self,
        id: NodeId,
        initiator: Option<BindingId>,
        skip_remove: bool,
        unrecovered: &mut Option<Error>,
    ) {
        let Some(record) = binding::binding(&self.bindings, id) else {
            return;
        };
        let vnode = record.vnode.clone();
        let is_component = record.instance.is_some();
        if let Some(hook) = &self.hooks.on_unmount {
            if let Some(vnode) = &vnode {
                hook(vnode);
            }
        }

        if let Some(node_ref) = vnode.as_ref().and_then(|vnode| vnode.node_ref().cloned()) {
            let result = self.apply_ref(&node_ref, None, initiator);
            keep_first(unrecovered, result);
        }

        let owned: Option<NodeKey> = binding::binding_mut(&mut self.bindings, id)
            .and_then(|record| record.dom.take())
            .filter(|_| !skip_remove && !is_component);
        let skip_children = skip_remove || owned.is_some();

        if is_component {
            let result = self.retire_instance(InstanceId(id), initiator);
            keep_first(unrecovered, result);
        }

        let children: Vec<NodeId> = id.children(&self.bindings).collect();
        for child in children {
            self.teardown(child, initiator, skip_children, unrecovered);
        }

        if let Some(node) = owned {
            trace!("Removing {node}");
            self.target.remove(node);
        }
    }

    fn retire_instance(&mut self, id: InstanceId, initiator: Option<BindingId>) -> Result<()> {
        self.lifecycle(id, "will_unmount");
        let instance = instance_in(&mut self.bindings, id)?;
        let result = instance.component.will_unmount();
        instance.parent_dom = None;
        let provider = instance.provider.take();
        instance.subscribers.clear();
        if let Some(provider) = provider {
            if let Ok(provider) = instance_in(&mut self.bindings, provider) {
                provider.subscribers.retain(|subscriber| *subscriber != id);
            }
        }
        self.queue.forget(id);
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.route_error(err, initiator),
        }
    }

    /// Re-render the instance `id` in place.
    ///
    /// Returns `None` when the instance is gone or no longer attached.
    ///
    /// # Errors
    /// Returns a failure no boundary claimed.
    pub fn rerender(&mut self, id: InstanceId, trigger: Trigger) -> Result<Option<Outcome>> {
        let Some(instance) = binding::instance(&self.bindings, id) else {
            self.queue.clear_dirty(id);
            return Ok(None);
        };
        let Some(parent_dom) = instance.parent_dom else {
            self.queue.clear_dirty(id);
            return Ok(None);
        };
        let Some(vnode) = binding::binding(&self.bindings, id.0).and_then(|record| record.vnode.clone()) else {
            self.queue.clear_dirty(id);
            return Ok(None);
        };
        let slot = BindingId::from(id);
        let anchor = binding::first_node(&self.bindings, id.0).or_else(|| binding::node_sibling(&self.bindings, id.0));
        let at = Placement {
            parent_dom,
            context: instance.rendered_context.clone(),
            svg: instance.svg,
            anchor,
        };
        debug!("Re-rendering {vnode:?} ({trigger:?})");
        let mut mounts = Mounts::new();
        let outcome = self.diff(&at, slot, vnode, &mut None, &mut mounts, trigger)?;
        self.commit_root(&mut mounts, slot)?;
        Ok(Some(outcome))
    }
}

fn keep_first(slot: &mut Option<Error>, result: Result<()>) {
    if let Err(err) = result {
        if slot.is_some() {
            warn!("Further teardown failure: {err}");
        } else {
            *slot = Some(err);
        }
    }
}
