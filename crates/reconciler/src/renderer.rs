//! Pass driver: renders trees into containers and drains the re-render queue.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use log::{debug, trace};
use target_tree::{NodeKey, TargetTree};
use tracing::info_span;

use crate::binding::{BindingId, InstanceId};
use crate::component::State;
use crate::config::RendererConfig;
use crate::diff::props::AttributeApplier;
use crate::diff::{Excess, Mounts, Placement, Reconciler};
use crate::hooks::Hooks;
use crate::queue::{ComponentLink, RenderQueue, Trigger};
use crate::vnode::{Props, VNode};

/// Renders [`VNode`] trees into containers of a target tree.
///
/// Each container keeps its own binding tree between passes. Component state
/// changes only take effect on [`Renderer::flush`].
pub struct Renderer<T: TargetTree> {
    core: Reconciler<T>,
    roots: HashMap<NodeKey, BindingId>,
    config: RendererConfig,
}

impl<T: TargetTree> Renderer<T> {
    /// Renderer configured from the environment, without hooks.
    pub fn new(target: T) -> Self {
        Self::with_config(target, RendererConfig::from_env(), Hooks::default())
    }

    pub fn with_config(target: T, config: RendererConfig, hooks: Hooks) -> Self {
        let mut core = Reconciler::new(target, hooks);
        core.set_trace_lifecycle(config.trace_lifecycle);
        Self {
            core,
            roots: HashMap::new(),
            config,
        }
    }

    /// Replace the default attribute application.
    #[must_use]
    pub fn with_attributes(mut self, applier: Box<dyn AttributeApplier>) -> Self {
        self.core.set_attribute_applier(applier);
        self
    }

    /// Render `vnode` into `container`, diffing against the previous pass.
    ///
    /// # Errors
    /// Returns an error no boundary claimed; the pass stops there.
    pub fn render(&mut self, vnode: VNode, container: NodeKey) -> Result<()> {
        let _span = info_span!("reconciler.render").entered();
        self.pass(vnode, container, false)
    }

    /// First render over existing markup in `container`: matching live nodes
    /// are adopted instead of created, and the rest is removed.
    ///
    /// # Errors
    /// Returns an error no boundary claimed; the pass stops there.
    pub fn hydrate(&mut self, vnode: VNode, container: NodeKey) -> Result<()> {
        let _span = info_span!("reconciler.hydrate").entered();
        self.pass(vnode, container, true)
    }

    fn pass(&mut self, vnode: VNode, container: NodeKey, hydrate: bool) -> Result<()> {
        if vnode.is_untrusted() {
            debug!("Refusing untrusted tree for {container}");
            return Ok(());
        }
        let root = *self
            .roots
            .entry(container)
            .or_insert_with(|| self.core.new_root());
        let mut excess: Excess = hydrate.then(|| {
            self.core
                .target()
                .child_nodes(container)
                .into_iter()
                .map(Some)
                .collect()
        });
        let anchor = self.core.first_node(root).or_else(|| {
            excess
                .as_ref()
                .and_then(|pool| pool.iter().flatten().next().copied())
        });
        let at = Placement::new(container).with_anchor(anchor);
        let mut mounts = Mounts::new();
        let outcome = self.core.diff(
            &at,
            root,
            VNode::fragment([vnode]),
            &mut excess,
            &mut mounts,
            Trigger::Parent,
        )?;
        for leftover in excess.into_iter().flatten().flatten() {
            trace!("Removing unclaimed {leftover}");
            self.core.target_mut().remove(leftover);
        }
        self.core.commit_root(&mut mounts, root)?;
        debug!("Rendered into {container}: {outcome:?}");
        Ok(())
    }

    /// Process scheduled re-renders, shallowest first, until the queue is
    /// empty. Returns the number of instances re-rendered.
    ///
    /// # Errors
    /// Returns an error no boundary claimed, or an error when components keep
    /// scheduling themselves past the configured number of rounds.
    pub fn flush(&mut self) -> Result<usize> {
        let _span = info_span!("reconciler.flush").entered();
        let mut rerendered = 0;
        for round in 0..self.config.max_flush_rounds {
            let mut pending = self.core.queue().take_pending();
            if pending.is_empty() {
                return Ok(rerendered);
            }
            pending.sort_by_key(|id| self.core.depth(*id));
            trace!("Flush round {round}: {} pending", pending.len());
            let mut remaining = pending.into_iter();
            while let Some(id) = remaining.next() {
                if !self.core.queue().is_dirty(id) {
                    continue;
                }
                let trigger = if self.core.queue().take_forced(id) {
                    Trigger::Forced
                } else {
                    Trigger::Scheduled
                };
                match self.core.rerender(id, trigger) {
                    Ok(Some(_)) => rerendered += 1,
                    Ok(None) => {}
                    Err(err) => {
                        self.core.queue().restore_pending(remaining);
                        return Err(err);
                    }
                }
            }
        }
        if self.core.queue().has_pending() {
            return Err(anyhow!(
                "Re-render queue still busy after {} rounds",
                self.config.max_flush_rounds
            ));
        }
        Ok(rerendered)
    }

    /// Tear down everything rendered into `container`.
    ///
    /// # Errors
    /// Returns the first teardown failure no boundary claimed.
    pub fn unmount(&mut self, container: NodeKey) -> Result<()> {
        let Some(root) = self.roots.remove(&container) else {
            return Ok(());
        };
        let _span = info_span!("reconciler.unmount").entered();
        self.core.unmount(root, None, false)
    }

    pub const fn target(&self) -> &T {
        self.core.target()
    }

    pub fn target_mut(&mut self) -> &mut T {
        self.core.target_mut()
    }

    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub const fn queue(&self) -> &RenderQueue {
        self.core.queue()
    }

    pub fn state_of(&self, id: InstanceId) -> Option<&State> {
        self.core.state_of(id)
    }

    pub fn props_of(&self, id: InstanceId) -> Option<&Props> {
        self.core.props_of(id)
    }

    pub fn link_of(&self, id: InstanceId) -> Option<ComponentLink> {
        self.core.link_of(id)
    }

    pub fn is_dirty(&self, id: InstanceId) -> bool {
        self.core.queue().is_dirty(id)
    }

    pub const fn reconciler(&self) -> &Reconciler<T> {
        &self.core
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<T> {
        &mut self.core
    }
}
