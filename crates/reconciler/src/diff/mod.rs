//! The reconcile core.
//!
//! [`Reconciler::diff`] is the single entry point for every position of the
//! tree. Element and component diffing recurse back into it through children
//! reconciliation; boundary propagation runs only on failure and the commit
//! phase once per externally triggered pass.

mod catch;
mod children;
mod commit;
mod component;
mod element;
pub mod props;

use anyhow::{Result, anyhow};
use indextree::Arena;
use log::debug;
use target_tree::{NodeKey, TargetTree};

use crate::binding::{self, Binding, BindingId, InstanceId};
use crate::component::State;
use crate::context::Context;
use crate::error::Unrecovered;
use crate::hooks::Hooks;
use crate::queue::{ComponentLink, RenderQueue, Trigger};
use crate::vnode::{NodeKind, Props, VNode};
use props::{AttributeApplier, PropsDiff};

/// Live nodes available for adoption while hydrating. Adopted entries are
/// replaced by `None`.
pub type Excess = Option<Vec<Option<NodeKey>>>;

/// Instances created during a pass, waiting for `did_mount`.
pub type Mounts = Vec<InstanceId>;

/// Where the nodes of a diffed position go.
#[derive(Clone, Debug)]
pub struct Placement {
    pub parent_dom: NodeKey,
    pub context: Context,
    pub svg: bool,
    /// Existing node new nodes are inserted before; `None` appends.
    pub anchor: Option<NodeKey>,
}

impl Placement {
    pub fn new(parent_dom: NodeKey) -> Self {
        Self {
            parent_dom,
            context: Context::default(),
            svg: false,
            anchor: None,
        }
    }

    #[must_use]
    pub fn with_anchor(self, anchor: Option<NodeKey>) -> Self {
        Self { anchor, ..self }
    }
}

/// Result of diffing one position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The position is in sync; carries its first live node.
    Completed(Option<NodeKey>),
    /// The render-exception interceptor took over a failed render; the
    /// previous subtree stays.
    Deferred(Option<NodeKey>),
    /// The diff failed and a boundary claimed the error.
    Recovered(Option<NodeKey>),
    /// The description was untrusted and nothing was done.
    Rejected,
}

impl Outcome {
    pub const fn node(&self) -> Option<NodeKey> {
        match *self {
            Self::Completed(node) | Self::Deferred(node) | Self::Recovered(node) => node,
            Self::Rejected => None,
        }
    }
}

/// Description pair being diffed at one position.
pub(crate) struct Change<'change> {
    pub new: &'change VNode,
    pub old: Option<&'change VNode>,
    pub trigger: Trigger,
}

/// Owns the target tree, the binding arena and the collaborators a pass needs.
pub struct Reconciler<T: TargetTree> {
    pub(crate) target: T,
    pub(crate) bindings: Arena<Binding>,
    pub(crate) hooks: Hooks,
    pub(crate) queue: RenderQueue,
    pub(crate) attributes: Box<dyn AttributeApplier>,
    pub(crate) trace_lifecycle: bool,
}

impl<T: TargetTree> Reconciler<T> {
    pub fn new(target: T, hooks: Hooks) -> Self {
        Self {
            target,
            bindings: Arena::new(),
            hooks,
            queue: RenderQueue::new(),
            attributes: Box::new(PropsDiff),
            trace_lifecycle: false,
        }
    }

    /// Replace the default attribute application.
    pub fn set_attribute_applier(&mut self, applier: Box<dyn AttributeApplier>) {
        self.attributes = applier;
    }

    /// Log every lifecycle hook invocation at `trace` level.
    pub fn set_trace_lifecycle(&mut self, enabled: bool) {
        self.trace_lifecycle = enabled;
    }

    pub const fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub const fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// A fresh, empty binding to render a tree into.
    pub fn new_root(&mut self) -> BindingId {
        BindingId(self.bindings.new_node(Binding::default()))
    }

    /// First live node of the subtree rendered at `slot`.
    pub fn first_node(&self, slot: BindingId) -> Option<NodeKey> {
        binding::first_node(&self.bindings, slot.0)
    }

    pub fn state_of(&self, id: InstanceId) -> Option<&State> {
        binding::instance(&self.bindings, id).map(|instance| &instance.state)
    }

    pub fn props_of(&self, id: InstanceId) -> Option<&Props> {
        binding::instance(&self.bindings, id).map(|instance| &instance.props)
    }

    pub fn link_of(&self, id: InstanceId) -> Option<ComponentLink> {
        binding::instance(&self.bindings, id).map(|instance| instance.link.clone())
    }

    /// Distance of `id` from its root binding; unmounted instances report 0.
    pub fn depth(&self, id: InstanceId) -> usize {
        binding::depth(&self.bindings, id.0)
    }

    /// Bring the position `slot` in sync with `vnode`.
    ///
    /// Newly created instances are pushed onto `mounts`; run
    /// [`Self::commit_root`] once the pass is over. Failures are routed to the
    /// boundaries above `slot`.
    ///
    /// # Errors
    /// Returns [`Unrecovered`] when no boundary claims a failure.
    pub fn diff(
        &mut self,
        at: &Placement,
        slot: BindingId,
        vnode: VNode,
        excess: &mut Excess,
        mounts: &mut Mounts,
        trigger: Trigger,
    ) -> Result<Outcome> {
        if vnode.is_untrusted() {
            debug!("Refusing untrusted node {vnode:?}");
            return Ok(Outcome::Rejected);
        }
        if let Some(hook) = &self.hooks.before_diff {
            hook(&vnode);
        }
        let old = binding::binding_mut(&mut self.bindings, slot.0)
            .ok_or_else(|| anyhow!("binding {slot:?} is no longer mounted"))?
            .vnode
            .replace(vnode.clone());
        let change = Change {
            new: &vnode,
            old: old.as_ref(),
            trigger,
        };
        let result = if vnode.kind() == NodeKind::Component {
            self.diff_component(at, slot, &change, excess, mounts)
        } else {
            self.diff_element(at, slot, &change, excess, mounts)
        };
        match result {
            Ok(outcome) => {
                if let Some(hook) = &self.hooks.after_diff {
                    hook(&vnode);
                }
                Ok(outcome)
            }
            Err(err) if Unrecovered::is_unrecovered(&err) => Err(err),
            Err(err) => {
                debug!("Diff of {vnode:?} failed: {err}");
                let from = binding::parent(&self.bindings, slot.0).map(BindingId);
                self.route_error(err, from)?;
                Ok(Outcome::Recovered(self.first_node(slot)))
            }
        }
    }
}
