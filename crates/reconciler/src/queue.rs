//! Re-render requests and the per-instance update handle.
//!
//! The queue only records what was asked for. Deciding when to process it is
//! the driver's job ([`crate::Renderer::flush`]).

use core::cell::RefCell;
use core::mem;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::Result;
use log::trace;

use crate::binding::InstanceId;
use crate::component::{Component, RenderCallback, State};
use crate::vnode::Props;

/// Why a component is being diffed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Its parent re-rendered.
    Parent,
    /// It scheduled itself (`set_state`, a context change, a boundary claim).
    Scheduled,
    /// `force_update`: `should_update` is not consulted.
    Forced,
}

type Updater = Box<dyn FnOnce(&State, &Props) -> State>;

/// A pending state change, applied to the pending state at the next diff.
pub enum StatePatch {
    Merge(State),
    With(Updater),
}

impl StatePatch {
    pub(crate) fn apply(self, state: &mut State, props: &Props) {
        let patch = match self {
            Self::Merge(patch) => patch,
            Self::With(updater) => updater(state, props),
        };
        state.extend(patch);
    }
}

#[derive(Default)]
struct QueueState {
    pending: Vec<InstanceId>,
    dirty: HashSet<InstanceId>,
    forced: HashSet<InstanceId>,
    patches: HashMap<InstanceId, Vec<StatePatch>>,
    callbacks: HashMap<InstanceId, Vec<RenderCallback>>,
}

/// Shared re-render queue. Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct RenderQueue(Rc<RefCell<QueueState>>);

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `id`. Requests for an instance that is already dirty are
    /// folded into the pending one.
    pub fn request_rerender(&self, id: InstanceId) {
        let mut queue = self.0.borrow_mut();
        if queue.dirty.insert(id) {
            trace!("Scheduling re-render of {id:?}");
            queue.pending.push(id);
        }
    }

    /// Schedule `id` with `should_update` bypassed.
    pub fn request_forced(&self, id: InstanceId) {
        self.0.borrow_mut().forced.insert(id);
        self.request_rerender(id);
    }

    pub(crate) fn mark_dirty(&self, id: InstanceId) {
        self.0.borrow_mut().dirty.insert(id);
    }

    pub(crate) fn clear_dirty(&self, id: InstanceId) {
        self.0.borrow_mut().dirty.remove(&id);
    }

    pub fn is_dirty(&self, id: InstanceId) -> bool {
        self.0.borrow().dirty.contains(&id)
    }

    /// Whether any request is waiting to be processed.
    pub fn has_pending(&self) -> bool {
        !self.0.borrow().pending.is_empty()
    }

    pub(crate) fn take_pending(&self) -> Vec<InstanceId> {
        mem::take(&mut self.0.borrow_mut().pending)
    }

    /// Put back requests a failed flush did not get to.
    pub(crate) fn restore_pending(&self, ids: impl IntoIterator<Item = InstanceId>) {
        let mut queue = self.0.borrow_mut();
        for id in ids {
            if queue.dirty.contains(&id) && !queue.pending.contains(&id) {
                queue.pending.push(id);
            }
        }
    }

    pub(crate) fn take_forced(&self, id: InstanceId) -> bool {
        self.0.borrow_mut().forced.remove(&id)
    }

    pub(crate) fn push_patch(&self, id: InstanceId, patch: StatePatch) {
        self.0.borrow_mut().patches.entry(id).or_default().push(patch);
    }

    pub(crate) fn take_patches(&self, id: InstanceId) -> Vec<StatePatch> {
        self.0.borrow_mut().patches.remove(&id).unwrap_or_default()
    }

    pub(crate) fn push_callback(&self, id: InstanceId, callback: RenderCallback) {
        self.0.borrow_mut().callbacks.entry(id).or_default().push(callback);
    }

    pub(crate) fn take_callbacks(&self, id: InstanceId) -> Vec<RenderCallback> {
        self.0.borrow_mut().callbacks.remove(&id).unwrap_or_default()
    }

    /// Drop everything recorded for an unmounted instance.
    pub(crate) fn forget(&self, id: InstanceId) {
        let mut queue = self.0.borrow_mut();
        queue.dirty.remove(&id);
        queue.forced.remove(&id);
        queue.patches.remove(&id);
        queue.callbacks.remove(&id);
    }
}

/// Update handle of one component instance.
#[derive(Clone)]
pub struct ComponentLink {
    id: InstanceId,
    queue: RenderQueue,
}

impl ComponentLink {
    pub(crate) const fn new(id: InstanceId, queue: RenderQueue) -> Self {
        Self { id, queue }
    }

    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Shallow-merge `patch` into the state and schedule a re-render.
    pub fn set_state(&self, patch: State) {
        self.queue.push_patch(self.id, StatePatch::Merge(patch));
        self.queue.request_rerender(self.id);
    }

    /// Merge the patch computed from the pending state and current props.
    pub fn update_state(&self, updater: impl FnOnce(&State, &Props) -> State + 'static) {
        self.queue.push_patch(self.id, StatePatch::With(Box::new(updater)));
        self.queue.request_rerender(self.id);
    }

    /// [`Self::set_state`], running `callback` once the update committed.
    pub fn set_state_then(
        &self,
        patch: State,
        callback: impl FnOnce(&mut dyn Component) -> Result<()> + 'static,
    ) {
        self.queue.push_callback(self.id, Box::new(callback));
        self.set_state(patch);
    }

    /// Re-render without consulting `should_update`.
    pub fn force_update(&self) {
        self.queue.request_forced(self.id);
    }
}
