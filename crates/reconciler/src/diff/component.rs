//! Component lifecycle driver.

use core::mem;

use anyhow::{Result, anyhow};
use log::{debug, trace};
use serde_json::Value;
use target_tree::TargetTree;

use super::{Change, Excess, Mounts, Outcome, Placement, Reconciler};
use crate::binding::{self, BindingId, Instance, InstanceId, instance_in};
use crate::component::{ComponentType, Scope};
use crate::context::{ComponentContext, Context, ContextEntry};
use crate::queue::{ComponentLink, Trigger};
use crate::vnode::{NodeKind, PropValue, Props};

/// One component position being diffed.
struct Occurrence {
    id: InstanceId,
    ty: ComponentType,
    context: ComponentContext,
    provider: Option<InstanceId>,
    fresh: bool,
}

impl<T: TargetTree> Reconciler<T> {
    pub(crate) fn diff_component(
        &mut self,
        at: &Placement,
        slot: BindingId,
        change: &Change<'_>,
        excess: &mut Excess,
        mounts: &mut Mounts,
    ) -> Result<Outcome> {
        let ty = change
            .new
            .component_type()
            .ok_or_else(|| anyhow!("{:?} is not a component", change.new))?
            .clone();
        let (context, provider) = self.resolve_context(&ty, &at.context);
        let fresh = binding::instance(&self.bindings, InstanceId(slot.0)).is_none();
        let occurrence = Occurrence {
            id: InstanceId(slot.0),
            ty,
            context,
            provider,
            fresh,
        };

        let claimed = if fresh {
            self.instantiate(at, &occurrence, change.new.props())?;
            false
        } else {
            let instance = instance_in(&mut self.bindings, occurrence.id)?;
            instance.processing_exception = instance.pending_error;
            instance.pending_error
        };

        let outcome = match self.run_component(at, &occurrence, change, excess, mounts) {
            Ok(outcome) => outcome,
            Err(err) => {
                // A fresh instance that never rendered is not mounted.
                if fresh {
                    mounts.retain(|mounted| *mounted != occurrence.id);
                }
                return Err(err);
            }
        };

        if claimed {
            let instance = instance_in(&mut self.bindings, occurrence.id)?;
            instance.pending_error = false;
            instance.processing_exception = false;
        }
        Ok(outcome)
    }

    /// Context handed to an instance of `ty`, plus the provider it reads from.
    fn resolve_context(&self, ty: &ComponentType, tree: &Context) -> (ComponentContext, Option<InstanceId>) {
        let Some(handle) = ty.context_type() else {
            return (ComponentContext::Tree(tree.clone()), None);
        };
        match tree.get(handle.id()) {
            Some(ContextEntry::Provider { instance, value }) => {
                let live = binding::instance(&self.bindings, *instance)
                    .and_then(|provider| provider.props.get("value"))
                    .map(PropValue::to_json);
                (
                    ComponentContext::Value(live.unwrap_or_else(|| value.clone())),
                    Some(*instance),
                )
            }
            Some(ContextEntry::Value(value)) => (ComponentContext::Value(value.clone()), None),
            None => (ComponentContext::Value(handle.default_value().clone()), None),
        }
    }

    fn instantiate(&mut self, at: &Placement, occurrence: &Occurrence, props: &Props) -> Result<()> {
        let id = occurrence.id;
        self.lifecycle(id, "construct");
        let component = occurrence.ty.instantiate(props, &occurrence.context);
        let state = component.initial_state(props);
        let link = ComponentLink::new(id, self.queue.clone());
        let record = binding::binding_mut(&mut self.bindings, id.0)
            .ok_or_else(|| anyhow!("binding {id:?} is no longer mounted"))?;
        record.instance = Some(Instance {
            component,
            ty: occurrence.ty.clone(),
            link,
            props: props.clone(),
            state,
            next_state: None,
            context: occurrence.context.clone(),
            rendered_context: at.context.clone(),
            pending_error: false,
            processing_exception: false,
            render_callbacks: Vec::new(),
            parent_dom: Some(at.parent_dom),
            svg: at.svg,
            provider: occurrence.provider,
            subscribers: Vec::new(),
        });
        if let Some(provider) = occurrence.provider {
            if let Ok(provider) = instance_in(&mut self.bindings, provider) {
                provider.subscribers.push(id);
            }
        }
        self.queue.mark_dirty(id);
        Ok(())
    }

    /// Fold queued state patches and commit callbacks into the instance.
    fn absorb_pending(&mut self, id: InstanceId) -> Result<()> {
        let patches = self.queue.take_patches(id);
        let callbacks = self.queue.take_callbacks(id);
        let Instance {
            state,
            next_state,
            props,
            render_callbacks,
            ..
        } = instance_in(&mut self.bindings, id)?;
        let next = next_state.get_or_insert_with(|| state.clone());
        for patch in patches {
            patch.apply(next, props);
        }
        render_callbacks.extend(callbacks);
        Ok(())
    }

    fn run_component(
        &mut self,
        at: &Placement,
        occurrence: &Occurrence,
        change: &Change<'_>,
        excess: &mut Excess,
        mounts: &mut Mounts,
    ) -> Result<Outcome> {
        let id = occurrence.id;
        let new = change.new;
        let props = new.props();
        let derives_from_props = occurrence.ty.derive_from_props().is_some();

        self.absorb_pending(id)?;
        if let Some(derive) = occurrence.ty.derive_from_props() {
            let Instance { state, next_state, .. } = instance_in(&mut self.bindings, id)?;
            let next = next_state.get_or_insert_with(|| state.clone());
            if let Some(derived) = derive(props, next)? {
                next.extend(derived);
            }
        }

        if occurrence.fresh {
            if !derives_from_props {
                self.lifecycle(id, "will_mount");
                instance_in(&mut self.bindings, id)?.component.will_mount()?;
                self.absorb_pending(id)?;
            }
            mounts.push(id);
        } else {
            if !derives_from_props && change.trigger == Trigger::Parent {
                self.lifecycle(id, "will_receive_props");
                instance_in(&mut self.bindings, id)?
                    .component
                    .will_receive_props(props, &occurrence.context)?;
                self.absorb_pending(id)?;
            }
            if change.trigger != Trigger::Forced {
                self.lifecycle(id, "should_update");
                let Instance {
                    component,
                    state,
                    next_state,
                    ..
                } = instance_in(&mut self.bindings, id)?;
                let next = next_state.get_or_insert_with(|| state.clone());
                if !component.should_update(props, next, &occurrence.context)? {
                    return self.bail_out(id, props);
                }
            }
            self.lifecycle(id, "will_update");
            let Instance {
                component,
                state,
                next_state,
                ..
            } = instance_in(&mut self.bindings, id)?;
            let next = next_state.get_or_insert_with(|| state.clone());
            component.will_update(props, next, &occurrence.context)?;
        }
        self.absorb_pending(id)?;

        let (prev_props, prev_state) = {
            let instance = instance_in(&mut self.bindings, id)?;
            let next = instance
                .next_state
                .take()
                .unwrap_or_else(|| instance.state.clone());
            let prev_props = mem::replace(&mut instance.props, props.clone());
            let prev_state = mem::replace(&mut instance.state, next);
            instance.context = occurrence.context.clone();
            instance.rendered_context = at.context.clone();
            instance.parent_dom = Some(at.parent_dom);
            instance.svg = at.svg;
            (prev_props, prev_state)
        };

        if !occurrence.fresh
            && occurrence.ty.provides().is_some()
            && prev_props.get("value") != props.get("value")
        {
            self.notify_subscribers(id);
        }

        if let Some(hook) = &self.hooks.before_render {
            hook(new);
        }
        self.queue.clear_dirty(id);
        self.lifecycle(id, "render");
        let rendered = {
            let Instance {
                component,
                props: current_props,
                state,
                context,
                link,
                render_callbacks,
                ..
            } = instance_in(&mut self.bindings, id)?;
            let mut scope = Scope::new(current_props, state, context, link, render_callbacks);
            component.render(&mut scope)
        };
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                let deferred = self
                    .hooks
                    .on_render_exception
                    .as_ref()
                    .is_some_and(|hook| hook(&err, new, change.old));
                if deferred {
                    debug!("Render of {new:?} deferred: {err}");
                    return Ok(Outcome::Deferred(self.first_node(BindingId(id.0))));
                }
                return Err(err);
            }
        };
        let children = match rendered {
            None => Vec::new(),
            Some(node) if node.kind() == NodeKind::Fragment && node.key().is_none() => {
                node.props().children().to_vec()
            }
            Some(node) => vec![node],
        };

        let context = self.child_context(at, occurrence)?;

        let snapshot = if occurrence.fresh {
            None
        } else {
            self.lifecycle(id, "snapshot_before_update");
            instance_in(&mut self.bindings, id)?
                .component
                .snapshot_before_update(&prev_props, &prev_state)?
        };

        let child_at = Placement {
            context,
            ..at.clone()
        };
        self.reconcile_children(&child_at, BindingId(id.0), &children, excess, mounts)?;

        self.drain_render_callbacks(id)?;

        if !occurrence.fresh {
            self.lifecycle(id, "did_update");
            let Instance { component, link, .. } = instance_in(&mut self.bindings, id)?;
            component.did_update(&prev_props, &prev_state, snapshot.as_ref(), link)?;
        }
        Ok(Outcome::Completed(self.first_node(BindingId(id.0))))
    }

    /// `should_update` said no: take the pending values, keep the subtree.
    /// Queued commit callbacks wait for the next render that commits.
    fn bail_out(&mut self, id: InstanceId, props: &Props) -> Result<Outcome> {
        trace!("Bailing out of update for {id:?}");
        let instance = instance_in(&mut self.bindings, id)?;
        instance.props = props.clone();
        if let Some(next) = instance.next_state.take() {
            instance.state = next;
        }
        self.queue.clear_dirty(id);
        Ok(Outcome::Completed(self.first_node(BindingId(id.0))))
    }

    fn drain_render_callbacks(&mut self, id: InstanceId) -> Result<()> {
        let instance = instance_in(&mut self.bindings, id)?;
        while let Some(callback) = instance.render_callbacks.pop() {
            callback(instance.component.as_mut())?;
        }
        Ok(())
    }

    /// Context for the children of this occurrence. The parent's map is
    /// never modified.
    fn child_context(&self, at: &Placement, occurrence: &Occurrence) -> Result<Context> {
        let instance = binding::instance(&self.bindings, occurrence.id)
            .ok_or_else(|| anyhow!("component instance {:?} is not mounted", occurrence.id))?;
        let mut context = at.context.clone();
        if let Some(extra) = instance.component.child_context(&instance.props, &instance.state) {
            context = context.extend(
                extra
                    .into_iter()
                    .map(|(key, value)| (key, ContextEntry::Value(value))),
            );
        }
        if let Some(context_id) = occurrence.ty.provides() {
            let value = instance
                .props
                .get("value")
                .map_or(Value::Null, PropValue::to_json);
            context = context.extend([(
                context_id.to_owned(),
                ContextEntry::Provider {
                    instance: occurrence.id,
                    value,
                },
            )]);
        }
        Ok(context)
    }

    fn notify_subscribers(&self, id: InstanceId) {
        let subscribers = binding::instance(&self.bindings, id)
            .map(|provider| provider.subscribers.clone())
            .unwrap_or_default();
        for subscriber in subscribers {
            self.queue.request_rerender(subscriber);
        }
    }

    pub(crate) fn lifecycle(&self, id: InstanceId, hook: &str) {
        if self.trace_lifecycle {
            trace!("{hook} on {id:?}");
        }
    }
}

