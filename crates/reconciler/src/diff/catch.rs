//! Error boundary propagation.

use anyhow::{Error, Result};
use log::{debug, warn};
use target_tree::TargetTree;

use super::Reconciler;
use crate::binding::{self, BindingId, InstanceId, instance_in};
use crate::component::Caught;
use crate::error::Unrecovered;
use crate::queue::StatePatch;

impl<T: TargetTree> Reconciler<T> {
    /// Offer `error` to the instances from `from` upwards.
    ///
    /// An instance already recovering from an earlier error is skipped. The
    /// first one that claims the error is marked and scheduled; a handler
    /// that fails replaces the error for the rest of the walk.
    ///
    /// # Errors
    /// Returns the final error wrapped in [`Unrecovered`] when nobody claims it.
    pub(crate) fn route_error(&mut self, error: Error, from: Option<BindingId>) -> Result<()> {
        if Unrecovered::is_unrecovered(&error) {
            return Err(error);
        }
        if let Some(hook) = &self.hooks.on_catch_error {
            let origin = from
                .and_then(|id| binding::binding(&self.bindings, id.0))
                .and_then(|record| record.vnode.as_ref());
            hook(&error, origin);
        }

        let mut error = error;
        let path: Vec<_> = from
            .filter(|id| !id.0.is_removed(&self.bindings))
            .map(|id| id.0.ancestors(&self.bindings).collect())
            .unwrap_or_default();
        for node in path {
            let id = InstanceId(node);
            let Ok(instance) = instance_in(&mut self.bindings, id) else {
                continue;
            };
            if instance.processing_exception {
                continue;
            }
            let verdict = match instance.ty.derive_from_error() {
                Some(derive) => derive(&error).map(|patch| {
                    if let Some(patch) = patch {
                        self.queue.push_patch(id, StatePatch::Merge(patch));
                    }
                    Caught::Handled
                }),
                None => {
                    self.lifecycle(id, "did_catch");
                    let Ok(instance) = instance_in(&mut self.bindings, id) else {
                        continue;
                    };
                    instance.component.did_catch(&error, &instance.link)
                }
            };
            match verdict {
                Ok(Caught::Handled) => {
                    debug!("Boundary {id:?} claimed: {error}");
                    instance_in(&mut self.bindings, id)?.pending_error = true;
                    self.queue.request_rerender(id);
                    return Ok(());
                }
                Ok(Caught::Declined) => {}
                Err(next) => {
                    debug!("Boundary {id:?} failed while handling: {next}");
                    error = next;
                }
            }
        }
        warn!("No boundary claimed: {error}");
        Err(Unrecovered(error).into())
    }
}
