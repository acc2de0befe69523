//! Element, text and fragment diffing.

use anyhow::{Result, anyhow};
use indextree::NodeId;
use target_tree::{NodeKey, TargetTree};

use super::{Change, Excess, Mounts, Outcome, Placement, Reconciler};
use crate::binding::{self, BindingId};
use crate::vnode::{NodeKind, Props};

const SVG_TAG: &str = "svg";
const FOREIGN_OBJECT_TAG: &str = "foreignObject";

impl<T: TargetTree> Reconciler<T> {
    pub(crate) fn diff_element(
        &mut self,
        at: &Placement,
        slot: BindingId,
        change: &Change<'_>,
        excess: &mut Excess,
        mounts: &mut Mounts,
    ) -> Result<Outcome> {
        match change.new.kind() {
            NodeKind::Text => self.diff_text(slot, change, excess),
            NodeKind::Fragment => {
                self.reconcile_children(at, slot, change.new.props().children(), excess, mounts)?;
                Ok(Outcome::Completed(self.first_node(slot)))
            }
            NodeKind::Element => self.diff_tag(at, slot, change, excess, mounts),
            NodeKind::Component => Err(anyhow!("{:?} is a component, not an element", change.new)),
        }
    }

    fn own_node(&self, slot: BindingId) -> Option<NodeKey> {
        binding::binding(&self.bindings, slot.0).and_then(|record| record.dom)
    }

    fn set_own_node(&mut self, slot: BindingId, node: NodeKey) -> Result<()> {
        binding::binding_mut(&mut self.bindings, slot.0)
            .ok_or_else(|| anyhow!("binding {slot:?} is no longer mounted"))?
            .dom = Some(node);
        Ok(())
    }

    fn diff_text(&mut self, slot: BindingId, change: &Change<'_>, excess: &mut Excess) -> Result<Outcome> {
        let text = change.new.text_content().unwrap_or_default();
        let node = match self.own_node(slot) {
            Some(node) => {
                if change.old.and_then(|old| old.text_content()) != Some(text) {
                    self.target.set_text(node, text);
                }
                node
            }
            None => {
                let adopted = excess
                    .as_mut()
                    .and_then(|pool| self.target.locate_child(pool, None));
                match adopted {
                    Some(node) => {
                        self.target.set_text(node, text);
                        node
                    }
                    None => self.target.create_text(text),
                }
            }
        };
        self.set_own_node(slot, node)?;
        Ok(Outcome::Completed(Some(node)))
    }

    fn diff_tag(
        &mut self,
        at: &Placement,
        slot: BindingId,
        change: &Change<'_>,
        excess: &mut Excess,
        mounts: &mut Mounts,
    ) -> Result<Outcome> {
        let new = change.new;
        let tag = new.tag_name().unwrap_or_default();
        let svg = at.svg || tag == SVG_TAG;

        let mut created = false;
        let mut child_pool: Excess = None;
        let node = match self.own_node(slot) {
            Some(node) => node,
            None => {
                let adopted = excess
                    .as_mut()
                    .and_then(|pool| self.target.locate_child(pool, Some(tag)));
                if let Some(node) = adopted {
                    child_pool = Some(self.target.child_nodes(node).into_iter().map(Some).collect());
                    node
                } else {
                    created = true;
                    self.target.create_element(tag, svg)
                }
            }
        };
        self.set_own_node(slot, node)?;

        if change.old.is_some_and(|old| old.ptr_eq(new)) {
            return Ok(Outcome::Completed(Some(node)));
        }

        let empty = Props::default();
        let old_props = change.old.map_or(&empty, |old| old.props());
        let new_props = new.props();

        if child_pool.is_none()
            && (new_props.raw_html().is_some() || old_props.raw_html().is_some())
            && new_props.raw_html() != old_props.raw_html()
        {
            self.target
                .set_raw_content(node, new_props.raw_html().unwrap_or_default());
        }

        match (new_props.multiple(), old_props.multiple()) {
            (Some(flag), previous) if created || previous != Some(flag) => {
                self.target.set_property(node, "multiple", flag);
            }
            (None, Some(true)) => self.target.set_property(node, "multiple", false),
            _ => {}
        }

        if new_props.raw_html().is_some() {
            let stale: Vec<NodeId> = slot.0.children(&self.bindings).collect();
            for child in stale {
                self.unmount(BindingId(child), Some(slot), true)?;
            }
        } else {
            let anchor = match &child_pool {
                Some(pool) => pool.iter().flatten().next().copied(),
                None => self.target.first_child(node),
            };
            let child_at = Placement {
                parent_dom: node,
                context: at.context.clone(),
                svg: svg && tag != FOREIGN_OBJECT_TAG,
                anchor,
            };
            self.reconcile_children(&child_at, slot, new_props.children(), &mut child_pool, mounts)?;
            for leftover in child_pool.into_iter().flatten().flatten() {
                self.target.remove(leftover);
            }
        }

        self.attributes
            .apply(&mut self.target, node, new_props, old_props, svg);
        Ok(Outcome::Completed(Some(node)))
    }
}
