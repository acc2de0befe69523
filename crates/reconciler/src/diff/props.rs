//! Attribute application.
//!
//! Element diffing hands the final prop pair of every element to an
//! [`AttributeApplier`]. [`PropsDiff`] is the default; embedders replace it
//! through [`super::Reconciler::set_attribute_applier`].

use std::rc::Rc;

use target_tree::{NodeKey, TargetTree};

use crate::vnode::{PropValue, Props};

/// Synchronizes the attributes of one node with its props.
pub trait AttributeApplier {
    /// Bring `node` from `old` to `new`. `svg` is set inside SVG subtrees.
    fn apply(&self, target: &mut dyn TargetTree, node: NodeKey, new: &Props, old: &Props, svg: bool);
}

/// Default applier: removes vanished props, then writes changed ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct PropsDiff;

/// Handled by element diffing as a property.
const MULTIPLE: &str = "multiple";

/// `onClick` listens to `click`.
fn event_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix("on")?;
    (!rest.is_empty()).then(|| rest.to_ascii_lowercase())
}

fn attribute_name(name: &str, svg: bool) -> String {
    if name == "className" {
        return "class".to_owned();
    }
    if svg {
        if let Some(rest) = name.strip_prefix("xlink") {
            if !rest.is_empty() {
                return format!("xlink:{}", rest.to_ascii_lowercase());
            }
        }
    }
    name.to_owned()
}

fn clear(target: &mut dyn TargetTree, node: NodeKey, name: &str, value: &PropValue, svg: bool) {
    if matches!(value, PropValue::Handler(_)) {
        if let Some(event) = event_name(name) {
            target.set_listener(node, &event, None);
        }
        return;
    }
    target.remove_attribute(node, &attribute_name(name, svg));
}

impl AttributeApplier for PropsDiff {
    fn apply(&self, target: &mut dyn TargetTree, node: NodeKey, new: &Props, old: &Props, svg: bool) {
        for (name, value) in old.attrs() {
            if name == MULTIPLE || new.get(name).is_some() {
                continue;
            }
            clear(target, node, name, value, svg);
        }

        for (name, value) in new.attrs() {
            if name == MULTIPLE {
                continue;
            }
            let previous = old.get(name);
            if previous == Some(value) {
                continue;
            }
            if let Some(previous) = previous {
                if matches!(previous, PropValue::Handler(_)) != matches!(value, PropValue::Handler(_)) {
                    clear(target, node, name, previous, svg);
                }
            }
            match value {
                PropValue::Handler(handler) => {
                    if let Some(event) = event_name(name) {
                        target.set_listener(node, &event, Some(Rc::clone(&handler.0)));
                    }
                }
                PropValue::Bool(false) => target.remove_attribute(node, &attribute_name(name, svg)),
                PropValue::Bool(true) => target.set_attribute(node, &attribute_name(name, svg), ""),
                other => target.set_attribute(node, &attribute_name(name, svg), &other.to_attr_string()),
            }
        }
    }
}
