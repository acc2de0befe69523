//! Tree context and the provider/subscriber context API.

use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value;

use crate::binding::InstanceId;
use crate::component::{ComponentDef, ComponentType};
use crate::vnode::{PropValue, Props, VNode};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, PartialEq)]
pub enum ContextEntry {
    /// Plain value, as produced by [`crate::Component::child_context`].
    Value(Value),
    /// A provider instance and the value it rendered with.
    Provider { instance: InstanceId, value: Value },
}

impl ContextEntry {
    pub const fn value(&self) -> &Value {
        match self {
            Self::Value(value) | Self::Provider { value, .. } => value,
        }
    }
}

/// Context handed down the tree. Extending it never touches the parent's map.
#[derive(Clone, Debug, Default)]
pub struct Context(Rc<HashMap<String, ContextEntry>>);

impl Context {
    pub fn get(&self, key: &str) -> Option<&ContextEntry> {
        self.0.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).map(ContextEntry::value)
    }

    /// Context with `entries` layered over this one. When every entry is
    /// already present with an equal value, the same map is shared.
    #[must_use]
    pub fn extend(&self, entries: impl IntoIterator<Item = (String, ContextEntry)>) -> Self {
        let changed: Vec<(String, ContextEntry)> = entries
            .into_iter()
            .filter(|(key, entry)| self.0.get(key) != Some(entry))
            .collect();
        if changed.is_empty() {
            return self.clone();
        }
        let mut map = HashMap::clone(&self.0);
        map.extend(changed);
        Self(Rc::new(map))
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// What a component instance receives as its context.
#[derive(Clone, Debug)]
pub enum ComponentContext {
    /// The whole tree context, for types without a context type.
    Tree(Context),
    /// The resolved value of the type's context handle.
    Value(Value),
}

impl ComponentContext {
    /// Resolved value of a typed context.
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Tree(_) => None,
        }
    }

    /// Entry `key` of the tree context.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Tree(context) => context.value(key),
            Self::Value(_) => None,
        }
    }
}

impl Default for ComponentContext {
    fn default() -> Self {
        Self::Tree(Context::default())
    }
}

struct ContextInner {
    id: String,
    default: Value,
    provider: ComponentType,
}

/// A typed context created by [`create_context`].
#[derive(Clone)]
pub struct ContextHandle(Rc<ContextInner>);

impl ContextHandle {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Value seen by consumers with no provider above them.
    pub fn default_value(&self) -> &Value {
        &self.0.default
    }

    /// Provider node making `value` visible to every consumer below it.
    pub fn provider(&self, value: impl Into<PropValue>, children: impl IntoIterator<Item = VNode>) -> VNode {
        VNode::component(
            &self.0.provider,
            Props::new().with("value", value).with_children(children),
        )
    }

    pub fn provider_type(&self) -> &ComponentType {
        &self.0.provider
    }
}

fn render_provider(props: &Props) -> Result<Option<VNode>> {
    Ok(Some(VNode::fragment(props.children().iter().cloned())))
}

/// Create a new context whose consumers see `default` until a provider is
/// mounted above them.
pub fn create_context(default: Value) -> ContextHandle {
    let id = format!("__ctx{}", NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
    let provider = ComponentDef::function("Provider", |props, _context| render_provider(props))
        .provides(&id)
        .build();
    ContextHandle(Rc::new(ContextInner {
        id,
        default,
        provider,
    }))
}
