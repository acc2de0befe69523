//! Shared helpers for the reconciler integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use reconciler::{Hooks, Renderer, RendererConfig, State};
use serde_json::Value;
use target_tree::{Document, NodeKey, TargetTree as _};

/// Ordered record of lifecycle events, shared between a test and its components.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn init_logger() {
    let _ignored = env_logger::builder().is_test(true).try_init();
}

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn note(journal: &Journal, entry: impl Into<String>) {
    journal.borrow_mut().push(entry.into());
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

/// State map from a JSON object literal.
pub fn state(value: Value) -> State {
    value.as_object().cloned().unwrap_or_default()
}

pub fn renderer() -> Renderer<Document> {
    renderer_with(Hooks::default())
}

pub fn renderer_with(hooks: Hooks) -> Renderer<Document> {
    Renderer::with_config(Document::new(), RendererConfig::default(), hooks)
}

pub fn first_child(doc: &Document, node: NodeKey) -> Result<NodeKey> {
    doc.first_child(node)
        .ok_or_else(|| anyhow!("{node} has no children"))
}
