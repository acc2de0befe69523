//! Virtual-node reconciler.
//!
//! A pass compares a freshly authored [`VNode`] tree against the tree rendered
//! last time, applies the minimal set of mutations to a [`TargetTree`], and
//! drives the component lifecycle along the way (mount, update gating, commit,
//! error boundaries, teardown).
//!
//! [`Renderer`] is the usual entry point. It owns the target tree, one binding
//! tree per container, and the [`RenderQueue`] that components schedule
//! re-renders on. The lower-level [`Reconciler`] exposes the individual
//! operations a custom scheduler needs.
//!
//! [`TargetTree`]: target_tree::TargetTree
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(
    clippy::module_name_repetitions,
    reason = "Type names mirror the lifecycle vocabulary"
)]

mod binding;
pub mod component;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod renderer;
pub mod vnode;

pub use binding::{BindingId, InstanceId};
pub use component::{Caught, Component, ComponentDef, ComponentType, RenderCallback, Scope, State};
pub use config::RendererConfig;
pub use context::{ComponentContext, Context, ContextEntry, ContextHandle, create_context};
pub use diff::props::{AttributeApplier, PropsDiff};
pub use diff::{Outcome, Placement, Reconciler};
pub use error::Unrecovered;
pub use hooks::Hooks;
pub use queue::{ComponentLink, RenderQueue, StatePatch, Trigger};
pub use renderer::Renderer;
pub use vnode::{Handler, NodeKind, NodeRef, PropValue, Props, RefTarget, VNode};
