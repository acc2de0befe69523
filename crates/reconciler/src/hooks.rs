//! Optional interception points around a reconcile pass.

use crate::vnode::VNode;

type NodeHook = Box<dyn Fn(&VNode)>;
type RenderExceptionHook = Box<dyn Fn(&anyhow::Error, &VNode, Option<&VNode>) -> bool>;
type CommitHook = Box<dyn Fn(Option<&VNode>)>;
type CatchHook = Box<dyn Fn(&anyhow::Error, Option<&VNode>)>;

/// Interception hooks, each optional. Installed once when the reconciler is
/// built.
#[derive(Default)]
pub struct Hooks {
    pub(crate) before_diff: Option<NodeHook>,
    pub(crate) before_render: Option<NodeHook>,
    pub(crate) after_diff: Option<NodeHook>,
    pub(crate) on_unmount: Option<NodeHook>,
    pub(crate) on_render_exception: Option<RenderExceptionHook>,
    pub(crate) on_commit: Option<CommitHook>,
    pub(crate) on_catch_error: Option<CatchHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs on entry to every diff of a trusted node.
    #[must_use]
    pub fn before_diff(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.before_diff = Some(Box::new(hook));
        self
    }

    /// Runs right before a component renders.
    #[must_use]
    pub fn before_render(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.before_render = Some(Box::new(hook));
        self
    }

    /// Runs after a diff completes without failing.
    #[must_use]
    pub fn after_diff(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.after_diff = Some(Box::new(hook));
        self
    }

    /// Runs for every node torn down, parents first.
    #[must_use]
    pub fn on_unmount(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.on_unmount = Some(Box::new(hook));
        self
    }

    /// Offered render failures first. Returning `true` defers the component:
    /// its previous subtree stays and no boundary is consulted.
    #[must_use]
    pub fn on_render_exception(
        mut self,
        hook: impl Fn(&anyhow::Error, &VNode, Option<&VNode>) -> bool + 'static,
    ) -> Self {
        self.on_render_exception = Some(Box::new(hook));
        self
    }

    /// Runs once per pass after the mount queue drained.
    #[must_use]
    pub fn on_commit(mut self, hook: impl Fn(Option<&VNode>) + 'static) -> Self {
        self.on_commit = Some(Box::new(hook));
        self
    }

    /// Sees every error before the boundary walk starts.
    #[must_use]
    pub fn on_catch_error(mut self, hook: impl Fn(&anyhow::Error, Option<&VNode>) + 'static) -> Self {
        self.on_catch_error = Some(Box::new(hook));
        self
    }
}
