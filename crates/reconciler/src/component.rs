//! Component model: the [`Component`] trait, component types and the render
//! [`Scope`].
//!
//! Class-like and function components are resolved into the same instance
//! shape when the type is built: a function component is wrapped in an
//! adapter whose `render` calls the function again.

use core::fmt;
use std::rc::Rc;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::context::{ComponentContext, ContextHandle};
use crate::queue::ComponentLink;
use crate::vnode::{Props, VNode};

/// Component state: a shallow map merged by `set_state`.
pub type State = Map<String, Value>;

/// Callback run once the component's subtree has committed.
pub type RenderCallback = Box<dyn FnOnce(&mut dyn Component) -> Result<()>>;

type Constructor = Rc<dyn Fn(&Props, &ComponentContext) -> Box<dyn Component>>;
type RenderFn = Rc<dyn Fn(&Props, &ComponentContext) -> Result<Option<VNode>>>;
type DeriveFromProps = Rc<dyn Fn(&Props, &State) -> Result<Option<State>>>;
type DeriveFromError = Rc<dyn Fn(&anyhow::Error) -> Result<Option<State>>>;

/// Answer of [`Component::did_catch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caught {
    /// The component is a boundary for this error; it will re-render.
    Handled,
    /// Keep walking up.
    Declined,
}

/// View handed to [`Component::render`].
pub struct Scope<'scope> {
    props: &'scope Props,
    state: &'scope State,
    context: &'scope ComponentContext,
    link: &'scope ComponentLink,
    callbacks: &'scope mut Vec<RenderCallback>,
}

impl<'scope> Scope<'scope> {
    pub(crate) fn new(
        props: &'scope Props,
        state: &'scope State,
        context: &'scope ComponentContext,
        link: &'scope ComponentLink,
        callbacks: &'scope mut Vec<RenderCallback>,
    ) -> Self {
        Self {
            props,
            state,
            context,
            link,
            callbacks,
        }
    }

    pub const fn props(&self) -> &Props {
        self.props
    }

    pub const fn state(&self) -> &State {
        self.state
    }

    pub const fn context(&self) -> &ComponentContext {
        self.context
    }

    /// Handle for scheduling updates of this instance.
    pub const fn link(&self) -> &ComponentLink {
        self.link
    }

    /// Run `callback` after this render commits. Callbacks run last-in first-out.
    pub fn after_commit(&mut self, callback: impl FnOnce(&mut dyn Component) -> Result<()> + 'static) {
        self.callbacks.push(Box::new(callback));
    }
}

/// Lifecycle protocol of a component instance.
///
/// Every hook except `render` has a default that does nothing. Hook failures
/// are routed to the nearest error boundary.
pub trait Component {
    /// Produce the component's subtree. `None` renders nothing.
    ///
    /// # Errors
    /// A render failure is offered to the render-exception interceptor, then
    /// to the enclosing boundaries.
    fn render(&mut self, scope: &mut Scope<'_>) -> Result<Option<VNode>>;

    /// State the instance starts with.
    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    /// Before the first render, when the type derives no state from props.
    ///
    /// # Errors
    /// Routed to the enclosing boundaries.
    fn will_mount(&mut self) -> Result<()> {
        Ok(())
    }

    /// After the first commit of the whole pass.
    ///
    /// # Errors
    /// Routed to the boundaries above this instance.
    fn did_mount(&mut self, _link: &ComponentLink) -> Result<()> {
        Ok(())
    }

    /// Parent-driven update, when the type derives no state from props.
    ///
    /// # Errors
    /// Routed to the enclosing boundaries.
    fn will_receive_props(&mut self, _next_props: &Props, _context: &ComponentContext) -> Result<()> {
        Ok(())
    }

    /// Gate for non-forced updates; `false` keeps the current subtree.
    ///
    /// # Errors
    /// Routed to the enclosing boundaries.
    fn should_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _context: &ComponentContext,
    ) -> Result<bool> {
        Ok(true)
    }

    /// # Errors
    /// Routed to the enclosing boundaries.
    fn will_update(&mut self, _next_props: &Props, _next_state: &State, _context: &ComponentContext) -> Result<()> {
        Ok(())
    }

    /// Captured after render, before children reconcile.
    ///
    /// # Errors
    /// Routed to the enclosing boundaries.
    fn snapshot_before_update(&mut self, _prev_props: &Props, _prev_state: &State) -> Result<Option<Value>> {
        Ok(None)
    }

    /// # Errors
    /// Routed to the enclosing boundaries.
    fn did_update(
        &mut self,
        _prev_props: &Props,
        _prev_state: &State,
        _snapshot: Option<&Value>,
        _link: &ComponentLink,
    ) -> Result<()> {
        Ok(())
    }

    /// # Errors
    /// Routed to the boundary above the node that started the teardown;
    /// teardown continues either way.
    fn will_unmount(&mut self) -> Result<()> {
        Ok(())
    }

    /// Offered every error raised below this instance.
    ///
    /// # Errors
    /// The returned error replaces the one being walked and travels further up.
    fn did_catch(&mut self, _error: &anyhow::Error, _link: &ComponentLink) -> Result<Caught> {
        Ok(Caught::Declined)
    }

    /// Extra context entries for descendants.
    fn child_context(&self, _props: &Props, _state: &State) -> Option<Map<String, Value>> {
        None
    }
}

/// Instance adapter for function components.
struct FunctionComponent {
    render: RenderFn,
}

impl Component for FunctionComponent {
    fn render(&mut self, scope: &mut Scope<'_>) -> Result<Option<VNode>> {
        (self.render)(scope.props(), scope.context())
    }
}

#[derive(Clone)]
enum Shape {
    Class(Constructor),
    Function(RenderFn),
}

/// Definition of a component type, built with chained setters.
#[derive(Clone)]
pub struct ComponentDef {
    name: String,
    shape: Shape,
    derive_from_props: Option<DeriveFromProps>,
    derive_from_error: Option<DeriveFromError>,
    context_type: Option<ContextHandle>,
    provides: Option<String>,
}

impl ComponentDef {
    /// A stateful component built by `constructor` once per occurrence.
    pub fn class(
        name: &str,
        constructor: impl Fn(&Props, &ComponentContext) -> Box<dyn Component> + 'static,
    ) -> Self {
        Self::with_shape(name, Shape::Class(Rc::new(constructor)))
    }

    /// A component whose render is a plain function of props and context.
    pub fn function(
        name: &str,
        render: impl Fn(&Props, &ComponentContext) -> Result<Option<VNode>> + 'static,
    ) -> Self {
        Self::with_shape(name, Shape::Function(Rc::new(render)))
    }

    fn with_shape(name: &str, shape: Shape) -> Self {
        Self {
            name: name.to_owned(),
            shape,
            derive_from_props: None,
            derive_from_error: None,
            context_type: None,
            provides: None,
        }
    }

    /// Static state derivation run before every render. Its result is merged
    /// into the pending state; `will_mount` and `will_receive_props` are
    /// skipped for such types.
    #[must_use]
    pub fn derive_state_from_props(
        mut self,
        derive: impl Fn(&Props, &State) -> Result<Option<State>> + 'static,
    ) -> Self {
        self.derive_from_props = Some(Rc::new(derive));
        self
    }

    /// Makes the type an error boundary: the returned patch is merged into
    /// state and the instance re-renders.
    #[must_use]
    pub fn derive_state_from_error(
        mut self,
        derive: impl Fn(&anyhow::Error) -> Result<Option<State>> + 'static,
    ) -> Self {
        self.derive_from_error = Some(Rc::new(derive));
        self
    }

    /// Receive the nearest provider value of `handle` as context.
    #[must_use]
    pub fn context_type(mut self, handle: &ContextHandle) -> Self {
        self.context_type = Some(handle.clone());
        self
    }

    #[must_use]
    pub(crate) fn provides(mut self, context_id: &str) -> Self {
        self.provides = Some(context_id.to_owned());
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType(Rc::new(self))
    }
}

/// Shared handle to a component definition. Two types are the same type only
/// if they are the same handle.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentDef>);

impl ComponentType {
    pub fn class(
        name: &str,
        constructor: impl Fn(&Props, &ComponentContext) -> Box<dyn Component> + 'static,
    ) -> Self {
        ComponentDef::class(name, constructor).build()
    }

    pub fn function(
        name: &str,
        render: impl Fn(&Props, &ComponentContext) -> Result<Option<VNode>> + 'static,
    ) -> Self {
        ComponentDef::function(name, render).build()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn instantiate(&self, props: &Props, context: &ComponentContext) -> Box<dyn Component> {
        match &self.0.shape {
            Shape::Class(constructor) => constructor(props, context),
            Shape::Function(render) => Box::new(FunctionComponent {
                render: Rc::clone(render),
            }),
        }
    }

    pub(crate) fn derive_from_props(&self) -> Option<&DeriveFromProps> {
        self.0.derive_from_props.as_ref()
    }

    pub(crate) fn derive_from_error(&self) -> Option<DeriveFromError> {
        self.0.derive_from_error.clone()
    }

    pub(crate) fn context_type(&self) -> Option<&ContextHandle> {
        self.0.context_type.as_ref()
    }

    pub(crate) fn provides(&self) -> Option<&str> {
        self.0.provides.as_deref()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "ComponentType({})", self.0.name)
    }
}
