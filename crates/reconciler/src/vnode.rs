//! Authored node descriptions.
//!
//! A [`VNode`] is immutable once built and cheap to clone. Everything learned
//! while reconciling it (live node, instance, realized children) lives in the
//! binding tree owned by the reconciler, never in the description itself.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};
use serde_json::{Number, Value};
use smallvec::SmallVec;
use target_tree::{Listener, NodeKey};

use crate::binding::InstanceId;
use crate::component::ComponentType;

/// Closed set of node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    Component,
    Fragment,
}

#[derive(Clone)]
pub enum Tag {
    Text(String),
    Element(String),
    Component(ComponentType),
    Fragment,
}

/// Where a description came from. Nodes built from serialized data are never
/// rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Authored,
    Untrusted,
}

/// Event handler carried in props. Compared by identity.
#[derive(Clone)]
pub struct Handler(pub Listener);

impl Handler {
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self(Rc::new(callback))
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Handler(..)")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Data(Value),
    Handler(Handler),
}

impl PropValue {
    /// JSON view of the value; handlers have none.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Data(data) => data.clone(),
            Self::Handler(_) => Value::Null,
        }
    }

    /// Serialized attribute form.
    pub fn to_attr_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Bool(flag) => flag.to_string(),
            Self::Data(Value::String(text)) => text.clone(),
            Self::Data(data) => data.to_string(),
            Self::Handler(_) => String::new(),
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => number.as_f64().map_or_else(|| Self::Data(value.clone()), Self::Number),
            other => Self::Data(other.clone()),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        Self::Handler(value)
    }
}

/// Ordered props of a node. `children` and raw markup are kept apart from the
/// attribute list so they never reach attribute application.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attrs: SmallVec<(String, PropValue), 4>,
    children: Vec<VNode>,
    raw_html: Option<String>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier value in place.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        let value = value.into();
        match self.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some((_, current)) => *current = value,
            None => self.attrs.push((name.to_owned(), value)),
        }
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Replace the node's content with opaque markup instead of children.
    #[must_use]
    pub fn with_raw_html(mut self, markup: impl Into<String>) -> Self {
        self.raw_html = Some(markup.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }

    pub fn raw_html(&self) -> Option<&str> {
        self.raw_html.as_deref()
    }

    /// The `multiple` flag of form controls, which is a property rather than
    /// an attribute.
    pub fn multiple(&self) -> Option<bool> {
        match self.get("multiple")? {
            PropValue::Bool(flag) => Some(*flag),
            other => Some(!matches!(other, PropValue::Text(text) if text.is_empty())),
        }
    }
}

/// What a ref receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefTarget {
    Node(NodeKey),
    Instance(InstanceId),
}

type RefCallback = Rc<dyn Fn(Option<RefTarget>) -> Result<()>>;

/// Callback or mutable cell receiving the live node or instance.
#[derive(Clone)]
pub enum NodeRef {
    Callback(RefCallback),
    Cell(Rc<RefCell<Option<RefTarget>>>),
}

impl NodeRef {
    pub fn callback(callback: impl Fn(Option<RefTarget>) -> Result<()> + 'static) -> Self {
        Self::Callback(Rc::new(callback))
    }

    pub fn cell() -> Self {
        Self::Cell(Rc::new(RefCell::new(None)))
    }

    /// Current value of a cell ref; callbacks hold nothing.
    pub fn current(&self) -> Option<RefTarget> {
        match self {
            Self::Cell(cell) => *cell.borrow(),
            Self::Callback(_) => None,
        }
    }

    /// Hand `value` to the ref.
    ///
    /// # Errors
    /// Returns whatever the callback returns.
    pub fn apply(&self, value: Option<RefTarget>) -> Result<()> {
        match self {
            Self::Callback(callback) => callback(value),
            Self::Cell(cell) => {
                *cell.borrow_mut() = value;
                Ok(())
            }
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Callback(left), Self::Callback(right)) => Rc::ptr_eq(left, right),
            (Self::Cell(left), Self::Cell(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => formatter.write_str("NodeRef::Callback(..)"),
            Self::Cell(cell) => write!(formatter, "NodeRef::Cell({:?})", cell.borrow()),
        }
    }
}

#[derive(Clone)]
struct VNodeData {
    tag: Tag,
    props: Props,
    key: Option<String>,
    node_ref: Option<NodeRef>,
    origin: Origin,
}

/// Immutable description of a renderable unit.
#[derive(Clone)]
pub struct VNode(Rc<VNodeData>);

impl VNode {
    fn build(tag: Tag, props: Props) -> Self {
        Self(Rc::new(VNodeData {
            tag,
            props,
            key: None,
            node_ref: None,
            origin: Origin::Authored,
        }))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::build(Tag::Text(text.into()), Props::default())
    }

    pub fn element(tag: &str, props: Props) -> Self {
        Self::build(Tag::Element(tag.to_owned()), props)
    }

    pub fn component(ty: &ComponentType, props: Props) -> Self {
        Self::build(Tag::Component(ty.clone()), props)
    }

    pub fn fragment(children: impl IntoIterator<Item = Self>) -> Self {
        Self::build(Tag::Fragment, Props::default().with_children(children))
    }

    #[must_use]
    pub fn with_key(self, key: impl Into<String>) -> Self {
        let mut data = Rc::unwrap_or_clone(self.0);
        data.key = Some(key.into());
        Self(Rc::new(data))
    }

    #[must_use]
    pub fn with_ref(self, node_ref: &NodeRef) -> Self {
        let mut data = Rc::unwrap_or_clone(self.0);
        data.node_ref = Some(node_ref.clone());
        Self(Rc::new(data))
    }

    /// Build an element/text tree from serialized data.
    ///
    /// Strings and numbers become text nodes; objects take the shape
    /// `{"tag": "div", "key": "k", "props": {..}, "children": [..]}`. The
    /// result is marked untrusted and is refused by every reconcile pass.
    ///
    /// # Errors
    /// Fails on values that describe no node.
    pub fn from_json(value: &Value) -> Result<Self> {
        let node = match value {
            Value::String(text) => Self::text(text.clone()),
            Value::Number(number) => Self::text(number.to_string()),
            Value::Object(fields) => {
                let tag = fields
                    .get("tag")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("serialized node has no tag"))?;
                let mut props = Props::default();
                if let Some(Value::Object(attrs)) = fields.get("props") {
                    for (name, attr) in attrs {
                        props = props.with(name, PropValue::from_json(attr));
                    }
                }
                if let Some(Value::Array(children)) = fields.get("children") {
                    for child in children {
                        props = props.with_child(Self::from_json(child)?);
                    }
                }
                let key = fields.get("key").and_then(Value::as_str).map(str::to_owned);
                Self(Rc::new(VNodeData {
                    tag: Tag::Element(tag.to_owned()),
                    props,
                    key,
                    node_ref: None,
                    origin: Origin::Authored,
                }))
            }
            other => bail!("cannot build a node from {other}"),
        };
        let mut data = Rc::unwrap_or_clone(node.0);
        data.origin = Origin::Untrusted;
        Ok(Self(Rc::new(data)))
    }

    pub fn kind(&self) -> NodeKind {
        match self.0.tag {
            Tag::Text(_) => NodeKind::Text,
            Tag::Element(_) => NodeKind::Element,
            Tag::Component(_) => NodeKind::Component,
            Tag::Fragment => NodeKind::Fragment,
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.0.tag
    }

    /// Element tag name, if this is an element.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.tag {
            Tag::Element(name) => Some(name),
            _ => None,
        }
    }

    /// Payload of a text node.
    pub fn text_content(&self) -> Option<&str> {
        match &self.0.tag {
            Tag::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn component_type(&self) -> Option<&ComponentType> {
        match &self.0.tag {
            Tag::Component(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn node_ref(&self) -> Option<&NodeRef> {
        self.0.node_ref.as_ref()
    }

    pub fn is_untrusted(&self) -> bool {
        self.0.origin == Origin::Untrusted
    }

    /// Same kind and same tag (component types by identity).
    pub fn same_type(&self, other: &Self) -> bool {
        match (&self.0.tag, &other.0.tag) {
            (Tag::Text(_), Tag::Text(_)) | (Tag::Fragment, Tag::Fragment) => true,
            (Tag::Element(left), Tag::Element(right)) => left == right,
            (Tag::Component(left), Tag::Component(right)) => left == right,
            _ => false,
        }
    }

    /// Whether `other` may be reconciled into the same position as `self`.
    pub fn matches(&self, other: &Self) -> bool {
        self.same_type(other) && self.key() == other.key()
    }

    /// Whether both handles point at the very same description.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for VNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.tag {
            Tag::Text(text) => write!(formatter, "{text:?}"),
            Tag::Element(name) => write!(formatter, "<{name}>"),
            Tag::Component(ty) => write!(formatter, "<{}/>", ty.name()),
            Tag::Fragment => formatter.write_str("<>"),
        }?;
        if let Some(key) = self.key() {
            write!(formatter, "#{key}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_marks_whole_tree_untrusted() {
        let node = VNode::from_json(&json!({
            "tag": "div",
            "key": "k",
            "props": { "id": "x", "hidden": true },
            "children": ["hi", { "tag": "b" }],
        }))
        .unwrap();
        assert!(node.is_untrusted());
        assert_eq!(node.key(), Some("k"));
        assert_eq!(node.props().text("id"), Some("x"));
        assert_eq!(node.props().get("hidden"), Some(&PropValue::Bool(true)));
        assert!(node.props().children().iter().all(VNode::is_untrusted));
        assert!(VNode::from_json(&json!(null)).is_err());
        assert!(VNode::from_json(&json!({ "props": {} })).is_err());
    }

    #[test]
    fn matching_uses_type_and_key() {
        let plain = VNode::element("li", Props::new());
        let keyed = VNode::element("li", Props::new()).with_key("a");
        assert!(plain.same_type(&keyed));
        assert!(!plain.matches(&keyed));
        assert!(keyed.matches(&VNode::element("li", Props::new()).with_key("a")));
        assert!(!keyed.matches(&VNode::element("ul", Props::new()).with_key("a")));
        assert!(VNode::text("a").matches(&VNode::text("b")));
    }

    #[test]
    fn props_replace_in_place() {
        let props = Props::new().with("a", 1_i64).with("b", "x").with("a", 2_i64);
        let names: Vec<&str> = props.attrs().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(props.number("a"), Some(2.0));
    }
}
