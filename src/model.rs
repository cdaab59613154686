//! The in-memory document a hierarchical stream is accumulated into.
//!
//! A [`Document`] owns a single root [`Node`]. Nodes keep their children in
//! insertion order and may carry attributes, an optional scalar value and the
//! [`ArrayHint`] that was supplied when they were started.
use crate::hints::ArrayHint;

use std::fmt;

/// Scalar content of a node.
///
/// Only values that were explicitly typed by the caller are rendered as JSON
/// literals; everything set through `set_value` is text.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl NodeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value the way it would appear as XML character data.
    pub fn to_text(&self) -> String {
        match self {
            NodeValue::Text(s) => s.clone(),
            NodeValue::Integer(n) => itoa::Buffer::new().format(*n).to_owned(),
            NodeValue::Float(n) => ryu::Buffer::new().format(*n).to_owned(),
            NodeValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for NodeValue {
    fn from(s: &str) -> Self {
        NodeValue::Text(s.to_owned())
    }
}

impl From<String> for NodeValue {
    fn from(s: String) -> Self {
        NodeValue::Text(s)
    }
}

impl From<i64> for NodeValue {
    fn from(n: i64) -> Self {
        NodeValue::Integer(n)
    }
}

impl From<f64> for NodeValue {
    fn from(n: f64) -> Self {
        NodeValue::Float(n)
    }
}

impl From<bool> for NodeValue {
    fn from(b: bool) -> Self {
        NodeValue::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    hint: ArrayHint,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    value: Option<NodeValue>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            hint: ArrayHint::None,
            attributes: Vec::new(),
            children: Vec::new(),
            value: None,
        }
    }

    pub fn with_hint(mut self, hint: ArrayHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_value(mut self, value: impl Into<NodeValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hint(&self) -> ArrayHint {
        self.hint
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn value(&self) -> Option<&NodeValue> {
        self.value.as_ref()
    }

    /// A node holding both children and a scalar value cannot be rendered as
    /// strict JSON without a merge policy.
    pub fn has_mixed_content(&self) -> bool {
        !self.children.is_empty() && self.value.is_some()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Attribute names are a set: re-adding a name replaces its value.
    pub(crate) fn set_attribute(&mut self, name: String, value: String) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub(crate) fn into_children(self) -> Vec<Node> {
        self.children
    }

    pub(crate) fn value_mut(&mut self) -> &mut Option<NodeValue> {
        &mut self.value
    }
}

/// A finalized hierarchical stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Document { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

/// Location of a node inside a document, used for error reporting.
///
/// Displays as `/root/child/item[2]`; the bracketed index is only present for
/// members of a rendered array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    pub fn root() -> Self {
        NodePath::default()
    }

    pub fn push(&mut self, name: &str) {
        self.segments.push(name.to_owned());
    }

    pub fn push_indexed(&mut self, name: &str, index: usize) {
        self.segments.push(format!("{}[{}]", name, index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
