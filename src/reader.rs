//! Reads mapped JSON back into a [`Document`].
//!
//! This is the inverse of the serializer: prefixed keys become attributes, the
//! text key becomes the node value and every other key becomes a child. In
//! hint-driven mode array elements come back as [`ArrayHint::Member`] nodes
//! and `[]` as a single [`ArrayHint::EmptyCollection`] node, so a document
//! written with hints reads back with the same hints.
use crate::array_policy::ArrayMode;
use crate::convention::{Convention, KeyKind};
use crate::err::{DeserializationError, DeserializationResult, SerializationResult};
use crate::hints::ArrayHint;
use crate::model::{Document, Node, NodePath, NodeValue};
use crate::settings::WriterSettings;
use crate::tree_sink::HierarchicalStreamWriter;

use log::trace;
use serde_json::Value;

/// Name given to the root when the input was written with `drop_root_element`.
pub const DROPPED_ROOT_NAME: &str = "root";

pub struct MappedJsonReader {
    document: Document,
}

impl MappedJsonReader {
    pub(crate) fn from_document(document: Document) -> Self {
        MappedJsonReader { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Re-emits the document as hierarchical stream events.
    pub fn replay<H: HierarchicalStreamWriter + ?Sized>(
        &self,
        writer: &mut H,
    ) -> SerializationResult<()> {
        replay_node(self.document.root(), writer)
    }
}

fn replay_node<H: HierarchicalStreamWriter + ?Sized>(
    node: &Node,
    writer: &mut H,
) -> SerializationResult<()> {
    writer.start_node(node.name(), node.hint())?;
    for attribute in node.attributes() {
        writer.add_attribute(&attribute.name, &attribute.value)?;
    }
    match node.value() {
        Some(NodeValue::Text(text)) => writer.set_value(text)?,
        Some(typed) => writer.set_typed_value(typed.clone())?,
        None => {}
    }
    for child in node.children() {
        replay_node(child, writer)?;
    }
    writer.end_node()
}

pub(crate) fn parse_document(
    text: &str,
    settings: &WriterSettings,
) -> DeserializationResult<Document> {
    let value: Value = serde_json::from_str(text)?;
    let reader = NodeReader {
        convention: Convention::new(settings),
        mode: ArrayMode::from_flag(settings.should_use_array_hints()),
    };
    reader.read_document(value, settings.should_drop_root_element())
}

struct NodeReader {
    convention: Convention,
    mode: ArrayMode,
}

impl NodeReader {
    fn read_document(
        &self,
        value: Value,
        drop_root_element: bool,
    ) -> DeserializationResult<Document> {
        let mut path = NodePath::root();

        if drop_root_element {
            path.push(DROPPED_ROOT_NAME);
            let root = self.read_node(
                DROPPED_ROOT_NAME.to_owned(),
                ArrayHint::None,
                value,
                &mut path,
            )?;
            return Ok(Document::new(root));
        }

        let (key, body) = match value {
            Value::Object(map) if map.len() == 1 => map
                .into_iter()
                .next()
                .ok_or_else(|| DeserializationError::unexpected_shape(&path, "empty document"))?,
            other => {
                return Err(DeserializationError::unexpected_shape(
                    &path,
                    format!(
                        "expected an object with exactly one key, found {}",
                        describe(&other)
                    ),
                ));
            }
        };

        let name = self.convention.element_name(&key).into_owned();
        let mut root = Node::new(name.clone());
        self.read_children(&mut root, name, body, &mut path)?;

        let mut roots = root.into_children();
        match (roots.pop(), roots.is_empty()) {
            (Some(root), true) => Ok(Document::new(root)),
            _ => Err(DeserializationError::unexpected_shape(
                &path,
                "the root key must hold exactly one node",
            )),
        }
    }

    fn read_node(
        &self,
        name: String,
        hint: ArrayHint,
        value: Value,
        path: &mut NodePath,
    ) -> DeserializationResult<Node> {
        trace!("read_node: {}", path);
        let mut node = Node::new(name).with_hint(hint);

        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match self.convention.classify(&key) {
                        KeyKind::Text => *node.value_mut() = scalar_value(value, path)?,
                        KeyKind::Attribute(attribute) => {
                            let text = attribute_text(value, path, &attribute)?;
                            node.set_attribute(attribute.into_owned(), text);
                        }
                        KeyKind::Element(child) => {
                            self.read_children(&mut node, child.into_owned(), value, path)?
                        }
                    }
                }
            }
            scalar => *node.value_mut() = scalar_value(scalar, path)?,
        }

        Ok(node)
    }

    fn read_children(
        &self,
        parent: &mut Node,
        name: String,
        value: Value,
        path: &mut NodePath,
    ) -> DeserializationResult<()> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                path.push(&name);
                let child = self.read_node(name, ArrayHint::None, other, path)?;
                path.pop();
                parent.push_child(child);
                return Ok(());
            }
        };

        let hint = match self.mode {
            ArrayMode::HintDriven if items.is_empty() => {
                parent.push_child(Node::new(name).with_hint(ArrayHint::EmptyCollection));
                return Ok(());
            }
            ArrayMode::HintDriven => ArrayHint::Member,
            ArrayMode::Legacy => ArrayHint::None,
        };

        for (i, item) in items.into_iter().enumerate() {
            path.push_indexed(&name, i);
            if item.is_array() {
                return Err(DeserializationError::unexpected_shape(
                    &path,
                    "nested arrays have no node representation",
                ));
            }
            let child = self.read_node(name.clone(), hint, item, path)?;
            path.pop();
            parent.push_child(child);
        }
        Ok(())
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `""` and `null` both mean "no value".
fn scalar_value(value: Value, path: &NodePath) -> DeserializationResult<Option<NodeValue>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(NodeValue::Text(s))),
        Value::Bool(b) => Ok(Some(NodeValue::Bool(b))),
        Value::Number(n) => Ok(Some(if let Some(i) = n.as_i64() {
            NodeValue::Integer(i)
        } else if n.is_f64() {
            NodeValue::Float(n.as_f64().unwrap_or_default())
        } else {
            // Integers beyond `i64` are kept verbatim rather than rounded.
            NodeValue::Text(n.to_string())
        })),
        other => Err(DeserializationError::unexpected_shape(
            path,
            format!("expected a scalar value, found {}", describe(&other)),
        )),
    }
}

fn attribute_text(value: Value, path: &NodePath, name: &str) -> DeserializationResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(DeserializationError::unexpected_shape(
            path,
            format!("attribute `{}` holds {}", name, describe(&other)),
        )),
    }
}
