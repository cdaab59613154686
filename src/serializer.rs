use crate::array_policy::{ArrayMode, ChildGroup, GroupShape, group_children};
use crate::convention::Convention;
use crate::emitter::JsonEmitter;
use crate::err::{SerializationError, SerializationResult};
use crate::model::{Document, Node, NodePath, NodeValue};
use crate::settings::{MixedContentPolicy, WriterSettings};

use hashbrown::HashSet as FastSet;
use log::{trace, warn};

/// Renders a finalized [`Document`] through a [`JsonEmitter`].
///
/// ```text
/// <order id="7"><item>a</item><item>b</item><note/></order>
/// {"order": {"@id": "7", "item": ["a", "b"], "note": ""}}
/// ```
///
/// A leaf without attributes renders as its scalar value (`""` when it has
/// none). Anything else renders as an object holding the attributes, the value
/// under the text key, and the children grouped by the array policy.
pub struct Serializer {
    convention: Convention,
    mode: ArrayMode,
    mixed_content: MixedContentPolicy,
    drop_root_element: bool,
}

impl Serializer {
    pub fn new(settings: &WriterSettings) -> Self {
        Serializer {
            convention: Convention::new(settings),
            mode: ArrayMode::from_flag(settings.should_use_array_hints()),
            mixed_content: settings.get_mixed_content(),
            drop_root_element: settings.should_drop_root_element(),
        }
    }

    pub fn serialize<E: JsonEmitter>(
        &self,
        document: &Document,
        mut emitter: E,
    ) -> SerializationResult<E::Output> {
        let root = document.root();
        trace!("serializing document rooted at `{}`", root.name());

        let mut path = NodePath::root();
        // The root is treated as a group of one under a virtual parent, so a
        // hinted root still renders as an array.
        let groups = group_children(self.mode, std::slice::from_ref(root));

        for group in &groups {
            if self.drop_root_element {
                if let GroupShape::Array(_) = group.shape {
                    path.push(group.name);
                    return Err(SerializationError::encoding(
                        &path,
                        "a collection root cannot be written without its element",
                    ));
                }
                self.emit_group(group, &mut path, &mut emitter)?;
            } else {
                emitter.begin_object()?;
                emitter.key(&self.convention.element_key(group.name))?;
                self.emit_group(group, &mut path, &mut emitter)?;
                emitter.end_object()?;
            }
        }

        emitter.finish()
    }

    fn emit_group<E: JsonEmitter>(
        &self,
        group: &ChildGroup<'_>,
        path: &mut NodePath,
        emitter: &mut E,
    ) -> SerializationResult<()> {
        match &group.shape {
            GroupShape::Single(node) => {
                path.push(node.name());
                self.emit_node(node, path, emitter)?;
                path.pop();
            }
            GroupShape::Array(nodes) => {
                emitter.begin_array()?;
                for (i, node) in nodes.iter().enumerate() {
                    path.push_indexed(group.name, i);
                    self.emit_node(node, path, emitter)?;
                    path.pop();
                }
                emitter.end_array()?;
            }
        }
        Ok(())
    }

    fn emit_node<E: JsonEmitter>(
        &self,
        node: &Node,
        path: &mut NodePath,
        emitter: &mut E,
    ) -> SerializationResult<()> {
        let children: &[Node] = if node.has_mixed_content() {
            match self.mixed_content {
                MixedContentPolicy::Reject => {
                    return Err(SerializationError::encoding(
                        &path,
                        "node has both child nodes and a value",
                    ));
                }
                MixedContentPolicy::PreferValue => {
                    warn!(
                        "`{}` has both a value and {} child node(s), dropping the children",
                        path,
                        node.children().len()
                    );
                    &[]
                }
            }
        } else {
            node.children()
        };

        if children.is_empty() && node.attributes().is_empty() {
            return self.emit_scalar(node.value(), path, emitter);
        }

        let mut keys: FastSet<String, ahash::RandomState> = FastSet::with_capacity_and_hasher(
            node.attributes().len() + children.len() + 1,
            ahash::RandomState::new(),
        );

        emitter.begin_object()?;

        for attribute in node.attributes() {
            let key = self.convention.attribute_key(&attribute.name);
            claim_key(&mut keys, &key, path)?;
            emitter.key(&key)?;
            emitter.string(&attribute.value)?;
        }

        if let Some(value) = node.value() {
            let key = self.convention.text_key();
            claim_key(&mut keys, key, path)?;
            emitter.key(key)?;
            self.emit_scalar(Some(value), path, emitter)?;
        }

        for group in group_children(self.mode, children) {
            let key = self.convention.element_key(group.name);
            if self.convention.is_reserved(&key) {
                return Err(SerializationError::encoding(
                    &path,
                    format!("child `{}` would read back as an attribute or value", group.name),
                ));
            }
            if group.reordered {
                warn!(
                    "`{}`: `{}` reappears after other siblings, writing its nodes together",
                    path, group.name
                );
            }
            claim_key(&mut keys, &key, path)?;
            emitter.key(&key)?;
            self.emit_group(&group, path, emitter)?;
        }

        emitter.end_object()
    }

    fn emit_scalar<E: JsonEmitter>(
        &self,
        value: Option<&NodeValue>,
        path: &NodePath,
        emitter: &mut E,
    ) -> SerializationResult<()> {
        match value {
            None => emitter.string(""),
            Some(NodeValue::Text(s)) => emitter.string(s),
            Some(NodeValue::Integer(n)) => emitter.integer(*n),
            Some(NodeValue::Float(n)) if !n.is_finite() => Err(SerializationError::encoding(
                path,
                format!("`{}` has no JSON representation", n),
            )),
            Some(NodeValue::Float(n)) => emitter.float(*n),
            Some(NodeValue::Bool(b)) => emitter.boolean(*b),
        }
    }
}

/// JSON object keys must be unique; two names mapping to one key would lose data.
fn claim_key(
    keys: &mut FastSet<String, ahash::RandomState>,
    key: &str,
    path: &NodePath,
) -> SerializationResult<()> {
    if !keys.insert(key.to_owned()) {
        return Err(SerializationError::encoding(
            path,
            format!("key `{}` would be emitted twice", key),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ValueEmitter;
    use crate::hints::ArrayHint;
    use crate::json_writer::JsonStreamEmitter;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn to_value(settings: &WriterSettings, root: Node) -> SerializationResult<Value> {
        Serializer::new(settings).serialize(&Document::new(root), ValueEmitter::new())
    }

    fn to_text(settings: &WriterSettings, root: Node) -> String {
        let bytes = Serializer::new(settings)
            .serialize(&Document::new(root), JsonStreamEmitter::new(Vec::new()))
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn order() -> Node {
        Node::new("order")
            .with_attribute("id", "7")
            .with_child(Node::new("item").with_hint(ArrayHint::Member).with_value("a"))
            .with_child(Node::new("item").with_hint(ArrayHint::Member).with_value("b"))
            .with_child(Node::new("note"))
    }

    #[test]
    fn test_renders_attributes_arrays_and_leaves() {
        let value = to_value(&WriterSettings::new(), order()).unwrap();

        assert_eq!(
            value,
            json!({"order": {"@id": "7", "item": ["a", "b"], "note": ""}})
        );
    }

    #[test]
    fn test_both_emitters_agree() {
        let settings = WriterSettings::new();
        let tree = to_value(&settings, order()).unwrap().to_string();

        assert_eq!(to_text(&settings, order()), tree);
    }

    #[test]
    fn test_value_next_to_attributes_uses_text_key() {
        let root = Node::new("price").with_attribute("currency", "EUR").with_value("9.99");

        assert_eq!(
            to_value(&WriterSettings::new(), root).unwrap(),
            json!({"price": {"@currency": "EUR", "$": "9.99"}})
        );
    }

    #[test]
    fn test_typed_values_are_literals() {
        let root = Node::new("stats")
            .with_child(Node::new("count").with_value(3_i64))
            .with_child(Node::new("ratio").with_value(0.25_f64))
            .with_child(Node::new("ok").with_value(true))
            .with_child(Node::new("label").with_value("3"));

        assert_eq!(
            to_text(&WriterSettings::new(), root),
            r#"{"stats":{"count":3,"ratio":0.25,"ok":true,"label":"3"}}"#
        );
    }

    #[test]
    fn test_non_finite_float_is_an_encoding_error() {
        let root = Node::new("stats").with_child(Node::new("ratio").with_value(f64::NAN));

        let err = to_value(&WriterSettings::new(), root).unwrap_err();
        assert!(
            matches!(err, SerializationError::Encoding { ref path, .. } if path == "/stats/ratio")
        );
    }

    #[test]
    fn test_mixed_content_prefers_value_by_default() {
        crate::ensure_env_logger_initialized();
        let root = Node::new("a").with_value("text").with_child(Node::new("b"));

        assert_eq!(
            to_value(&WriterSettings::new(), root).unwrap(),
            json!({"a": "text"})
        );
    }

    #[test]
    fn test_mixed_content_can_be_rejected() {
        let settings = WriterSettings::new().mixed_content(MixedContentPolicy::Reject);
        let root = Node::new("a")
            .with_child(Node::new("b").with_value("text").with_child(Node::new("c")));

        let err = to_value(&settings, root).unwrap_err();
        assert!(matches!(err, SerializationError::Encoding { ref path, .. } if path == "/a/b"));
    }

    #[test]
    fn test_drop_root_element() {
        let settings = WriterSettings::new().drop_root_element(true);

        assert_eq!(
            to_value(&settings, order()).unwrap(),
            json!({"@id": "7", "item": ["a", "b"], "note": ""})
        );
    }

    #[test]
    fn test_colliding_keys_are_an_encoding_error() {
        let settings = WriterSettings::new().ignore_namespaces(true);
        let root = Node::new("a")
            .with_child(Node::new("x:id"))
            .with_child(Node::new("y:id"));

        let err = to_value(&settings, root).unwrap_err();
        assert!(matches!(err, SerializationError::Encoding { ref path, .. } if path == "/a"));
    }

    #[test]
    fn test_array_member_paths_are_indexed() {
        let root = Node::new("list")
            .with_child(Node::new("n").with_hint(ArrayHint::Member).with_value(1_i64))
            .with_child(Node::new("n").with_hint(ArrayHint::Member).with_value(f64::INFINITY));

        let err = to_value(&WriterSettings::new(), root).unwrap_err();
        assert!(
            matches!(err, SerializationError::Encoding { ref path, .. } if path == "/list/n[1]")
        );
    }

    #[test]
    fn test_child_named_like_the_text_key_is_an_encoding_error() {
        let root = Node::new("a").with_child(Node::new("$").with_value("child"));

        let err = to_value(&WriterSettings::new(), root).unwrap_err();
        assert!(matches!(err, SerializationError::Encoding { ref path, .. } if path == "/a"));
    }

    #[test]
    fn test_child_named_like_an_attribute_is_an_encoding_error() {
        let root = Node::new("a").with_child(Node::new("@id").with_value("7"));

        let err = to_value(&WriterSettings::new(), root).unwrap_err();
        assert!(matches!(err, SerializationError::Encoding { ref path, .. } if path == "/a"));

        // Without a prefix there is nothing to confuse it with.
        let root = Node::new("a").with_child(Node::new("@id").with_value("7"));
        assert_eq!(
            to_value(&WriterSettings::new().attribute_prefix(""), root).unwrap(),
            json!({"a": {"@id": "7"}})
        );
    }

    #[test]
    fn test_scattered_siblings_are_written_together() {
        crate::ensure_env_logger_initialized();
        let root = Node::new("r")
            .with_child(Node::new("a").with_value("1"))
            .with_child(Node::new("b").with_value("2"))
            .with_child(Node::new("a").with_value("3"));

        assert_eq!(
            to_text(&WriterSettings::new(), root),
            r#"{"r":{"a":["1","3"],"b":"2"}}"#
        );
    }

    #[test]
    fn test_dropped_collection_root_is_an_encoding_error() {
        let settings = WriterSettings::new().drop_root_element(true);

        for hint in [ArrayHint::Member, ArrayHint::EmptyCollection] {
            let err = to_value(&settings, Node::new("list").with_hint(hint)).unwrap_err();
            assert!(
                matches!(err, SerializationError::Encoding { ref path, .. } if path == "/list")
            );
        }
    }

    #[test]
    fn test_namespaces_are_mapped() {
        let settings = WriterSettings::new().namespace("xs", "schema");
        let root = Node::new("xs:element").with_attribute("xs:type", "string");

        assert_eq!(
            to_value(&settings, root).unwrap(),
            json!({"schema.element": {"@schema.type": "string"}})
        );
    }
}
