use crate::err::{SerializationError, SerializationResult};
use crate::hints::ArrayHint;
use crate::model::{Document, Node, NodePath, NodeValue};

use log::trace;

/// The four-call hierarchical stream contract.
///
/// Every `start_node` must be matched by exactly one `end_node`. Attributes
/// may only be added before the first child or value of the current node.
pub trait HierarchicalStreamWriter {
    fn start_node(&mut self, name: &str, hint: ArrayHint) -> SerializationResult<()>;
    fn add_attribute(&mut self, name: &str, value: &str) -> SerializationResult<()>;
    fn set_value(&mut self, text: &str) -> SerializationResult<()>;
    /// Sets a value that renders as a JSON literal instead of a string.
    fn set_typed_value(&mut self, value: NodeValue) -> SerializationResult<()>;
    fn end_node(&mut self) -> SerializationResult<()>;
}

struct OpenNode {
    node: Node,
    // Set once the node received its first child or value.
    sealed: bool,
}

/// Accumulates sink calls into a [`Document`].
///
/// No I/O happens here; the document is handed out by [`TreeSink::finish`].
/// The first contract violation aborts the session: the partial document is
/// dropped and every later call fails.
#[derive(Default)]
pub struct TreeSink {
    stack: Vec<OpenNode>,
    root: Option<Node>,
    path: NodePath,
    aborted: bool,
}

impl TreeSink {
    pub fn new() -> Self {
        TreeSink::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Path of the node currently open, `/` when none is.
    pub fn current_path(&self) -> &NodePath {
        &self.path
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Finalizes the document. Fails when nodes are still open or nothing was written.
    pub fn finish(mut self) -> SerializationResult<Document> {
        self.check_alive()?;
        if !self.stack.is_empty() {
            return Err(self.abort(format!(
                "end of session reached with {} unclosed node(s)",
                self.stack.len()
            )));
        }
        match self.root.take() {
            Some(root) => Ok(Document::new(root)),
            None => Err(self.abort("end of session reached before any node was written")),
        }
    }

    fn check_alive(&self) -> SerializationResult<()> {
        if self.aborted {
            return Err(SerializationError::invalid_state(
                &self.path,
                "session aborted by an earlier error",
            ));
        }
        Ok(())
    }

    fn abort(&mut self, message: impl Into<String>) -> SerializationError {
        let err = SerializationError::invalid_state(&self.path, message);
        self.stack.clear();
        self.root = None;
        self.path = NodePath::root();
        self.aborted = true;
        err
    }

    /// The innermost open node, after checking it may receive content.
    fn current_for_content(&mut self, what: &str) -> SerializationResult<&mut OpenNode> {
        let hint = match self.stack.last() {
            Some(open) => open.node.hint(),
            None => return Err(self.abort(format!("{} outside of any node", what))),
        };
        if hint == ArrayHint::EmptyCollection {
            return Err(self.abort(format!("{} inside an empty collection marker", what)));
        }
        // `stack.last()` was `Some` above.
        let last = self.stack.len() - 1;
        Ok(&mut self.stack[last])
    }
}

impl HierarchicalStreamWriter for TreeSink {
    fn start_node(&mut self, name: &str, hint: ArrayHint) -> SerializationResult<()> {
        trace!("start_node: {} ({:?})", name, hint);
        self.check_alive()?;

        if self.stack.is_empty() && self.root.is_some() {
            return Err(self.abort(format!("second root node `{}`", name)));
        }
        if name.is_empty() {
            return Err(self.abort("node name must not be empty"));
        }
        if !self.stack.is_empty() {
            self.current_for_content("child node")?.sealed = true;
        }

        self.path.push(name);
        self.stack.push(OpenNode {
            node: Node::new(name).with_hint(hint),
            sealed: false,
        });
        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &str) -> SerializationResult<()> {
        trace!("add_attribute: {}={}", name, value);
        self.check_alive()?;

        let sealed = self.current_for_content("attribute")?.sealed;
        if sealed {
            return Err(self.abort(format!(
                "attribute `{}` added after the node's first child or value",
                name
            )));
        }
        if name.is_empty() {
            return Err(self.abort("attribute name must not be empty"));
        }

        self.current_for_content("attribute")?
            .node
            .set_attribute(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn set_value(&mut self, text: &str) -> SerializationResult<()> {
        trace!("set_value: {:?}", text);
        self.check_alive()?;

        let open = self.current_for_content("value")?;
        if !open.node.children().is_empty() {
            return Err(self.abort("value set on a node that already has children"));
        }

        let open = self.current_for_content("value")?;
        open.sealed = true;
        let typed = match open.node.value_mut() {
            // Character data may arrive in several pieces.
            Some(NodeValue::Text(current)) => {
                current.push_str(text);
                return Ok(());
            }
            Some(typed) => format!("{:?}", typed),
            // Empty text is no value, which is how it reads back.
            slot => {
                if !text.is_empty() {
                    *slot = Some(NodeValue::Text(text.to_owned()));
                }
                return Ok(());
            }
        };
        Err(self.abort(format!("text appended to typed value {}", typed)))
    }

    fn set_typed_value(&mut self, value: NodeValue) -> SerializationResult<()> {
        trace!("set_typed_value: {:?}", value);
        self.check_alive()?;

        let open = self.current_for_content("value")?;
        if !open.node.children().is_empty() {
            return Err(self.abort("value set on a node that already has children"));
        }
        if open.node.value().is_some() {
            return Err(self.abort("value set twice on the same node"));
        }

        let open = self.current_for_content("value")?;
        open.sealed = true;
        *open.node.value_mut() = Some(value);
        Ok(())
    }

    fn end_node(&mut self) -> SerializationResult<()> {
        self.check_alive()?;

        let Some(open) = self.stack.pop() else {
            return Err(self.abort("end_node called without a matching start_node"));
        };
        trace!("end_node: {}", open.node.name());
        self.path.pop();

        match self.stack.last_mut() {
            Some(parent) => parent.node.push_child(open.node),
            None => self.root = Some(open.node),
        }
        Ok(())
    }
}
