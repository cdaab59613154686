use crate::model::NodePath;

use hashbrown::HashSet as FastSet;

/// Out-of-band signal supplied with every `start_node` call.
///
/// JSON has no notion of a repeated element outside of arrays, so callers tell
/// the writer which nodes belong to a homogeneous collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArrayHint {
    /// A plain node.
    #[default]
    None,
    /// The node is a member of a collection; it renders inside an array even
    /// when it is the only member.
    Member,
    /// The node marks a collection with no members and renders as `[]`.
    /// It must not receive attributes, a value or children.
    EmptyCollection,
}

impl ArrayHint {
    pub fn is_hinted(self) -> bool {
        self != ArrayHint::None
    }
}

/// The `isCollection` side channel: answers, for a node about to be started,
/// whether it belongs to a collection.
pub trait CollectionHints {
    fn hint_for(&self, parent: &NodePath, name: &str) -> ArrayHint;
}

impl<F> CollectionHints for F
where
    F: Fn(&NodePath, &str) -> ArrayHint,
{
    fn hint_for(&self, parent: &NodePath, name: &str) -> ArrayHint {
        self(parent, name)
    }
}

/// Reports every node whose name is registered as a collection member.
#[derive(Debug, Clone, Default)]
pub struct NamedCollections {
    names: FastSet<String, ahash::RandomState>,
}

impl NamedCollections {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NamedCollections {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl CollectionHints for NamedCollections {
    fn hint_for(&self, _parent: &NodePath, name: &str) -> ArrayHint {
        if self.names.contains(name) {
            ArrayHint::Member
        } else {
            ArrayHint::None
        }
    }
}

/// Never reports a collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl CollectionHints for NoHints {
    fn hint_for(&self, _parent: &NodePath, _name: &str) -> ArrayHint {
        ArrayHint::None
    }
}
