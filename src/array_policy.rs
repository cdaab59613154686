//! Decides how same-named siblings are keyed in the parent JSON object.
use crate::hints::ArrayHint;
use crate::model::Node;

use hashbrown::HashMap as FastMap;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayMode {
    /// Trust the per-node [`ArrayHint`].
    HintDriven,
    /// Ignore hints; a repeated name keeps only its last node.
    /// Lossy, only meant for documents that predate array hints.
    Legacy,
}

impl ArrayMode {
    pub fn from_flag(use_array_hints: bool) -> Self {
        if use_array_hints {
            ArrayMode::HintDriven
        } else {
            ArrayMode::Legacy
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum GroupShape<'a> {
    Single(&'a Node),
    /// Possibly empty, when the group only held empty collection markers.
    Array(Vec<&'a Node>),
}

#[derive(Debug, PartialEq)]
pub(crate) struct ChildGroup<'a> {
    pub name: &'a str,
    pub shape: GroupShape<'a>,
    /// Some node of this name came after a sibling of another name, so
    /// rendering the group moves it out of document order.
    pub reordered: bool,
}

/// Groups `children` by name, at the position of each name's first occurrence.
pub(crate) fn group_children(mode: ArrayMode, children: &[Node]) -> Vec<ChildGroup<'_>> {
    let mut index_by_name: FastMap<&str, usize, ahash::RandomState> =
        FastMap::with_capacity_and_hasher(children.len(), ahash::RandomState::new());
    let mut members: Vec<(&str, Vec<&Node>, bool)> = Vec::new();
    let mut previous = None;

    for child in children {
        let idx = match index_by_name.get(child.name()) {
            Some(&idx) => {
                if previous != Some(idx) {
                    members[idx].2 = true;
                }
                members[idx].1.push(child);
                idx
            }
            None => {
                let idx = members.len();
                index_by_name.insert(child.name(), idx);
                members.push((child.name(), vec![child], false));
                idx
            }
        };
        previous = Some(idx);
    }

    members
        .into_iter()
        .map(|(name, nodes, reordered)| ChildGroup {
            name,
            shape: shape_group(mode, name, nodes),
            reordered,
        })
        .collect()
}

fn shape_group<'a>(mode: ArrayMode, name: &str, nodes: Vec<&'a Node>) -> GroupShape<'a> {
    match mode {
        ArrayMode::Legacy => {
            if nodes.len() > 1 {
                debug!(
                    "legacy mode: `{}` repeated {} times, keeping the last one",
                    name,
                    nodes.len()
                );
            }
            // Groups are never empty: each one is created with its first node.
            GroupShape::Single(nodes[nodes.len() - 1])
        }
        ArrayMode::HintDriven => {
            let hinted = nodes.iter().any(|n| n.hint().is_hinted());
            if !hinted && nodes.len() == 1 {
                return GroupShape::Single(nodes[0]);
            }
            if !hinted {
                debug!(
                    "`{}` repeated {} times without an array hint, accumulating into an array",
                    name,
                    nodes.len()
                );
            }
            GroupShape::Array(
                nodes
                    .into_iter()
                    .filter(|n| n.hint() != ArrayHint::EmptyCollection)
                    .collect(),
            )
        }
    }
}
