//! Recursive per-name merge
//!
//! Combines a dominant (override) tree with a recessive (base) tree:
//! - Values: override wins when it carries one
//! - Attributes: union, override wins on key collision
//! - Children: matched by name (first occurrence), merged recursively

use crate::node::ConfigNode;
use std::collections::HashSet;

/// Merge `override_node` over `base`
///
/// - Both absent → `None`
/// - Only one present → a copy of it
/// - Both present → value from override if it has one, else from base.
///   With `prefer_override`, a present override keeps its own value even when
///   it has none, which suppresses the base value.
///
/// The result is named after the override node and never aliases an input.
#[must_use]
pub fn merge(
    override_node: Option<&ConfigNode>,
    base: Option<&ConfigNode>,
    prefer_override: bool,
) -> Option<ConfigNode> {
    match (override_node, base) {
        (None, None) => None,
        (Some(node), None) | (None, Some(node)) => Some(node.clone()),
        (Some(dominant), Some(recessive)) => Some(merge_nodes(dominant, recessive, prefer_override)),
    }
}

fn merge_nodes(dominant: &ConfigNode, recessive: &ConfigNode, prefer_override: bool) -> ConfigNode {
    let mut merged = ConfigNode::new(dominant.name());

    let value = if prefer_override || dominant.value().is_some() {
        dominant.value()
    } else {
        recessive.value()
    };
    merged.set_value(value.map(str::to_owned));

    for (key, value) in dominant.attributes() {
        merged.set_attribute(key, value);
    }
    for (key, value) in recessive.attributes() {
        if merged.attribute(key).is_none() {
            merged.set_attribute(key, value);
        }
    }

    for child in merge_children(dominant, recessive, prefer_override) {
        merged.add_child(child);
    }
    merged
}

/// Merge the children of two nodes
///
/// Result order follows the override's children, then base-only names are
/// appended. The first override child of a name is merged with the first base
/// child of that name; repeated override children are copied through.
#[must_use]
pub fn merge_children(
    dominant: &ConfigNode,
    recessive: &ConfigNode,
    prefer_override: bool,
) -> Vec<ConfigNode> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut children = Vec::with_capacity(dominant.child_count() + recessive.child_count());

    for child in dominant.children() {
        if seen.insert(child.name()) {
            let base_child = recessive.child(child.name());
            if let Some(merged) = merge(Some(child), base_child, prefer_override) {
                children.push(merged);
            }
        } else {
            children.push(child.clone());
        }
    }

    children.extend(
        recessive
            .children()
            .iter()
            .filter(|child| !seen.contains(child.name()))
            .cloned(),
    );
    children
}
