use harness_tree::{merge, ConfigNode};
use proptest::prelude::*;

const NAMES: &[&str] = &["plain", "withProperty", "withDefault", "outDir", "nested"];

fn arb_leaf() -> impl Strategy<Value = ConfigNode> {
    (
        prop::sample::select(NAMES),
        prop::option::of("[a-z]{0,6}"),
        prop::option::of("[A-Z][a-z]{0,5}"),
    )
        .prop_map(|(name, value, implementation)| {
            let mut node = ConfigNode::new(name);
            node.set_value(value);
            if let Some(implementation) = implementation {
                node.set_attribute("implementation", implementation);
            }
            node
        })
}

fn arb_tree() -> impl Strategy<Value = ConfigNode> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        (arb_leaf(), prop::collection::vec(inner, 0..4)).prop_map(|(mut node, children)| {
            for child in children {
                node.add_child(child);
            }
            node
        })
    })
}

fn configuration(children: Vec<ConfigNode>) -> ConfigNode {
    children
        .into_iter()
        .fold(ConfigNode::new("configuration"), ConfigNode::with_child)
}

proptest! {
    #[test]
    fn prop_merge_with_self_is_identity(tree in arb_tree(), prefer in any::<bool>()) {
        let merged = merge(Some(&tree), Some(&tree), prefer).unwrap();
        prop_assert_eq!(merged.name(), tree.name());
        prop_assert_eq!(merged.value(), tree.value());
        prop_assert_eq!(merged.child_count(), tree.child_count());
    }

    #[test]
    fn prop_override_value_always_wins(
        name in prop::sample::select(NAMES),
        over in "[a-z]{0,6}",
        base in prop::option::of("[a-z]{0,6}"),
        prefer in any::<bool>(),
    ) {
        let over_node = configuration(vec![ConfigNode::new(name).with_value(over.clone())]);
        let mut base_child = ConfigNode::new(name);
        base_child.set_value(base);
        let base_node = configuration(vec![base_child]);

        let merged = merge(Some(&over_node), Some(&base_node), prefer).unwrap();
        prop_assert_eq!(merged.child_value(name), Some(over.as_str()));
    }

    #[test]
    fn prop_precedence_independent_of_order(
        mut names in prop::sample::subsequence(NAMES.to_vec(), 1..NAMES.len()),
        shift in 0..NAMES.len(),
    ) {
        let over_node = configuration(
            names.iter().map(|n| ConfigNode::new(*n).with_value("override")).collect(),
        );
        // Rotate the base ordering; precedence must not depend on position.
        let len = names.len();
        names.rotate_left(shift % len);
        let base_node = configuration(
            names.iter().map(|n| ConfigNode::new(*n).with_value("project")).collect(),
        );

        let merged = merge(Some(&over_node), Some(&base_node), false).unwrap();
        for name in &names {
            prop_assert_eq!(merged.child_value(name), Some("override"));
        }
    }

    #[test]
    fn prop_base_only_children_survive(over in arb_tree(), base in arb_tree()) {
        let merged = merge(Some(&over), Some(&base), false).unwrap();
        for child in base.children() {
            prop_assert!(merged.child(child.name()).is_some());
        }
        for child in over.children() {
            prop_assert!(merged.child(child.name()).is_some());
        }
    }

    #[test]
    fn prop_merge_is_idempotent(over in arb_tree(), base in arb_tree(), prefer in any::<bool>()) {
        let once = merge(Some(&over), Some(&base), prefer).unwrap();
        let twice = merge(Some(&over), Some(&once), prefer).unwrap();
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn three_tier_precedence() {
    let defaults = configuration(vec![
        ConfigNode::new("withDefault").with_value("default"),
        ConfigNode::new("plain").with_value("default-plain"),
    ]);
    let project = configuration(vec![ConfigNode::new("plain").with_value("explicitValue")]);
    let overrides = configuration(vec![ConfigNode::new("plain").with_value("plainValue")]);

    let explicit = merge(Some(&overrides), Some(&project), false).unwrap();
    let resolved = merge(Some(&explicit), Some(&defaults), false).unwrap();

    assert_eq!(resolved.child_value("plain"), Some("plainValue"));
    assert_eq!(resolved.child_value("withDefault"), Some("default"));
}
