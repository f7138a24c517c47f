//! YAML document conversion
//!
//! Maps YAML onto [`ConfigNode`] trees:
//! - Mapping keys become children, `@key` entries become attributes
//! - `$value` supplies the node's own text
//! - Sequences under `k` become children named after the singular of `k`
//! - Scalars become text; `null` leaves the value absent

use crate::error::TreeError;
use crate::node::ConfigNode;
use serde_yaml::Value;
use std::borrow::Cow;
use tracing::trace;

const ATTRIBUTE_PREFIX: char = '@';
const VALUE_KEY: &str = "$value";

/// Parse YAML text into a tree rooted at `root_name`
///
/// Empty documents yield an empty root node.
///
/// # Errors
/// Returns [`TreeError::Yaml`] when the text is not valid YAML,
/// [`TreeError::InvalidRoot`] when the top level is not a mapping, and the
/// structural variants when a key or attribute cannot be represented.
pub fn from_yaml_str(root_name: &str, text: &str) -> Result<ConfigNode, TreeError> {
    if text.trim().is_empty() {
        return Ok(ConfigNode::new(root_name));
    }
    let value: Value = serde_yaml::from_str(text)?;
    match &value {
        Value::Mapping(_) | Value::Tagged(_) => from_yaml_value(root_name, &value),
        Value::Null => Ok(ConfigNode::new(root_name)),
        Value::Sequence(_) => Err(TreeError::InvalidRoot("a sequence")),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Err(TreeError::InvalidRoot("a scalar")),
    }
}

/// Convert an already parsed YAML value into a tree named `name`
///
/// # Errors
/// Returns [`TreeError::InvalidKey`] for non-scalar mapping keys and
/// [`TreeError::NonScalarAttribute`] for `@` entries holding collections.
pub fn from_yaml_value(name: &str, value: &Value) -> Result<ConfigNode, TreeError> {
    let mut node = ConfigNode::new(name);
    match value {
        Value::Mapping(mapping) => {
            for (key, entry) in mapping {
                let key = scalar_text(key).ok_or_else(|| TreeError::InvalidKey {
                    node: name.to_owned(),
                })?;

                if key == VALUE_KEY {
                    node.set_value(scalar_text(entry));
                } else if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    if is_collection(entry) {
                        return Err(TreeError::non_scalar_attribute(name, attribute));
                    }
                    if let Some(text) = scalar_text(entry) {
                        node.set_attribute(attribute, text);
                    }
                } else {
                    node.add_child(from_yaml_value(&key, entry)?);
                }
            }
        }
        Value::Sequence(items) => {
            let item_name = singular(name);
            trace!(node = name, item = %item_name, count = items.len(), "converting sequence");
            for item in items {
                node.add_child(from_yaml_value(&item_name, item)?);
            }
        }
        Value::Tagged(tagged) => return from_yaml_value(name, &tagged.value),
        scalar => node.set_value(scalar_text(scalar)),
    }
    Ok(node)
}

/// Element name used for the items of a sequence named `plural`
///
/// # Examples
/// ```
/// use harness_tree::document::singular;
/// assert_eq!(singular("plugins"), "plugin");
/// assert_eq!(singular("entries"), "entry");
/// assert_eq!(singular("configuration"), "configuration");
/// ```
#[must_use]
pub fn singular(plural: &str) -> Cow<'_, str> {
    if let Some(stem) = plural.strip_suffix("ies").filter(|s| !s.is_empty()) {
        return Cow::Owned(format!("{stem}y"));
    }
    match plural.strip_suffix('s').filter(|s| !s.is_empty()) {
        Some(stem) => Cow::Borrowed(stem),
        None => Cow::Borrowed(plural),
    }
}

fn is_collection(value: &Value) -> bool {
    matches!(value, Value::Mapping(_) | Value::Sequence(_))
}

/// Text form of a scalar, `None` for null and collections
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Mapping(_) | Value::Sequence(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars_become_values() {
        let node = from_yaml_str(
            "configuration",
            "plain: text\nflag: true\ncount: 3\nnothing: ~\n",
        )
        .unwrap();
        assert_eq!(node.child_value("plain"), Some("text"));
        assert_eq!(node.child_value("flag"), Some("true"));
        assert_eq!(node.child_value("count"), Some("3"));
        assert!(node.child("nothing").unwrap().value().is_none());
    }

    #[test]
    fn attributes_and_value_key() {
        let node = from_yaml_str(
            "configuration",
            "param:\n  '@implementation': Foo\n  '$value': bar\n",
        )
        .unwrap();
        let param = node.child("param").unwrap();
        assert_eq!(param.attribute("implementation"), Some("Foo"));
        assert_eq!(param.value(), Some("bar"));
        assert_eq!(param.child_count(), 0);
    }

    #[test]
    fn sequences_use_singular_names() {
        let node = from_yaml_str("project", "plugins:\n  - artifactId: a\n  - artifactId: b\n").unwrap();
        let plugins = node.child("plugins").unwrap();
        let names: Vec<_> = plugins.children().iter().map(ConfigNode::name).collect();
        assert_eq!(names, vec!["plugin", "plugin"]);
        assert_eq!(plugins.children()[1].child_value("artifactId"), Some("b"));
    }

    #[test]
    fn ies_plural() {
        let node = from_yaml_str("c", "entries: [x, y]\n").unwrap();
        assert_eq!(node.child("entries").unwrap().children()[0].name(), "entry");
    }

    #[test]
    fn empty_text_is_empty_root() {
        let node = from_yaml_str("configuration", "  \n").unwrap();
        assert!(node.is_empty());
        assert_eq!(node.name(), "configuration");
    }

    #[test]
    fn malformed_yaml_is_error() {
        let err = from_yaml_str("c", "a: [unclosed\n").unwrap_err();
        assert!(matches!(err, TreeError::Yaml(_)));
    }

    #[test]
    fn non_mapping_root_is_error() {
        assert!(matches!(from_yaml_str("c", "- a\n- b\n"), Err(TreeError::InvalidRoot(_))));
        assert!(matches!(from_yaml_str("c", "just text"), Err(TreeError::InvalidRoot(_))));
        assert!(from_yaml_str("c", "~").unwrap().is_empty());
    }

    #[test]
    fn collection_attribute_is_error() {
        let err = from_yaml_str("c", "p:\n  '@implementation': [a]\n").unwrap_err();
        assert!(matches!(err, TreeError::NonScalarAttribute { .. }));
    }

    #[test]
    fn collection_key_is_error() {
        let err = from_yaml_str("c", "? [a, b]\n: value\n").unwrap_err();
        assert!(matches!(err, TreeError::InvalidKey { .. }));
    }

    #[test]
    fn singular_rules() {
        assert_eq!(singular("plugins"), "plugin");
        assert_eq!(singular("properties"), "property");
        assert_eq!(singular("items"), "item");
        assert_eq!(singular("s"), "s");
        assert_eq!(singular("list"), "list");
    }
}
