//! Configuration tree nodes
//!
//! Provides [`ConfigNode`], the tree every configuration tier is expressed in.

use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};

/// Node of a parsed configuration document
///
/// Children are ordered and may repeat a name; single-value lookups by name
/// always return the first match. Attribute order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigNode {
    name: String,
    value: Option<String>,
    attributes: IndexMap<String, String>,
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Create empty node with a name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// With text value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// With attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// With child appended
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Copy of this node under a different name
    #[inline]
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut node = self.clone();
        node.name = name.into();
        node
    }

    /// Node name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text value, if any
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Replace the text value
    #[inline]
    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    /// Attribute by key
    #[inline]
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set (or replace) an attribute
    #[inline]
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Iterate attributes
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes
    #[inline]
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// All children, in document order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// First child with the given name
    #[inline]
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable first child with the given name
    #[inline]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ConfigNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Value of the first child with the given name
    #[inline]
    #[must_use]
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(ConfigNode::value)
    }

    /// All children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConfigNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a chain of first-match child names
    ///
    /// # Examples
    /// ```
    /// # use harness_tree::ConfigNode;
    /// let project = ConfigNode::new("project").with_child(
    ///     ConfigNode::new("build").with_child(ConfigNode::new("plugins")),
    /// );
    /// assert!(project.descend(&["build", "plugins"]).is_some());
    /// assert!(project.descend(&["build", "missing"]).is_none());
    /// ```
    #[must_use]
    pub fn descend(&self, path: &[&str]) -> Option<&ConfigNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Append a child
    #[inline]
    pub fn add_child(&mut self, child: ConfigNode) {
        self.children.push(child);
    }

    /// Number of children
    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// True when the node has no value, no attributes and no children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.attributes.is_empty() && self.children.is_empty()
    }

    fn write_indented(&self, f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        for (key, value) in &self.attributes {
            write!(f, " @{key}={value:?}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " = {value:?}")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for ConfigNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigNode {
        ConfigNode::new("configuration")
            .with_child(ConfigNode::new("item").with_value("first"))
            .with_child(ConfigNode::new("other").with_attribute("implementation", "Foo"))
            .with_child(ConfigNode::new("item").with_value("second"))
    }

    #[test]
    fn child_lookup_first_match_wins() {
        let node = sample();
        assert_eq!(node.child_value("item"), Some("first"));
        assert_eq!(node.children_named("item").count(), 2);
    }

    #[test]
    fn missing_child_is_none() {
        assert!(sample().child("absent").is_none());
    }

    #[test]
    fn empty_node() {
        assert!(ConfigNode::new("x").is_empty());
        assert!(!ConfigNode::new("x").with_value("").is_empty());
        assert!(!ConfigNode::new("x").with_attribute("a", "b").is_empty());
    }

    #[test]
    fn renamed_keeps_content() {
        let node = sample().renamed("params");
        assert_eq!(node.name(), "params");
        assert_eq!(node.child_count(), 3);
    }

    #[test]
    fn attribute_order_is_irrelevant_for_equality() {
        let a = ConfigNode::new("n").with_attribute("x", "1").with_attribute("y", "2");
        let b = ConfigNode::new("n").with_attribute("y", "2").with_attribute("x", "1");
        assert_eq!(a, b);
    }

    #[test]
    fn display_renders_tree() {
        let rendered = sample().to_string();
        assert!(rendered.starts_with("configuration\n"));
        assert!(rendered.contains("  item = \"first\""));
        assert!(rendered.contains("  other @implementation=\"Foo\""));
    }
}
