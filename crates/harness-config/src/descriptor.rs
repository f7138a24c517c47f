//! Plugin descriptor model
//!
//! A descriptor declares a plugin's coordinates, the components it
//! contributes and, for each goal, the parameters the goal accepts.
//! Everything here is immutable once loaded.

use crate::error::DescriptorError;
use harness_tree::document::scalar_text;
use harness_tree::ConfigNode;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// Role under which goals are registered with a container
pub const GOAL_ROLE: &str = "goal";

/// Role hint used when a component declares none
pub const DEFAULT_HINT: &str = "default";

/// Attribute carrying an implementation hint on configuration nodes
pub const IMPLEMENTATION_ATTRIBUTE: &str = "implementation";

/// Attribute carrying the declared default when an expression is also declared
pub const DEFAULT_VALUE_ATTRIBUTE: &str = "default-value";

// ============================================================================
// Parameters
// ============================================================================

/// Declared goal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    name: String,
    alias: Option<String>,
    type_name: Option<String>,
    required: bool,
    editable: bool,
    implementation: Option<String>,
    expression: Option<String>,
    default_value: Option<String>,
    description: Option<String>,
}

impl ParameterSpec {
    /// Create parameter with a primary name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            type_name: None,
            required: false,
            editable: true,
            implementation: None,
            expression: None,
            default_value: None,
            description: None,
        }
    }

    /// With alternate name
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// With declared type name
    #[inline]
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// With required flag
    #[inline]
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// With editable flag
    #[inline]
    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// With implementation hint
    #[inline]
    #[must_use]
    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(implementation.into());
        self
    }

    /// With property expression
    #[inline]
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// With default value
    #[inline]
    #[must_use]
    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Primary name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternate name
    #[inline]
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Declared type name
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Whether a value must be supplied
    #[inline]
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Whether the value may be set directly in configuration
    #[inline]
    #[must_use]
    pub fn editable(&self) -> bool {
        self.editable
    }

    /// Implementation hint
    #[inline]
    #[must_use]
    pub fn implementation(&self) -> Option<&str> {
        self.implementation.as_deref()
    }

    /// Property expression
    #[inline]
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Default value
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True when `name` is the primary name or the alias
    #[inline]
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }

    /// Default configuration node for this parameter
    ///
    /// `None` when neither an expression nor a default is declared.
    #[must_use]
    pub fn default_node(&self) -> Option<ConfigNode> {
        let value = self.expression.as_ref().or(self.default_value.as_ref())?;
        let mut node = ConfigNode::new(&self.name).with_value(value.clone());
        if let (Some(_), Some(default)) = (&self.expression, &self.default_value) {
            node.set_attribute(DEFAULT_VALUE_ATTRIBUTE, default.clone());
        }
        if let Some(implementation) = &self.implementation {
            node.set_attribute(IMPLEMENTATION_ATTRIBUTE, implementation.clone());
        }
        Some(node)
    }
}

// ============================================================================
// Components
// ============================================================================

/// Component contributed by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentDescriptor {
    role: String,
    role_hint: String,
    implementation: String,
}

impl ComponentDescriptor {
    /// Create descriptor under the default hint
    #[inline]
    #[must_use]
    pub fn new(role: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            role_hint: DEFAULT_HINT.to_owned(),
            implementation: implementation.into(),
        }
    }

    /// With role hint
    #[inline]
    #[must_use]
    pub fn with_role_hint(mut self, role_hint: impl Into<String>) -> Self {
        self.role_hint = role_hint.into();
        self
    }

    /// Role the component answers to
    #[inline]
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Hint distinguishing components of the same role
    #[inline]
    #[must_use]
    pub fn role_hint(&self) -> &str {
        &self.role_hint
    }

    /// Implementation name
    #[inline]
    #[must_use]
    pub fn implementation(&self) -> &str {
        &self.implementation
    }
}

// ============================================================================
// Goals
// ============================================================================

/// Plugin coordinates shared by every goal of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PluginKey {
    /// Group id
    pub group_id: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
}

impl PluginKey {
    /// Create plugin key
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl Display for PluginKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Declared goal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDescriptor {
    plugin: PluginKey,
    goal: String,
    implementation: String,
    description: Option<String>,
    parameters: Vec<ParameterSpec>,
}

impl GoalDescriptor {
    /// Create goal descriptor
    #[must_use]
    pub fn new(plugin: PluginKey, goal: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            plugin,
            goal: goal.into(),
            implementation: implementation.into(),
            description: None,
            parameters: Vec::new(),
        }
    }

    /// With parameter appended
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Goal name
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Implementation name
    #[inline]
    #[must_use]
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Description
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Owning plugin
    #[inline]
    #[must_use]
    pub fn plugin(&self) -> &PluginKey {
        &self.plugin
    }

    /// Parameters in declaration order
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Parameter by primary name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Fully qualified lookup key (`group:artifact:version:goal`)
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.plugin, self.goal)
    }

    /// Configuration built from the declared expressions and defaults
    ///
    /// One child per parameter that declares an expression or a default,
    /// in declaration order.
    #[must_use]
    pub fn default_configuration(&self) -> ConfigNode {
        self.parameters
            .iter()
            .filter_map(ParameterSpec::default_node)
            .fold(ConfigNode::new("configuration"), ConfigNode::with_child)
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Loaded plugin descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    key: PluginKey,
    goal_prefix: Option<String>,
    components: Vec<ComponentDescriptor>,
    goals: Vec<GoalDescriptor>,
}

impl PluginDescriptor {
    /// Create descriptor with no components and no goals
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: PluginKey::new(group_id, artifact_id, version),
            goal_prefix: None,
            components: Vec::new(),
            goals: Vec::new(),
        }
    }

    /// With goal prefix
    #[inline]
    #[must_use]
    pub fn with_goal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.goal_prefix = Some(prefix.into());
        self
    }

    /// With declared component
    #[inline]
    #[must_use]
    pub fn with_component(mut self, component: ComponentDescriptor) -> Self {
        self.components.push(component);
        self
    }

    /// With goal
    ///
    /// The goal is re-keyed onto this plugin's coordinates.
    #[inline]
    #[must_use]
    pub fn with_goal(mut self, mut goal: GoalDescriptor) -> Self {
        goal.plugin = self.key.clone();
        self.goals.push(goal);
        self
    }

    /// Plugin coordinates
    #[inline]
    #[must_use]
    pub fn key(&self) -> &PluginKey {
        &self.key
    }

    /// Group id
    #[inline]
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.key.group_id
    }

    /// Artifact id
    #[inline]
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.key.artifact_id
    }

    /// Version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.key.version
    }

    /// Goal prefix
    #[inline]
    #[must_use]
    pub fn goal_prefix(&self) -> Option<&str> {
        self.goal_prefix.as_deref()
    }

    /// Components declared explicitly by the document
    #[inline]
    #[must_use]
    pub fn declared_components(&self) -> &[ComponentDescriptor] {
        &self.components
    }

    /// Every component the plugin contributes
    ///
    /// Declared components first, then one [`GOAL_ROLE`] component per goal
    /// hinted by its fully qualified key.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentDescriptor> {
        self.components
            .iter()
            .cloned()
            .chain(self.goals.iter().map(|goal| {
                ComponentDescriptor::new(GOAL_ROLE, goal.implementation()).with_role_hint(goal.key())
            }))
            .collect()
    }

    /// Goals in declaration order
    #[inline]
    #[must_use]
    pub fn goals(&self) -> &[GoalDescriptor] {
        &self.goals
    }

    /// Goal by name
    #[must_use]
    pub fn goal(&self, name: &str) -> Option<&GoalDescriptor> {
        self.goals.iter().find(|g| g.goal == name)
    }

    /// Goal whose implementation matches
    #[must_use]
    pub fn goal_by_implementation(&self, implementation: &str) -> Option<&GoalDescriptor> {
        self.goals.iter().find(|g| g.implementation == implementation)
    }

    /// Parameters per goal, both in declaration order
    #[must_use]
    pub fn parameters(&self) -> IndexMap<&str, &[ParameterSpec]> {
        self.goals
            .iter()
            .map(|g| (g.goal.as_str(), g.parameters.as_slice()))
            .collect()
    }
}

// ============================================================================
// Document form
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlugin {
    #[serde(deserialize_with = "scalar")]
    group_id: String,
    #[serde(deserialize_with = "scalar")]
    artifact_id: String,
    #[serde(deserialize_with = "scalar")]
    version: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    goal_prefix: Option<String>,
    #[serde(default)]
    components: Vec<RawComponent>,
    #[serde(default)]
    goals: Vec<RawGoal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponent {
    role: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    role_hint: Option<String>,
    implementation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGoal {
    #[serde(deserialize_with = "scalar")]
    goal: String,
    implementation: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameter {
    #[serde(deserialize_with = "scalar")]
    name: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    alias: Option<String>,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default = "editable_default")]
    editable: bool,
    #[serde(default)]
    implementation: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    expression: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    default_value: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    description: Option<String>,
}

fn editable_default() -> bool {
    true
}

/// Any scalar as text, so `version: 1.0` or `defaultValue: 8080` read as written
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_text(&value).ok_or_else(|| de::Error::custom(format!("expected a scalar, found {}", kind_of(&value))))
}

fn optional_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        value => scalar_text(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a scalar, found {}", kind_of(&value)))),
    }
}

fn kind_of(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Null => "null",
        _ => "a scalar",
    }
}

impl RawPlugin {
    /// Validate and convert into the public model
    pub(crate) fn into_descriptor(self, origin: &str) -> Result<PluginDescriptor, DescriptorError> {
        let mut descriptor = PluginDescriptor::new(self.group_id, self.artifact_id, self.version);
        descriptor.goal_prefix = self.goal_prefix;
        descriptor.components = self
            .components
            .into_iter()
            .map(|c| ComponentDescriptor {
                role: c.role,
                role_hint: c.role_hint.unwrap_or_else(|| DEFAULT_HINT.to_owned()),
                implementation: c.implementation,
            })
            .collect();

        let mut goal_names = HashSet::new();
        for raw in self.goals {
            if !goal_names.insert(raw.goal.clone()) {
                return Err(DescriptorError::parse(
                    origin,
                    format!("goal '{}' is declared twice", raw.goal),
                ));
            }
            let goal = raw.into_goal(descriptor.key.clone(), origin)?;
            descriptor.goals.push(goal);
        }
        Ok(descriptor)
    }
}

impl RawGoal {
    fn into_goal(self, plugin: PluginKey, origin: &str) -> Result<GoalDescriptor, DescriptorError> {
        let mut seen = HashSet::new();
        let mut parameters = Vec::with_capacity(self.parameters.len());
        for raw in self.parameters {
            if !seen.insert(raw.name.clone()) {
                return Err(DescriptorError::parse(
                    origin,
                    format!("goal '{}' declares parameter '{}' twice", self.goal, raw.name),
                ));
            }
            parameters.push(ParameterSpec {
                name: raw.name,
                alias: raw.alias,
                type_name: raw.type_name,
                required: raw.required,
                editable: raw.editable,
                implementation: raw.implementation,
                expression: raw.expression,
                default_value: raw.default_value,
                description: raw.description,
            });
        }
        Ok(GoalDescriptor {
            plugin,
            goal: self.goal,
            implementation: self.implementation,
            description: self.description,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> PluginDescriptor {
        PluginDescriptor::new("g", "a", "1.0")
            .with_component(ComponentDescriptor::new("helper", "HelperImpl"))
            .with_goal(
                GoalDescriptor::new(PluginKey::default(), "build", "BuildGoal")
                    .with_parameter(ParameterSpec::new("outDir").with_default_value("target"))
                    .with_parameter(
                        ParameterSpec::new("withProperty")
                            .with_expression("${property}")
                            .with_default_value("fallback"),
                    )
                    .with_parameter(ParameterSpec::new("plain")),
            )
    }

    #[test]
    fn goal_components_use_qualified_hint() {
        let components = sample().components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].role_hint(), DEFAULT_HINT);
        assert_eq!(components[1].role(), GOAL_ROLE);
        assert_eq!(components[1].role_hint(), "g:a:1.0:build");
        assert_eq!(components[1].implementation(), "BuildGoal");
    }

    #[test]
    fn default_configuration_values() {
        let plugin = sample();
        let defaults = plugin.goal("build").unwrap().default_configuration();
        assert_eq!(defaults.child_count(), 2);
        assert_eq!(defaults.child_value("outDir"), Some("target"));

        let with_property = defaults.child("withProperty").unwrap();
        assert_eq!(with_property.value(), Some("${property}"));
        assert_eq!(with_property.attribute(DEFAULT_VALUE_ATTRIBUTE), Some("fallback"));
        assert!(defaults.child("plain").is_none());
    }

    #[test]
    fn implementation_hint_becomes_attribute() {
        let spec = ParameterSpec::new("helper")
            .with_expression("${helper}")
            .with_implementation("HelperImpl");
        let node = spec.default_node().unwrap();
        assert_eq!(node.attribute(IMPLEMENTATION_ATTRIBUTE), Some("HelperImpl"));
        assert!(node.attribute(DEFAULT_VALUE_ATTRIBUTE).is_none());
    }

    #[test]
    fn parameters_map_per_goal() {
        let plugin = sample();
        let parameters = plugin.parameters();
        let names: Vec<_> = parameters["build"].iter().map(ParameterSpec::name).collect();
        assert_eq!(names, vec!["outDir", "withProperty", "plain"]);
    }

    #[test]
    fn with_goal_rekeys_onto_plugin() {
        let plugin = sample();
        assert_eq!(plugin.goal("build").unwrap().key(), "g:a:1.0:build");
        assert!(plugin.goal_by_implementation("BuildGoal").is_some());
        assert!(plugin.goal_by_implementation("Other").is_none());
    }

    #[test]
    fn alias_matching() {
        let spec = ParameterSpec::new("outputDirectory").with_alias("outDir");
        assert!(spec.answers_to("outDir"));
        assert!(spec.answers_to("outputDirectory"));
        assert!(!spec.answers_to("dir"));
    }
}
