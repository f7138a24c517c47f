//! Three-tier configuration resolution
//!
//! Precedence, strongest first:
//! 1. Per-test overrides
//! 2. Configuration declared for the plugin in the project document
//! 3. Expressions and defaults declared by the goal descriptor
//!
//! Tiers 1 and 2 merge into the explicit tier. When the goal's parameters are
//! known, each parameter is then looked up in the explicit tier by name, or by
//! alias when the name is absent, and merged over its descriptor default.

use crate::coordinate::GoalCoordinate;
use crate::descriptor::{GoalDescriptor, IMPLEMENTATION_ATTRIBUTE};
use crate::project::ProjectDocument;
use harness_tree::{merge, ConfigNode};
use tracing::{debug, trace};

const CONFIGURATION: &str = "configuration";

/// Resolves the configuration a goal is bound with
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the override tier from ordered `(name, value)` pairs
    #[must_use]
    pub fn override_node<'a, I>(&self, overrides: I) -> ConfigNode
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        overrides
            .into_iter()
            .fold(ConfigNode::new(CONFIGURATION), |node, (name, value)| {
                node.with_child(ConfigNode::new(name).with_value(value))
            })
    }

    /// Merge the override tier over the project-declared tier
    #[must_use]
    pub fn explicit_tier(&self, overrides: &ConfigNode, project_declared: &ConfigNode) -> ConfigNode {
        merge(Some(overrides), Some(project_declared), false)
            .unwrap_or_else(|| ConfigNode::new(CONFIGURATION))
            .renamed(CONFIGURATION)
    }

    /// Combine the explicit tier with the goal's declared parameters
    ///
    /// Children follow the descriptor's parameter order and carry the
    /// parameter's primary name. Explicit children that match no parameter
    /// are dropped.
    #[must_use]
    pub fn finalize(&self, explicit: &ConfigNode, goal: &GoalDescriptor) -> ConfigNode {
        let defaults = goal.default_configuration();
        let mut resolved = ConfigNode::new(CONFIGURATION);

        for spec in goal.parameters() {
            let declared = explicit
                .child(spec.name())
                .or_else(|| spec.alias().and_then(|alias| explicit.child(alias)));
            let default = defaults.child(spec.name());

            let Some(merged) = merge(declared, default, true) else {
                continue;
            };
            let mut node = if merged.name() == spec.name() {
                merged
            } else {
                trace!(alias = merged.name(), parameter = spec.name(), "configured through alias");
                merged.renamed(spec.name())
            };

            let has_implementation = node
                .attribute(IMPLEMENTATION_ATTRIBUTE)
                .is_some_and(|value| !value.is_empty());
            if let (false, Some(implementation)) = (has_implementation, spec.implementation()) {
                node.set_attribute(IMPLEMENTATION_ATTRIBUTE, implementation);
            }
            resolved.add_child(node);
        }
        resolved
    }

    /// Resolve a goal's configuration for a test
    ///
    /// Without a goal descriptor the explicit tier is used as is.
    #[must_use]
    pub fn resolve<'a, I>(
        &self,
        coordinate: &GoalCoordinate,
        document: &ProjectDocument,
        overrides: I,
        goal: Option<&GoalDescriptor>,
    ) -> ConfigNode
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let project_declared = document.plugin_configuration(&coordinate.artifact_id);
        let override_node = self.override_node(overrides);
        let explicit = self.explicit_tier(&override_node, &project_declared);

        let resolved = match goal {
            Some(goal) => self.finalize(&explicit, goal),
            None => explicit,
        };
        debug!(
            goal = %coordinate,
            overrides = override_node.child_count(),
            project = project_declared.child_count(),
            parameters = resolved.child_count(),
            "resolved goal configuration"
        );
        resolved
    }

    /// Configuration for an execution built outside any project document
    #[must_use]
    pub fn resolve_execution(&self, goal: &GoalDescriptor, execution_configuration: &ConfigNode) -> ConfigNode {
        self.finalize(execution_configuration, goal)
    }
}
