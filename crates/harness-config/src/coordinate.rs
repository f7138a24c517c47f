//! Goal coordinates
//!
//! A goal is addressed either by its bare name or by the fully qualified
//! `group:artifact:version:goal` form. Bare names borrow the remaining
//! coordinates from the plugin descriptor.

use crate::descriptor::PluginDescriptor;
use crate::error::DescriptorError;
use std::fmt::{self, Display, Formatter};

/// Fully qualified goal address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoalCoordinate {
    /// Group id
    pub group_id: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
    /// Goal name
    pub goal: String,
}

impl GoalCoordinate {
    /// Create coordinate from parts
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            goal: goal.into(),
        }
    }

    /// Complete a goal reference against a descriptor
    ///
    /// # Examples
    /// ```
    /// use harness_config::{GoalCoordinate, PluginDescriptor};
    ///
    /// let plugin = PluginDescriptor::new("g", "a", "1.0");
    /// let bare = GoalCoordinate::resolve("build", &plugin).unwrap();
    /// assert_eq!(bare.to_string(), "g:a:1.0:build");
    ///
    /// let qualified = GoalCoordinate::resolve("x:y:2.0:run", &plugin).unwrap();
    /// assert_eq!(qualified.artifact_id, "y");
    /// ```
    ///
    /// # Errors
    /// Returns [`DescriptorError::InvalidCoordinate`] for references that are
    /// neither bare nor fully qualified, or that contain an empty part.
    pub fn resolve(reference: &str, descriptor: &PluginDescriptor) -> Result<Self, DescriptorError> {
        let parts: Vec<&str> = reference.split(':').collect();
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(DescriptorError::InvalidCoordinate(reference.to_owned()));
        }
        match parts.as_slice() {
            [group_id, artifact_id, version, goal] => {
                Ok(Self::new(*group_id, *artifact_id, *version, *goal))
            }
            [goal] => Ok(Self::new(
                descriptor.group_id(),
                descriptor.artifact_id(),
                descriptor.version(),
                *goal,
            )),
            _ => Err(DescriptorError::InvalidCoordinate(reference.to_owned())),
        }
    }

    /// Whether this coordinate addresses a goal of `descriptor`
    #[must_use]
    pub fn belongs_to(&self, descriptor: &PluginDescriptor) -> bool {
        self.group_id == descriptor.group_id()
            && self.artifact_id == descriptor.artifact_id()
            && self.version == descriptor.version()
    }
}

impl Display for GoalCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.version, self.goal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_goal_uses_descriptor() {
        let plugin = PluginDescriptor::new("org.example", "demo-plugin", "0.1");
        let coordinate = GoalCoordinate::resolve("compile", &plugin).unwrap();
        assert_eq!(coordinate.to_string(), "org.example:demo-plugin:0.1:compile");
        assert!(coordinate.belongs_to(&plugin));
    }

    #[test]
    fn qualified_goal_kept_verbatim() {
        let plugin = PluginDescriptor::new("org.example", "demo-plugin", "0.1");
        let coordinate = GoalCoordinate::resolve("g:a:1.0:build", &plugin).unwrap();
        assert_eq!(coordinate, GoalCoordinate::new("g", "a", "1.0", "build"));
        assert!(!coordinate.belongs_to(&plugin));
    }

    #[test]
    fn partial_or_empty_references_rejected() {
        let plugin = PluginDescriptor::new("g", "a", "1");
        for reference in ["", "a:b", "a:b:c", "g::1:build", "a:b:c:d:e"] {
            assert!(
                matches!(
                    GoalCoordinate::resolve(reference, &plugin),
                    Err(DescriptorError::InvalidCoordinate(_))
                ),
                "{reference}"
            );
        }
    }
}
