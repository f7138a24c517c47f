//! Build-model collaborators
//!
//! The session, project and execution a goal sees. Each is shared behind an
//! `Arc` and mutable through interior locks, so the harness can complete
//! stand-ins after they have been bound.

use harness_config::GoalDescriptor;
use harness_tree::ConfigNode;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Subdirectory of the basedir holding build output
pub const BUILD_DIRECTORY: &str = "target";

/// Subdirectory of the build directory holding compiled output
pub const OUTPUT_DIRECTORY: &str = "classes";

// ============================================================================
// Session
// ============================================================================

/// Simulated build session
#[derive(Debug, Default)]
pub struct Session {
    user_properties: RwLock<IndexMap<String, String>>,
    system_properties: RwLock<IndexMap<String, String>>,
    current_project: RwLock<Option<Arc<Project>>>,
}

impl Session {
    /// Create session with no properties
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With user property
    #[must_use]
    pub fn with_user_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_user_property(key, value);
        self
    }

    /// With system property
    #[must_use]
    pub fn with_system_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_system_property(key, value);
        self
    }

    /// User property (`-Dkey=value` on a real command line)
    #[must_use]
    pub fn user_property(&self, key: &str) -> Option<String> {
        self.user_properties.read().get(key).cloned()
    }

    /// Set user property
    pub fn set_user_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.user_properties.write().insert(key.into(), value.into());
    }

    /// Snapshot of the user properties
    #[must_use]
    pub fn user_properties(&self) -> IndexMap<String, String> {
        self.user_properties.read().clone()
    }

    /// System property
    #[must_use]
    pub fn system_property(&self, key: &str) -> Option<String> {
        self.system_properties.read().get(key).cloned()
    }

    /// Set system property
    pub fn set_system_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.system_properties.write().insert(key.into(), value.into());
    }

    /// Project being built
    #[must_use]
    pub fn current_project(&self) -> Option<Arc<Project>> {
        self.current_project.read().clone()
    }

    /// Set the project being built
    pub fn set_current_project(&self, project: Arc<Project>) {
        *self.current_project.write() = Some(project);
    }
}

// ============================================================================
// Project
// ============================================================================

#[derive(Debug, Default)]
struct ProjectModel {
    group_id: String,
    artifact_id: String,
    version: String,
    basedir: Option<PathBuf>,
    properties: IndexMap<String, String>,
}

/// Simulated project
#[derive(Debug, Default)]
pub struct Project {
    model: RwLock<ProjectModel>,
}

impl Project {
    /// Create project with no coordinates and no basedir
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With coordinates
    #[must_use]
    pub fn with_coordinates(
        self,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        {
            let mut model = self.model.write();
            model.group_id = group_id.into();
            model.artifact_id = artifact_id.into();
            model.version = version.into();
        }
        self
    }

    /// With basedir
    #[must_use]
    pub fn with_basedir(self, basedir: impl Into<PathBuf>) -> Self {
        self.set_basedir(basedir);
        self
    }

    /// With property
    #[must_use]
    pub fn with_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Group id
    #[must_use]
    pub fn group_id(&self) -> String {
        self.model.read().group_id.clone()
    }

    /// Artifact id
    #[must_use]
    pub fn artifact_id(&self) -> String {
        self.model.read().artifact_id.clone()
    }

    /// Version
    #[must_use]
    pub fn version(&self) -> String {
        self.model.read().version.clone()
    }

    /// Project base directory
    #[must_use]
    pub fn basedir(&self) -> Option<PathBuf> {
        self.model.read().basedir.clone()
    }

    /// Set the project base directory
    pub fn set_basedir(&self, basedir: impl Into<PathBuf>) {
        self.model.write().basedir = Some(basedir.into());
    }

    /// `<basedir>/target`
    #[must_use]
    pub fn build_directory(&self) -> Option<PathBuf> {
        self.basedir().map(|basedir| basedir.join(BUILD_DIRECTORY))
    }

    /// `<basedir>/target/classes`
    #[must_use]
    pub fn output_directory(&self) -> Option<PathBuf> {
        self.build_directory().map(|build| build.join(OUTPUT_DIRECTORY))
    }

    /// Project property
    #[must_use]
    pub fn property(&self, key: &str) -> Option<String> {
        self.model.read().properties.get(key).cloned()
    }

    /// Set project property
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.model.write().properties.insert(key.into(), value.into());
    }

    /// Snapshot of the project properties
    #[must_use]
    pub fn properties(&self) -> IndexMap<String, String> {
        self.model.read().properties.clone()
    }

    /// Whether `path` lies inside the project base directory
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.basedir().is_some_and(|basedir| path.starts_with(basedir))
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Simulated goal execution
#[derive(Debug, Default)]
pub struct Execution {
    goal: RwLock<Option<GoalDescriptor>>,
    configuration: RwLock<Option<ConfigNode>>,
}

impl Execution {
    /// Create execution with no goal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execution of `goal` with its default configuration
    #[must_use]
    pub fn for_goal(goal: GoalDescriptor) -> Self {
        let execution = Self::new();
        execution.set_configuration(goal.default_configuration());
        execution.set_goal(goal);
        execution
    }

    /// Goal being executed
    #[must_use]
    pub fn goal(&self) -> Option<GoalDescriptor> {
        self.goal.read().clone()
    }

    /// Name of the goal being executed
    #[must_use]
    pub fn goal_name(&self) -> Option<String> {
        self.goal.read().as_ref().map(|goal| goal.goal().to_owned())
    }

    /// Set the goal being executed
    pub fn set_goal(&self, goal: GoalDescriptor) {
        *self.goal.write() = Some(goal);
    }

    /// Configuration of this execution
    #[must_use]
    pub fn configuration(&self) -> Option<ConfigNode> {
        self.configuration.read().clone()
    }

    /// Set the configuration of this execution
    pub fn set_configuration(&self, configuration: ConfigNode) {
        *self.configuration.write() = Some(configuration);
    }
}
