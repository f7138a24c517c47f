//! Per-test specification

use harness_config::ProjectSource;
use harness_inject::{ComponentRef, Project, Session};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type SessionHook = Box<dyn FnOnce(&Session) + Send>;
type ProjectHook = Box<dyn FnOnce(&Project) + Send>;

/// Collaborator supplied by a test
pub(crate) struct Provided {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) instance: ComponentRef,
    pub(crate) hint: String,
}

/// What a single test wants set up
///
/// ```
/// use harness_core::GoalTest;
///
/// let test = GoalTest::new("test:test-plugin:0.0.1-SNAPSHOT:parameters")
///     .project("file:projects/explicit/project.yaml")
///     .parameter("plain", "plainValue")
///     .parameter("withDefault", "withDefaultValue");
/// assert_eq!(test.parameters().count(), 2);
/// ```
pub struct GoalTest {
    pub(crate) goal: String,
    pub(crate) basedir: Option<String>,
    pub(crate) project: ProjectSource,
    pub(crate) parameters: Vec<(String, String)>,
    pub(crate) provided: Vec<Provided>,
    pub(crate) session_hooks: Vec<SessionHook>,
    pub(crate) project_hooks: Vec<ProjectHook>,
}

impl fmt::Debug for GoalTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalTest")
            .field("goal", &self.goal)
            .field("basedir", &self.basedir)
            .field("project", &self.project)
            .field("parameters", &self.parameters)
            .field(
                "provided",
                &self.provided.iter().map(|p| p.type_name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl GoalTest {
    /// Test of `goal`: `group:artifact:version:goal` or a goal name of the loaded plugin
    #[must_use]
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            basedir: None,
            project: ProjectSource::Default,
            parameters: Vec::new(),
            provided: Vec::new(),
            session_hooks: Vec::new(),
            project_hooks: Vec::new(),
        }
    }

    /// With basedir; `${basedir}` stands for the harness default
    #[inline]
    #[must_use]
    pub fn basedir(mut self, basedir: impl Into<String>) -> Self {
        self.basedir = Some(basedir.into());
        self
    }

    /// With project document
    #[inline]
    #[must_use]
    pub fn project(mut self, source: impl Into<ProjectSource>) -> Self {
        self.project = source.into();
        self
    }

    /// With parameter override; only the first value given for a name counts
    #[inline]
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// With real collaborator under the default hint
    #[must_use]
    pub fn provide<T: Any + Send + Sync>(self, instance: Arc<T>) -> Self {
        self.provide_named(instance, harness_config::descriptor::DEFAULT_HINT)
    }

    /// With real collaborator under `hint`
    #[must_use]
    pub fn provide_named<T: Any + Send + Sync>(mut self, instance: Arc<T>, hint: impl Into<String>) -> Self {
        self.provided.push(Provided {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            instance,
            hint: hint.into(),
        });
        self
    }

    /// With hook run on the session before configuration
    #[must_use]
    pub fn with_session<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        self.session_hooks.push(Box::new(hook));
        self
    }

    /// With hook run on the project before configuration
    #[must_use]
    pub fn with_project<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Project) + Send + 'static,
    {
        self.project_hooks.push(Box::new(hook));
        self
    }

    /// Goal reference
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Parameter overrides in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
