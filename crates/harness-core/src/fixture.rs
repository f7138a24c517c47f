//! Live goal fixture
//!
//! A [`Fixture`] owns everything set up for one test: the open scopes, the
//! container, the resolved configuration and the configured goal. Scopes
//! are closed by [`Fixture::teardown`], or on drop when nobody did.

use crate::basedir::Basedir;
use crate::error::FixtureError;
use crate::state::{validate_transition, FixtureState};
use harness_config::{GoalCoordinate, GoalDescriptor, PluginDescriptor};
use harness_inject::{
    AsAny, Binding, Container, ContainerExt, DefaultContainer, Execution, Goal, GoalInstance, GoalLog, LookupError,
    Project, ScopeError, ScopeStack, Session,
};
use harness_tree::ConfigNode;
use std::any::Any;
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;

/// Identifier of one fixture, for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(Ulid);

impl FixtureId {
    /// Create new unique id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FixtureId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for FixtureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collaborators the goal was wired with
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Build session
    pub session: Binding<Session>,
    /// Project under build
    pub project: Binding<Project>,
    /// Execution of the goal
    pub execution: Binding<Execution>,
    /// Log handed to the goal
    pub log: Binding<GoalLog>,
}

/// Configured goal with its scopes and collaborators
pub struct Fixture {
    pub(crate) id: FixtureId,
    pub(crate) state: FixtureState,
    pub(crate) basedir: Basedir,
    pub(crate) scopes: ScopeStack,
    pub(crate) container: Arc<DefaultContainer>,
    pub(crate) descriptor: PluginDescriptor,
    pub(crate) coordinate: GoalCoordinate,
    pub(crate) goal_descriptor: Option<GoalDescriptor>,
    pub(crate) goal: GoalInstance,
    pub(crate) configuration: ConfigNode,
    pub(crate) collaborators: Collaborators,
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("goal", &self.coordinate.to_string())
            .field("implementation", &self.goal.implementation)
            .field("basedir", &self.basedir.path)
            .finish_non_exhaustive()
    }
}

impl Fixture {
    /// Fixture id
    #[inline]
    #[must_use]
    pub fn id(&self) -> FixtureId {
        self.id
    }

    /// Lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> FixtureState {
        self.state
    }

    /// Test base directory
    #[inline]
    #[must_use]
    pub fn basedir(&self) -> &Path {
        &self.basedir.path
    }

    /// Whether the test chose the basedir
    #[inline]
    #[must_use]
    pub fn basedir_is_explicit(&self) -> bool {
        self.basedir.explicit
    }

    /// Goal under test
    ///
    /// # Errors
    /// Returns [`FixtureError::GoalType`] when the goal is not a `G`.
    pub fn goal<G: Goal + 'static>(&self) -> Result<&G, FixtureError> {
        let implementation = &self.goal.implementation;
        (*self.goal.goal)
            .as_any()
            .downcast_ref::<G>()
            .ok_or_else(|| goal_type::<G>(implementation))
    }

    /// Goal under test, mutably
    ///
    /// # Errors
    /// As [`Fixture::goal`].
    pub fn goal_mut<G: Goal + 'static>(&mut self) -> Result<&mut G, FixtureError> {
        let implementation = &self.goal.implementation;
        (*self.goal.goal)
            .as_any_mut()
            .downcast_mut::<G>()
            .ok_or_else(|| goal_type::<G>(implementation))
    }

    /// Goal under test as a trait object
    #[inline]
    #[must_use]
    pub fn goal_dyn(&self) -> &dyn Goal {
        &*self.goal.goal
    }

    /// Goal under test as a mutable trait object
    #[inline]
    pub fn goal_dyn_mut(&mut self) -> &mut dyn Goal {
        &mut *self.goal.goal
    }

    /// Implementation name the goal was created from
    #[inline]
    #[must_use]
    pub fn implementation(&self) -> &str {
        &self.goal.implementation
    }

    /// Run the goal
    ///
    /// # Errors
    /// Returns the goal's own failure, or an illegal transition when the
    /// fixture is not configured.
    pub fn execute(&mut self) -> anyhow::Result<()> {
        validate_transition(self.state, FixtureState::Executed)?;
        debug!(fixture = %self.id, goal = %self.coordinate, "executing goal");
        let outcome = self.goal.goal.execute();
        self.state = FixtureState::Executed;
        outcome
    }

    /// Build session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.collaborators.session.instance
    }

    /// Project under build
    #[inline]
    #[must_use]
    pub fn project(&self) -> &Arc<Project> {
        &self.collaborators.project.instance
    }

    /// Execution of the goal
    #[inline]
    #[must_use]
    pub fn execution(&self) -> &Arc<Execution> {
        &self.collaborators.execution.instance
    }

    /// Log handed to the goal
    #[inline]
    #[must_use]
    pub fn log(&self) -> &GoalLog {
        &self.collaborators.log.instance
    }

    /// Collaborators with their provenance
    #[inline]
    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Configuration the goal was bound from
    #[inline]
    #[must_use]
    pub fn resolved_configuration(&self) -> &ConfigNode {
        &self.configuration
    }

    /// Loaded plugin descriptor
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Descriptor of the goal under test, when the plugin declares it
    #[inline]
    #[must_use]
    pub fn goal_descriptor(&self) -> Option<&GoalDescriptor> {
        self.goal_descriptor.as_ref()
    }

    /// Address of the goal under test
    #[inline]
    #[must_use]
    pub fn coordinate(&self) -> &GoalCoordinate {
        &self.coordinate
    }

    /// Container the goal was created by
    #[inline]
    #[must_use]
    pub fn container(&self) -> &Arc<DefaultContainer> {
        &self.container
    }

    /// Scopes of this fixture
    #[inline]
    #[must_use]
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Look up a collaborator, open scopes first, then the container
    ///
    /// # Errors
    /// Returns the container's [`LookupError`] when neither has one.
    pub fn lookup<T: Any + Send + Sync>(&self) -> Result<Arc<T>, LookupError> {
        match self.scopes.lookup::<T>() {
            Some(instance) => Ok(instance),
            None => self.container.lookup_default::<T>(),
        }
    }

    /// Look up a component by hint in the container
    ///
    /// # Errors
    /// As [`ContainerExt::lookup`].
    pub fn lookup_named<T: Any + Send + Sync>(&self, hint: &str) -> Result<Arc<T>, LookupError> {
        self.container.lookup::<T>(hint)
    }

    /// Whether the container can provide a `T` under `hint`
    #[must_use]
    pub fn has_component<T: Any + Send + Sync>(&self, hint: &str) -> bool {
        self.container.has_component(std::any::TypeId::of::<T>(), hint)
    }

    /// Close the scopes
    ///
    /// # Errors
    /// Returns [`FixtureError::IllegalTransition`] on a second teardown and
    /// [`FixtureError::Teardown`] when a scope failed to close.
    pub fn teardown(&mut self) -> Result<(), FixtureError> {
        validate_transition(self.state, FixtureState::TornDown)?;
        let errors = self.close();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FixtureError::Teardown { errors })
        }
    }

    /// Close the scopes and mark the fixture torn down
    pub(crate) fn close(&mut self) -> Vec<ScopeError> {
        let errors = close_scopes(&self.scopes, self.id);
        debug!(fixture = %self.id, from = %self.state, failures = errors.len(), "fixture torn down");
        self.state = FixtureState::TornDown;
        errors
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if self.state != FixtureState::TornDown {
            self.close();
        }
    }
}

fn goal_type<G: 'static>(implementation: &str) -> FixtureError {
    FixtureError::GoalType {
        expected: std::any::type_name::<G>(),
        actual: implementation.to_owned(),
    }
}

/// Close whatever scopes are open, innermost first
///
/// Every open scope gets its exit attempt even when an earlier one fails.
pub(crate) fn close_scopes(scopes: &ScopeStack, id: FixtureId) -> Vec<ScopeError> {
    let mut errors = Vec::new();
    if scopes.execution().is_open() {
        if let Err(err) = scopes.exit_execution() {
            warn!(fixture = %id, error = %err, "closing execution scope failed");
            errors.push(err);
        }
    }
    if scopes.session().is_open() {
        if let Err(err) = scopes.exit_session() {
            warn!(fixture = %id, error = %err, "closing session scope failed");
            errors.push(err);
        }
    }
    errors
}
