//! Goal harness
//!
//! [`GoalHarness::setup`] takes a [`GoalTest`] through the fixture protocol:
//!
//! 1. Resolve the basedir
//! 2. Open and seed the session and execution scopes
//! 3. Load the plugin descriptor and register its components
//! 4. Instantiate the goal under test
//! 5. Resolve its configuration
//! 6. Bind the configuration and hand the goal its log
//!
//! A failing step closes whatever scopes it opened. [`GoalHarness::run`]
//! additionally guarantees teardown after the test body, whether the body
//! returns, fails or panics.

use crate::basedir::{resolve_basedir, Basedir};
use crate::config::HarnessConfig;
use crate::error::FixtureError;
use crate::fixture::{close_scopes, Collaborators, Fixture, FixtureId};
use crate::state::{validate_transition, FixtureState};
use crate::test_spec::GoalTest;
use harness_config::descriptor::GOAL_ROLE;
use harness_config::{
    ConfigResolver, DescriptorError, DescriptorLoader, GoalCoordinate, GoalDescriptor, PluginDescriptor,
    ProjectDocument, ProjectLocation,
};
use harness_inject::{
    ensure_binding, Configurator, Container, ContextEvaluator, DefaultContainer, Execution, Factories,
    FallbackEvaluator, Goal, GoalLog, Project, ScopeStack, Session,
};
use indexmap::IndexMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Builder for [`GoalHarness`]
#[derive(Debug, Default)]
pub struct HarnessBuilder {
    config: HarnessConfig,
    factories: Factories,
}

impl HarnessBuilder {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// With resource root
    #[inline]
    #[must_use]
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_resource_root(root);
        self
    }

    /// With descriptor location relative to the resource root
    #[inline]
    #[must_use]
    pub fn descriptor_location(mut self, location: impl Into<String>) -> Self {
        self.config = self.config.with_descriptor_location(location);
        self
    }

    /// With default basedir
    #[inline]
    #[must_use]
    pub fn default_basedir(mut self, basedir: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_default_basedir(basedir);
        self
    }

    /// With implementation factories, replacing any registered so far
    #[inline]
    #[must_use]
    pub fn factories(mut self, factories: Factories) -> Self {
        self.factories = factories;
        self
    }

    /// With goal factory
    #[must_use]
    pub fn goal_factory<F>(mut self, implementation: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Goal> + Send + Sync + 'static,
    {
        self.factories.register_goal(implementation, factory);
        self
    }

    /// With helper component factory
    #[must_use]
    pub fn component_factory<T, F>(mut self, implementation: impl Into<String>, factory: F) -> Self
    where
        T: std::any::Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories.register_component(implementation, factory);
        self
    }

    /// Build harness
    #[must_use]
    pub fn build(self) -> GoalHarness {
        GoalHarness {
            config: self.config,
            factories: self.factories,
        }
    }
}

/// Sets up goals under test
#[derive(Debug, Clone)]
pub struct GoalHarness {
    config: HarnessConfig,
    factories: Factories,
}

impl GoalHarness {
    /// Start building a harness
    #[inline]
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Harness configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Implementation factories
    #[inline]
    #[must_use]
    pub fn factories(&self) -> &Factories {
        &self.factories
    }

    /// Set up a configured goal for `test`
    ///
    /// # Errors
    /// Returns [`FixtureError::Setup`] naming the step that failed. Scopes
    /// opened before the failure are closed again.
    pub fn setup(&self, test: GoalTest) -> Result<Fixture, FixtureError> {
        let id = FixtureId::new();
        let scopes = ScopeStack::new();
        debug!(fixture = %id, goal = test.goal(), "fixture setup started");
        match self.prepare(id, &scopes, test) {
            Ok(parts) => Ok(parts.into_fixture(id, scopes)),
            Err(err) => {
                for failure in close_scopes(&scopes, id) {
                    error!(fixture = %id, error = %failure, "scope left open by failed setup");
                }
                debug!(fixture = %id, error = %err, "fixture setup failed");
                Err(err)
            }
        }
    }

    /// Set up a fixture, run `body` on it and tear it down
    ///
    /// Teardown happens whatever the body does. A panic in the body is
    /// resumed after teardown.
    ///
    /// # Errors
    /// Setup failures as [`GoalHarness::setup`]. A failing body gives
    /// [`FixtureError::Execution`], carrying any teardown failures along.
    /// Teardown failures after a passing body give [`FixtureError::Teardown`].
    pub fn run<F>(&self, test: GoalTest, body: F) -> Result<(), FixtureError>
    where
        F: FnOnce(&mut Fixture) -> anyhow::Result<()>,
    {
        let mut fixture = self.setup(test)?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut fixture)));
        let teardown = fixture.close();

        match outcome {
            Err(payload) => {
                for failure in &teardown {
                    error!(fixture = %fixture.id(), error = %failure, "teardown failed after panic");
                }
                panic::resume_unwind(payload)
            }
            Ok(Err(error)) => Err(FixtureError::Execution { error, teardown }),
            Ok(Ok(())) if teardown.is_empty() => Ok(()),
            Ok(Ok(())) => Err(FixtureError::Teardown { errors: teardown }),
        }
    }

    /// Run setup steps 1 to 6
    fn prepare(&self, id: FixtureId, scopes: &ScopeStack, test: GoalTest) -> Result<Parts, FixtureError> {
        let mut state = FixtureState::Idle;

        // 1. basedir
        let step = FixtureState::BasedirResolved;
        let basedir = resolve_basedir(test.basedir.as_deref(), &self.config)
            .map_err(|err| FixtureError::setup(step, err))?;
        advance(id, &mut state, step)?;

        // 2. container and scopes
        let step = FixtureState::ScopesOpen;
        let container = Arc::new(DefaultContainer::new(self.factories.clone()));
        for provided in &test.provided {
            container.add_component_dyn(
                Arc::clone(&provided.instance),
                provided.type_id,
                provided.type_name,
                &provided.hint,
            );
        }
        let goal_name = test.goal.clone();
        let collaborators = Collaborators {
            log: ensure_binding(&*container, || GoalLog::new(&goal_name)).map_err(|err| FixtureError::setup(step, err))?,
            project: ensure_binding(&*container, Project::new).map_err(|err| FixtureError::setup(step, err))?,
            execution: ensure_binding(&*container, Execution::new).map_err(|err| FixtureError::setup(step, err))?,
            session: ensure_binding(&*container, Session::new).map_err(|err| FixtureError::setup(step, err))?,
        };
        open_scopes(scopes, &collaborators).map_err(|err| FixtureError::setup(step, err))?;
        let GoalTest {
            goal,
            project: project_source,
            parameters,
            session_hooks,
            project_hooks,
            ..
        } = test;
        for hook in session_hooks {
            hook(&collaborators.session.instance);
        }
        for hook in project_hooks {
            hook(&collaborators.project.instance);
        }
        advance(id, &mut state, step)?;

        // 3. descriptor
        let step = FixtureState::DescriptorLoaded;
        let mut context = IndexMap::new();
        context.insert("basedir".to_owned(), basedir.path.display().to_string());
        context.extend(self.config.context.iter().map(|(k, v)| (k.clone(), v.clone())));
        let descriptor = DescriptorLoader::new(context)
            .load_resource(&self.config.resource_root, &self.config.descriptor_location)
            .map_err(|err| FixtureError::setup(step, err))?;
        for component in descriptor.components() {
            container.add_component_descriptor(component);
        }
        advance(id, &mut state, step)?;

        // 4. goal under test
        let step = FixtureState::UnderTestInstantiated;
        let coordinate = GoalCoordinate::resolve(&goal, &descriptor).map_err(|err| FixtureError::setup(step, err))?;
        let goal_descriptor = declared_goal(&coordinate, &descriptor).map_err(|err| FixtureError::setup(step, err))?;
        let mut instance = container
            .instantiate(GOAL_ROLE, &coordinate.to_string())
            .map_err(|err| FixtureError::setup(step, err))?;
        advance(id, &mut state, step)?;

        // 5. configuration
        let step = FixtureState::Configured;
        let location = ProjectLocation {
            basedir: &basedir.path,
            resource_root: &self.config.resource_root,
            basedir_explicit: basedir.explicit,
            file_name: &self.config.project_file_name,
        };
        let document = project_source
            .load(&location)
            .map_err(|err| FixtureError::setup(step, err))?;
        let overrides = parameters.iter().map(|(name, value)| (name.as_str(), value.as_str()));
        let configuration = ConfigResolver::new().resolve(&coordinate, &document, overrides, goal_descriptor.as_ref());

        // 6. bind
        complete_stand_ins(&collaborators, &basedir, &document, goal_descriptor.as_ref(), &configuration);
        let evaluator = FallbackEvaluator::new(
            ContextEvaluator::new(&basedir.path)
                .with_session(Arc::clone(&collaborators.session.instance))
                .with_project(Arc::clone(&collaborators.project.instance))
                .with_execution(Arc::clone(&collaborators.execution.instance)),
            Arc::clone(&container) as Arc<dyn Container>,
        );
        let mut configurator = Configurator::new().with_container(Arc::clone(&container) as Arc<dyn Container>);
        if self.config.lenient_configuration {
            configurator = configurator.lenient();
        }
        configurator
            .configure(&mut *instance.goal, &configuration, &evaluator)
            .map_err(|err| FixtureError::setup(step, err))?;
        instance.goal.set_log(collaborators.log.instance.as_ref().clone());
        advance(id, &mut state, step)?;

        info!(
            fixture = %id,
            goal = %coordinate,
            implementation = %instance.implementation,
            basedir = %basedir.path.display(),
            "goal configured"
        );
        Ok(Parts {
            state,
            basedir,
            container,
            descriptor,
            coordinate,
            goal_descriptor,
            goal: instance,
            configuration,
            collaborators,
        })
    }
}

/// Everything setup produced, before it becomes a fixture
struct Parts {
    state: FixtureState,
    basedir: Basedir,
    container: Arc<DefaultContainer>,
    descriptor: PluginDescriptor,
    coordinate: GoalCoordinate,
    goal_descriptor: Option<GoalDescriptor>,
    goal: harness_inject::GoalInstance,
    configuration: harness_tree::ConfigNode,
    collaborators: Collaborators,
}

impl Parts {
    fn into_fixture(self, id: FixtureId, scopes: ScopeStack) -> Fixture {
        Fixture {
            id,
            state: self.state,
            basedir: self.basedir,
            scopes,
            container: self.container,
            descriptor: self.descriptor,
            coordinate: self.coordinate,
            goal_descriptor: self.goal_descriptor,
            goal: self.goal,
            configuration: self.configuration,
            collaborators: self.collaborators,
        }
    }
}

fn advance(id: FixtureId, state: &mut FixtureState, to: FixtureState) -> Result<(), FixtureError> {
    validate_transition(*state, to)?;
    debug!(fixture = %id, from = %state, to = %to, "fixture advanced");
    *state = to;
    Ok(())
}

fn open_scopes(scopes: &ScopeStack, collaborators: &Collaborators) -> Result<(), harness_inject::ScopeError> {
    scopes.enter_session()?;
    scopes.session().seed(Arc::clone(&collaborators.session.instance))?;
    scopes.session().seed(Arc::clone(&collaborators.log.instance))?;
    scopes.enter_execution()?;
    scopes.execution().seed(Arc::clone(&collaborators.project.instance))?;
    scopes.execution().seed(Arc::clone(&collaborators.execution.instance))?;
    Ok(())
}

/// Descriptor of the addressed goal
///
/// Goals of another plugin are left to the container; a goal of the loaded
/// plugin must be declared by it.
fn declared_goal(
    coordinate: &GoalCoordinate,
    descriptor: &PluginDescriptor,
) -> Result<Option<GoalDescriptor>, DescriptorError> {
    if !coordinate.belongs_to(descriptor) {
        return Ok(None);
    }
    descriptor
        .goal(&coordinate.goal)
        .cloned()
        .map(Some)
        .ok_or_else(|| DescriptorError::UnknownGoal {
            goal: coordinate.goal.clone(),
            plugin: descriptor.key().to_string(),
        })
}

/// Fill in what stand-ins cannot know on their own
fn complete_stand_ins(
    collaborators: &Collaborators,
    basedir: &Basedir,
    document: &ProjectDocument,
    goal: Option<&GoalDescriptor>,
    configuration: &harness_tree::ConfigNode,
) {
    let project = &collaborators.project;
    if project.is_stand_in() {
        if project.instance.basedir().is_none() {
            project.instance.set_basedir(&basedir.path);
        }
        for (key, value) in document.properties() {
            if project.instance.property(&key).is_none() {
                project.instance.set_property(key, value);
            }
        }
    }

    let session = &collaborators.session;
    if session.is_stand_in() && session.instance.current_project().is_none() {
        session.instance.set_current_project(Arc::clone(&project.instance));
    }

    let execution = &collaborators.execution;
    if execution.is_stand_in() {
        if let Some(goal) = goal {
            execution.instance.set_goal(goal.clone());
        }
        execution.instance.set_configuration(configuration.clone());
    }
}
