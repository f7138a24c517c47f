//! Manual wiring helpers
//!
//! For tests that build a goal themselves instead of going through
//! [`GoalHarness::setup`](crate::GoalHarness::setup).

use crate::error::SetupError;
use harness_config::descriptor::GOAL_ROLE;
use harness_config::{ConfigResolver, GoalDescriptor, ProjectDocument};
use harness_inject::{
    Configurable, Configurator, Container, ContextEvaluator, Execution, ExpressionEvaluator, Goal, LookupError,
    Session,
};
use harness_tree::ConfigNode;
use std::sync::Arc;
use tracing::debug;

/// Bind the configuration `document` declares for plugin `artifact_id`
///
/// # Errors
/// Returns [`SetupError::Config`] when the document has no such plugin and
/// [`SetupError::Field`] when binding fails.
pub fn configure_goal<C>(
    goal: &mut C,
    document: &ProjectDocument,
    artifact_id: &str,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<(), SetupError>
where
    C: Configurable + ?Sized,
{
    let configuration = document.require_plugin_configuration(artifact_id)?;
    Configurator::new().configure(goal, &configuration, evaluator)?;
    Ok(())
}

/// Execution of `goal` with its default configuration
#[must_use]
pub fn new_execution(goal: &GoalDescriptor) -> Execution {
    let execution = Execution::for_goal(goal.clone());
    execution.set_configuration(goal.default_configuration());
    execution
}

/// Instantiate and configure the goal an execution refers to
///
/// The execution's configuration is completed from the goal's parameter
/// declarations and evaluated against `session` and its current project.
///
/// # Errors
/// Returns [`SetupError::Lookup`] when the execution names no goal or the
/// container cannot create it, and [`SetupError::Field`] when binding fails.
pub fn lookup_configured_goal(
    container: &Arc<dyn Container>,
    session: &Arc<Session>,
    execution: &Arc<Execution>,
) -> Result<Box<dyn Goal>, SetupError> {
    let goal = execution
        .goal()
        .ok_or_else(|| LookupError::not_found(GOAL_ROLE, "execution without a goal"))?;
    let mut instance = container.instantiate(GOAL_ROLE, &goal.key())?;

    let declared = execution
        .configuration()
        .unwrap_or_else(|| ConfigNode::new("configuration"));
    let configuration = ConfigResolver::new().resolve_execution(&goal, &declared);

    let project = session.current_project();
    let basedir = project
        .as_ref()
        .and_then(|project| project.basedir())
        .map_or_else(std::env::current_dir, Ok)
        .map_err(|err| harness_config::ConfigError::Basedir(err.to_string()))?;
    let mut evaluator = ContextEvaluator::new(basedir)
        .with_session(Arc::clone(session))
        .with_execution(Arc::clone(execution));
    if let Some(project) = project {
        evaluator = evaluator.with_project(project);
    }
    let evaluator = harness_inject::FallbackEvaluator::new(evaluator, Arc::clone(container));

    Configurator::new()
        .with_container(Arc::clone(container))
        .configure(&mut *instance.goal, &configuration, &evaluator)?;
    debug!(goal = %goal.key(), implementation = %instance.implementation, "goal looked up and configured");
    Ok(instance.goal)
}
