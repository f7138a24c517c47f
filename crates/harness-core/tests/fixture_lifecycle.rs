//! Fixture setup, execution and guaranteed teardown

use harness_config::{DescriptorError, ProjectDocument};
use harness_core::{
    configure_goal, lookup_configured_goal, new_execution, FixtureError, FixtureState, GoalHarness, GoalTest,
    HarnessConfig, SetupError,
};
use harness_inject::{AsAny, Container, ContextEvaluator, FieldError, ScopeKind, Session};
use harness_test_utils::{
    goal_factories, BuildGoal, ParametersGoal, TestResources, BUILD_GOAL, EXPLICIT_PROJECT, PARAMETERS_GOAL,
};
use pretty_assertions::assert_eq;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

fn harness(resources: &TestResources) -> GoalHarness {
    let config = HarnessConfig::new()
        .with_resource_root(resources.path())
        .with_default_basedir(resources.path());
    GoalHarness::builder().config(config).factories(goal_factories()).build()
}

// ============================================================================
// Setup and teardown
// ============================================================================

#[test]
fn setup_leaves_scopes_open_until_teardown() {
    let resources = TestResources::build_plugin();
    let mut fixture = harness(&resources).setup(GoalTest::new("build")).unwrap();

    assert_eq!(fixture.state(), FixtureState::Configured);
    assert!(fixture.scopes().scope(ScopeKind::Session).is_open());
    assert!(fixture.scopes().scope(ScopeKind::Execution).is_open());

    fixture.teardown().unwrap();
    assert_eq!(fixture.state(), FixtureState::TornDown);
    assert!(!fixture.scopes().session().is_open());
    assert!(!fixture.scopes().execution().is_open());
    assert!(matches!(
        fixture.teardown(),
        Err(FixtureError::IllegalTransition {
            from: FixtureState::TornDown,
            ..
        })
    ));
}

#[test]
fn execute_only_once() {
    let resources = TestResources::build_plugin();
    let mut fixture = harness(&resources).setup(GoalTest::new("build")).unwrap();

    fixture.execute().unwrap();
    assert_eq!(fixture.state(), FixtureState::Executed);
    assert!(fixture.goal::<BuildGoal>().unwrap().built);
    assert!(fixture.execute().is_err());
}

#[test]
fn stand_ins_know_goal_and_project() {
    let resources = TestResources::build_plugin();
    let fixture = harness(&resources).setup(GoalTest::new(BUILD_GOAL)).unwrap();

    assert!(fixture.collaborators().execution.is_stand_in());
    assert_eq!(fixture.execution().goal_name().as_deref(), Some("build"));
    assert_eq!(fixture.execution().configuration().as_ref(), Some(fixture.resolved_configuration()));
    let current = fixture.session().current_project().unwrap();
    assert!(Arc::ptr_eq(&current, fixture.project()));
    assert_eq!(fixture.project().basedir().as_deref(), Some(fixture.basedir()));
}

#[test]
fn wrong_goal_type_is_reported() {
    let resources = TestResources::build_plugin();
    let fixture = harness(&resources).setup(GoalTest::new("build")).unwrap();

    assert!(matches!(
        fixture.goal::<ParametersGoal>(),
        Err(FixtureError::GoalType { actual, .. }) if actual == "BuildGoal"
    ));
}

// ============================================================================
// Build goal end to end
// ============================================================================

#[test]
fn project_configuration_and_helper_component() {
    let resources = TestResources::build_plugin();
    let test = GoalTest::new(BUILD_GOAL).project("file:projects/build/project.yaml");

    harness(&resources)
        .run(test, |fixture| {
            assert!(fixture.scopes().session().is_open());
            assert!(fixture.scopes().execution().is_open());
            fixture.execute()?;
            let goal = fixture.goal::<BuildGoal>()?;
            assert_eq!(goal.out_dir.as_deref(), Some("out"));
            assert_eq!(goal.archiver.as_ref().map(|a| a.format), Some("zip"));
            assert!(goal.built);
            Ok(())
        })
        .unwrap();
}

#[test]
fn override_and_alias() {
    let resources = TestResources::build_plugin();
    let harness = harness(&resources);

    let overridden = GoalTest::new(BUILD_GOAL)
        .project("file:projects/build/project.yaml")
        .parameter("outDir", "override-out");
    harness
        .run(overridden, |fixture| {
            assert_eq!(fixture.goal::<BuildGoal>()?.out_dir.as_deref(), Some("override-out"));
            Ok(())
        })
        .unwrap();

    let aliased = GoalTest::new(BUILD_GOAL).parameter("outputDirectory", "alias-out");
    harness
        .run(aliased, |fixture| {
            assert_eq!(fixture.goal::<BuildGoal>()?.out_dir.as_deref(), Some("alias-out"));
            Ok(())
        })
        .unwrap();
}

#[test]
fn descriptor_default_uses_basedir() {
    let resources = TestResources::build_plugin();
    let fixture = harness(&resources).setup(GoalTest::new(BUILD_GOAL)).unwrap();

    let expected = format!("{}/target", fixture.basedir().display());
    let goal = fixture.goal::<BuildGoal>().unwrap();
    assert_eq!(goal.out_dir, Some(expected));
    assert!(goal.archiver.is_none());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn failing_body_still_tears_down() {
    let resources = TestResources::build_plugin();
    let err = harness(&resources)
        .run(GoalTest::new("build"), |_| anyhow::bail!("assertion failed"))
        .unwrap_err();

    assert!(err.is_execution());
    let FixtureError::Execution { error, teardown } = err else {
        unreachable!()
    };
    assert_eq!(error.to_string(), "assertion failed");
    assert!(teardown.is_empty());
}

#[test]
fn panicking_body_is_resumed() {
    let resources = TestResources::build_plugin();
    let harness = harness(&resources);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        harness.run(GoalTest::new("build"), |_| panic!("boom"))
    }));

    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
}

#[test]
fn failing_body_releases_scoped_collaborators() {
    let resources = TestResources::build_plugin();
    let session = Arc::new(Session::new());
    let before = Arc::strong_count(&session);

    let err = harness(&resources)
        .run(GoalTest::new(BUILD_GOAL).provide(Arc::clone(&session)), |fixture| {
            let scoped = fixture.scopes().session().get::<Session>()?.unwrap();
            assert!(Arc::ptr_eq(&scoped, &session));
            assert!(Arc::strong_count(&session) > before + 1);
            anyhow::bail!("assertion failed")
        })
        .unwrap_err();

    assert!(err.is_execution());
    assert_eq!(Arc::strong_count(&session), before);
}

#[test]
fn panicking_body_releases_scoped_collaborators() {
    let resources = TestResources::build_plugin();
    let harness = harness(&resources);
    let session = Arc::new(Session::new());
    let before = Arc::strong_count(&session);

    let test = GoalTest::new(BUILD_GOAL).provide(Arc::clone(&session));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        harness.run(test, |fixture| {
            assert!(fixture.scopes().session().is_open());
            assert!(Arc::strong_count(&session) > before);
            panic!("boom")
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(Arc::strong_count(&session), before);
}

#[test]
fn unknown_goal_fails_instantiation() {
    let resources = TestResources::build_plugin();
    let err = harness(&resources).setup(GoalTest::new("missing")).unwrap_err();

    assert!(matches!(
        err,
        FixtureError::Setup {
            step: FixtureState::UnderTestInstantiated,
            source: SetupError::Descriptor(DescriptorError::UnknownGoal { .. }),
        }
    ));
}

#[test]
fn missing_descriptor_fails_loading() {
    let resources = TestResources::new();
    let err = harness(&resources).setup(GoalTest::new("build")).unwrap_err();

    assert!(matches!(
        err,
        FixtureError::Setup {
            step: FixtureState::DescriptorLoaded,
            source: SetupError::Descriptor(DescriptorError::NotFound(_)),
        }
    ));
}

#[test]
fn uncoercible_value_fails_configuration() {
    let resources = TestResources::test_plugin();
    let err = harness(&resources)
        .setup(GoalTest::new("shadow").parameter("skip", "maybe"))
        .unwrap_err();

    assert!(matches!(
        err,
        FixtureError::Setup {
            step: FixtureState::Configured,
            source: SetupError::Field(FieldError::Coercion { .. }),
        }
    ));
}

// ============================================================================
// Manual wiring
// ============================================================================

#[test]
fn configure_goal_from_document() {
    let document = ProjectDocument::parse(EXPLICIT_PROJECT, "explicit").unwrap();
    let evaluator = ContextEvaluator::new("/work");

    let mut goal = ParametersGoal::default();
    configure_goal(&mut goal, &document, "test-plugin", &evaluator).unwrap();
    assert_eq!(goal.plain.as_deref(), Some("explicitValue"));

    let err = configure_goal(&mut goal, &document, "other-plugin", &evaluator).unwrap_err();
    assert!(matches!(err, SetupError::Config(_)));
}

#[test]
fn lookup_configured_goal_from_execution() {
    let resources = TestResources::test_plugin();
    let fixture = harness(&resources).setup(GoalTest::new(PARAMETERS_GOAL)).unwrap();

    let descriptor = fixture.descriptor().goal("parameters").unwrap();
    let execution = Arc::new(new_execution(descriptor));
    let container: Arc<dyn Container> = Arc::clone(fixture.container()) as Arc<dyn Container>;
    let goal = lookup_configured_goal(&container, fixture.session(), &execution).unwrap();

    let goal = (*goal).as_any().downcast_ref::<ParametersGoal>().unwrap();
    assert_eq!(goal.with_default.as_deref(), Some("default"));
    assert_eq!(goal.plain, None);
}
