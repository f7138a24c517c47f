//! Descriptor loading, project documents and configuration resolution

use harness_config::{
    ConfigResolver, DescriptorError, DescriptorLoader, GoalCoordinate, ProjectDocument, ProjectLocation,
    ProjectSource,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

const DESCRIPTOR: &str = r"
plugin:
  groupId: test
  artifactId: test-plugin
  version: 0.0.1-SNAPSHOT
  goalPrefix: test
  goals:
    - goal: parameters
      implementation: ParametersGoal
      parameters:
        - name: plain
          type: text
        - name: withProperty
          expression: ${property}
        - name: withDefault
          defaultValue: default
        - name: withPropertyAndDefault
          expression: ${property}
          defaultValue: default
        - name: workdir
          type: path
          defaultValue: ${basedir}/work
";

const EXPLICIT_PROJECT: &str = r"
project:
  build:
    plugins:
      - artifactId: test-plugin
        configuration:
          plain: explicitValue
          withProperty: explicitWithPropertyValue
          withDefault: explicitWithDefaultValue
          withPropertyAndDefault: explicitWithPropertyAndDefaultValue
";

const ALIAS_DESCRIPTOR: &str = r"
groupId: test
artifactId: alias-plugin
version: 1.0
goals:
  - goal: aliases
    implementation: AliasGoal
    parameters:
      - name: foo
        alias: foo2
      - name: first
        alias: second
      - name: second
        alias: third
";

fn write(dir: &Path, relative: &str, text: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn descriptor_resource_with_basedir_context() {
    let resources = tempfile::tempdir().unwrap();
    write(resources.path(), "META-INF/plugin.yaml", DESCRIPTOR);

    let descriptor = DescriptorLoader::default()
        .with_entry("basedir", "/projects/sample")
        .load_resource(resources.path(), "META-INF/plugin.yaml")
        .unwrap();

    assert_eq!(descriptor.goal_prefix(), Some("test"));
    let goal = descriptor.goal("parameters").unwrap();
    assert_eq!(goal.parameter("workdir").unwrap().default_value(), Some("/projects/sample/work"));
    assert_eq!(goal.key(), "test:test-plugin:0.0.1-SNAPSHOT:parameters");
}

#[test]
fn missing_descriptor_resource() {
    let resources = tempfile::tempdir().unwrap();
    let err = DescriptorLoader::default()
        .load_resource(resources.path(), "META-INF/plugin.yaml")
        .unwrap_err();
    assert!(matches!(err, DescriptorError::NotFound(_)));
}

#[test]
fn explicit_project_file_relative_to_basedir() {
    let basedir = tempfile::tempdir().unwrap();
    write(basedir.path(), "projects/explicit/project.yaml", EXPLICIT_PROJECT);

    let descriptor = DescriptorLoader::default().load_str(DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("test:test-plugin:0.0.1-SNAPSHOT:parameters", &descriptor).unwrap();
    let location = ProjectLocation {
        basedir: basedir.path(),
        resource_root: basedir.path(),
        basedir_explicit: false,
        file_name: "project.yaml",
    };
    let document = ProjectSource::parse("projects/explicit/project.yaml").load(&location).unwrap();

    let resolved = ConfigResolver::new().resolve(&coordinate, &document, [], descriptor.goal("parameters"));
    assert_eq!(resolved.child_value("plain"), Some("explicitValue"));
    assert_eq!(resolved.child_value("withProperty"), Some("explicitWithPropertyValue"));
    assert_eq!(resolved.child_value("withDefault"), Some("explicitWithDefaultValue"));
    assert_eq!(
        resolved.child_value("withPropertyAndDefault"),
        Some("explicitWithPropertyAndDefaultValue")
    );
}

#[test]
fn override_injection_wins_over_project() {
    let descriptor = DescriptorLoader::default().load_str(DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("parameters", &descriptor).unwrap();
    let document = ProjectDocument::parse(EXPLICIT_PROJECT, "explicit").unwrap();

    let resolved = ConfigResolver::new().resolve(
        &coordinate,
        &document,
        [("plain", "plainValue")],
        descriptor.goal("parameters"),
    );
    assert_eq!(resolved.child_value("plain"), Some("plainValue"));
    assert_eq!(resolved.child_value("withDefault"), Some("explicitWithDefaultValue"));
}

#[test]
fn first_override_of_a_name_wins() {
    let descriptor = DescriptorLoader::default().load_str(DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("parameters", &descriptor).unwrap();

    let resolved = ConfigResolver::new().resolve(
        &coordinate,
        &ProjectDocument::empty(),
        [("plain", "first"), ("plain", "second")],
        descriptor.goal("parameters"),
    );
    assert_eq!(resolved.child_value("plain"), Some("first"));
    assert_eq!(resolved.children_named("plain").count(), 1);
}

#[test]
fn inline_project_source() {
    let descriptor = DescriptorLoader::default().load_str(DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("parameters", &descriptor).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let location = ProjectLocation {
        basedir: dir.path(),
        resource_root: dir.path(),
        basedir_explicit: true,
        file_name: "project.yaml",
    };

    let document = ProjectSource::parse(EXPLICIT_PROJECT.trim_start()).load(&location).unwrap();
    let resolved = ConfigResolver::new().resolve(&coordinate, &document, [], descriptor.goal("parameters"));
    assert_eq!(resolved.child_value("plain"), Some("explicitValue"));
}

#[test]
fn project_node_under_alias_resolves_parameter() {
    let descriptor = DescriptorLoader::default().load_str(ALIAS_DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("aliases", &descriptor).unwrap();
    let document = ProjectDocument::parse(
        "project:\n  build:\n    plugins:\n      - artifactId: alias-plugin\n        configuration:\n          foo2: fromAlias\n",
        "aliased",
    )
    .unwrap();

    let resolved = ConfigResolver::new().resolve(&coordinate, &document, [], descriptor.goal("aliases"));
    assert_eq!(resolved.child_value("foo"), Some("fromAlias"));
    assert!(resolved.child("foo2").is_none());
}

#[test]
fn aliases_are_followed_one_level_only() {
    let descriptor = DescriptorLoader::default().load_str(ALIAS_DESCRIPTOR, "inline").unwrap();
    let coordinate = GoalCoordinate::resolve("aliases", &descriptor).unwrap();
    let document = ProjectDocument::parse(
        "project:\n  build:\n    plugins:\n      - artifactId: alias-plugin\n        configuration:\n          third: deep\n",
        "chained",
    )
    .unwrap();

    let resolved = ConfigResolver::new().resolve(&coordinate, &document, [], descriptor.goal("aliases"));
    assert_eq!(resolved.child_value("second"), Some("deep"));
    assert!(resolved.child("first").is_none());
    assert!(resolved.child("third").is_none());
}
