//! Testing utilities for the harness workspace
//!
//! Sample goals, their plugin descriptors and project documents, and a
//! temporary resource tree to load them from.

#![allow(missing_docs)]

use anyhow::{bail, ensure};
use harness_inject::{Configurable, Factories, FieldDirectory, Fields, Goal, GoalLog, Session};
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const PARAMETERS_GOAL: &str = "test:test-plugin:0.0.1-SNAPSHOT:parameters";
pub const EXPRESSION_GOAL: &str = "test:test-plugin:0.0.1-SNAPSHOT:goal";
pub const BUILD_GOAL: &str = "g:a:1.0:build";

pub const DESCRIPTOR_LOCATION: &str = "META-INF/plugin.yaml";

pub const TEST_PLUGIN_DESCRIPTOR: &str = r"
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
        - name: withProperty
          expression: ${property}
        - name: withDefault
          defaultValue: default
        - name: withPropertyAndDefault
          expression: ${property}
          defaultValue: default
    - goal: goal
      implementation: ExpressionGoal
      parameters:
        - name: basedir
          type: path
        - name: workdir
          type: path
        - name: param
        - name: param2
        - name: session
          expression: ${session}
    - goal: shadow
      implementation: ShadowingGoal
      parameters:
        - name: skip
          alias: skipped
          defaultValue: 'false'
        - name: encoding
          defaultValue: ${project.build.sourceEncoding}
";

pub const BUILD_PLUGIN_DESCRIPTOR: &str = r"
plugin:
  groupId: g
  artifactId: a
  version: '1.0'
  goals:
    - goal: build
      implementation: BuildGoal
      parameters:
        - name: outDir
          alias: outputDirectory
          defaultValue: ${basedir}/target
        - name: archiver
          implementation: ZipArchiver
";

pub const DEFAULT_PROJECT: &str = r"
project:
  build:
    plugins:
      - artifactId: test-plugin
";

pub const EXPLICIT_PROJECT: &str = r"
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

pub const PROPERTY_PROJECT: &str = r"
project:
  build:
    plugins:
      - artifactId: test-plugin
        configuration:
          withProperty: ${property}
          withPropertyAndDefault: ${property}
";

pub const BASEDIR_PROJECT: &str = r"
project:
  build:
    plugins:
      - artifactId: test-plugin
        configuration:
          plain: i-have-a-basedir-set-by-annotation
";

pub const EXPRESSION_PROJECT: &str = r"
project:
  build:
    plugins:
      - groupId: test
        artifactId: test-plugin
        configuration:
          basedir: ${project.basedir}
          workdir: ${project.basedir}/workDirectory
";

pub const BUILD_PROJECT: &str = r"
project:
  groupId: g
  artifactId: sample
  version: '1.0'
  build:
    plugins:
      - artifactId: a
        configuration:
          outDir: out
          archiver: ~
";

// ============================================================================
// Goals
// ============================================================================

#[derive(Debug, Default)]
pub struct GoalBase {
    pub skip: bool,
    pub encoding: Option<String>,
}

static GOAL_BASE_FIELDS: Lazy<FieldDirectory<GoalBase>> = Lazy::new(|| {
    FieldDirectory::<GoalBase>::new()
        .field("skip", |b| &b.skip, |b| &mut b.skip)
        .field("encoding", |b| &b.encoding, |b| &mut b.encoding)
});

#[derive(Debug, Default)]
pub struct ParametersGoal {
    pub plain: Option<String>,
    pub with_property: Option<String>,
    pub with_default: Option<String>,
    pub with_property_and_default: Option<String>,
    log: Option<GoalLog>,
}

static PARAMETERS_FIELDS: Lazy<FieldDirectory<ParametersGoal>> = Lazy::new(|| {
    FieldDirectory::<ParametersGoal>::new()
        .field("plain", |g| &g.plain, |g| &mut g.plain)
        .field("withProperty", |g| &g.with_property, |g| &mut g.with_property)
        .field("withDefault", |g| &g.with_default, |g| &mut g.with_default)
        .field(
            "withPropertyAndDefault",
            |g| &g.with_property_and_default,
            |g| &mut g.with_property_and_default,
        )
});

impl Configurable for ParametersGoal {
    fn fields(&self) -> &'static dyn Fields {
        &*PARAMETERS_FIELDS
    }
}

impl Goal for ParametersGoal {
    fn execute(&mut self) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.info(format!("Plain value = {}", self.plain.as_deref().unwrap_or("")));
        }
        Ok(())
    }

    fn set_log(&mut self, log: GoalLog) {
        self.log = Some(log);
    }

    fn log(&self) -> Option<&GoalLog> {
        self.log.as_ref()
    }
}

/// Goal that redeclares a field of its embedded [`GoalBase`]
#[derive(Debug, Default)]
pub struct ShadowingGoal {
    pub base: GoalBase,
    pub encoding: Option<String>,
    log: Option<GoalLog>,
}

static SHADOWING_FIELDS: Lazy<FieldDirectory<ShadowingGoal>> = Lazy::new(|| {
    FieldDirectory::<ShadowingGoal>::new()
        .field("encoding", |g| &g.encoding, |g| &mut g.encoding)
        .extend(&*GOAL_BASE_FIELDS, |g| &g.base, |g| &mut g.base)
});

impl Configurable for ShadowingGoal {
    fn fields(&self) -> &'static dyn Fields {
        &*SHADOWING_FIELDS
    }
}

impl Goal for ShadowingGoal {
    fn execute(&mut self) -> anyhow::Result<()> {
        let Some(log) = &self.log else {
            return Ok(());
        };
        if self.base.skip {
            log.info("skipping");
        } else {
            log.info(format!("encoding = {}", self.encoding.as_deref().unwrap_or("")));
        }
        Ok(())
    }

    fn set_log(&mut self, log: GoalLog) {
        self.log = Some(log);
    }

    fn log(&self) -> Option<&GoalLog> {
        self.log.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct ExpressionGoal {
    pub basedir: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub param: Option<String>,
    pub param2: Option<String>,
    pub session: Option<Arc<Session>>,
    log: Option<GoalLog>,
}

static EXPRESSION_FIELDS: Lazy<FieldDirectory<ExpressionGoal>> = Lazy::new(|| {
    FieldDirectory::<ExpressionGoal>::new()
        .field("basedir", |g| &g.basedir, |g| &mut g.basedir)
        .field("workdir", |g| &g.workdir, |g| &mut g.workdir)
        .field("param", |g| &g.param, |g| &mut g.param)
        .field("param2", |g| &g.param2, |g| &mut g.param2)
        .field("session", |g| &g.session, |g| &mut g.session)
});

impl Configurable for ExpressionGoal {
    fn fields(&self) -> &'static dyn Fields {
        &*EXPRESSION_FIELDS
    }
}

impl Goal for ExpressionGoal {
    fn execute(&mut self) -> anyhow::Result<()> {
        let Some(basedir) = &self.basedir else {
            bail!("basedir was not injected");
        };
        let Some(workdir) = &self.workdir else {
            bail!("workdir was not injected");
        };
        ensure!(workdir.starts_with(basedir), "workdir does not start with basedir");
        Ok(())
    }

    fn set_log(&mut self, log: GoalLog) {
        self.log = Some(log);
    }

    fn log(&self) -> Option<&GoalLog> {
        self.log.as_ref()
    }
}

/// Helper component declared by implementation name
#[derive(Debug)]
pub struct Archiver {
    pub format: &'static str,
}

#[derive(Debug, Default)]
pub struct BuildGoal {
    pub out_dir: Option<String>,
    pub archiver: Option<Arc<Archiver>>,
    pub built: bool,
    log: Option<GoalLog>,
}

static BUILD_FIELDS: Lazy<FieldDirectory<BuildGoal>> = Lazy::new(|| {
    FieldDirectory::<BuildGoal>::new()
        .field("outDir", |g| &g.out_dir, |g| &mut g.out_dir)
        .field("archiver", |g| &g.archiver, |g| &mut g.archiver)
});

impl Configurable for BuildGoal {
    fn fields(&self) -> &'static dyn Fields {
        &*BUILD_FIELDS
    }
}

impl Goal for BuildGoal {
    fn execute(&mut self) -> anyhow::Result<()> {
        let Some(out_dir) = &self.out_dir else {
            bail!("outDir is not set");
        };
        if let Some(log) = &self.log {
            log.info(format!("building into {out_dir}"));
        }
        self.built = true;
        Ok(())
    }

    fn set_log(&mut self, log: GoalLog) {
        self.log = Some(log);
    }

    fn log(&self) -> Option<&GoalLog> {
        self.log.as_ref()
    }
}

/// Factories for every sample goal and component
pub fn goal_factories() -> Factories {
    Factories::new()
        .with_default_goal::<ParametersGoal>("ParametersGoal")
        .with_default_goal::<ShadowingGoal>("ShadowingGoal")
        .with_default_goal::<ExpressionGoal>("ExpressionGoal")
        .with_default_goal::<BuildGoal>("BuildGoal")
        .with_component("ZipArchiver", || Archiver { format: "zip" })
}

// ============================================================================
// Resources
// ============================================================================

/// Temporary resource tree, removed on drop
pub struct TestResources {
    dir: TempDir,
}

impl TestResources {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Test plugin descriptor plus the sample projects under `projects/`
    pub fn test_plugin() -> Self {
        Self::new()
            .with_file(DESCRIPTOR_LOCATION, TEST_PLUGIN_DESCRIPTOR)
            .with_file("projects/default/project.yaml", DEFAULT_PROJECT)
            .with_file("projects/explicit/project.yaml", EXPLICIT_PROJECT)
            .with_file("projects/property/project.yaml", PROPERTY_PROJECT)
            .with_file("projects/basedir-set-by-annotation/project.yaml", BASEDIR_PROJECT)
    }

    /// `g:a:1.0` descriptor plus its project in `projects/build/`
    pub fn build_plugin() -> Self {
        Self::new()
            .with_file(DESCRIPTOR_LOCATION, BUILD_PLUGIN_DESCRIPTOR)
            .with_file("projects/build/project.yaml", BUILD_PROJECT)
    }

    #[must_use]
    pub fn with_file(self, relative: &str, text: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

impl Default for TestResources {
    fn default() -> Self {
        Self::new()
    }
}
