//! Harness Core
//!
//! Runs a pluggable build goal in isolation: the goal is instantiated from its
//! plugin descriptor, bound with the configuration a test asks for and wired
//! with session, project and execution collaborators.
//!
//! # Core Concepts
//!
//! - [`GoalHarness`]: Shared settings and implementation factories
//! - [`GoalTest`]: What one test wants: goal, basedir, project, overrides
//! - [`Fixture`]: Configured goal with its open scopes
//! - [`FixtureState`]: Setup steps, checked in order
//! - [`HarnessConfig`]: Resource layout, loadable from TOML or YAML
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_core::{GoalHarness, GoalTest};
//!
//! let harness = GoalHarness::builder()
//!     .resource_root("tests/resources")
//!     .build();
//!
//! harness
//!     .run(GoalTest::new("build").parameter("outDir", "out"), |fixture| {
//!         fixture.execute()?;
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod basedir;
mod config;
mod error;
mod fixture;
mod harness;
mod legacy;
pub mod logging;
mod state;
mod test_spec;

pub use basedir::{normalize, resolve_basedir, Basedir};
pub use config::{HarnessConfig, BASEDIR_ENV};
pub use error::{FixtureError, SetupError};
pub use fixture::{Collaborators, Fixture, FixtureId};
pub use harness::{GoalHarness, HarnessBuilder};
pub use legacy::{configure_goal, lookup_configured_goal, new_execution};
pub use state::{validate_transition, FixtureState};
pub use test_spec::GoalTest;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
