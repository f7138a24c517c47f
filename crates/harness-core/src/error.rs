//! Error types for fixture orchestration
//!
//! Setup failures, the test body's own failure and teardown failures are
//! kept apart so a teardown problem never hides why a test failed.

use crate::state::FixtureState;
use harness_config::{ConfigError, DescriptorError};
use harness_inject::{FieldError, LookupError, ScopeError};

/// Failure of one setup step
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Descriptor missing or malformed, or the goal is not declared
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Basedir or project document could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Goal or collaborator could not be looked up
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Scope protocol violated
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Configuration could not be bound
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Errors raised by a fixture
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// A setup step failed; scopes opened so far were closed
    #[error("fixture setup failed while entering {step}: {source}")]
    Setup {
        /// State the fixture was moving to
        step: FixtureState,
        /// Underlying failure
        #[source]
        source: SetupError,
    },

    /// The test body or the goal failed
    #[error("test failed: {error}")]
    Execution {
        /// The body's failure
        error: anyhow::Error,
        /// Teardown failures that happened afterwards
        teardown: Vec<ScopeError>,
    },

    /// Closing the scopes failed after a successful body
    #[error("fixture teardown failed: {}", .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Teardown {
        /// Every teardown failure, in order
        errors: Vec<ScopeError>,
    },

    /// Lifecycle step out of order
    #[error("illegal fixture transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: FixtureState,
        /// Requested state
        to: FixtureState,
    },

    /// Goal under test has another type than requested
    #[error("goal under test is {actual}, not {expected}")]
    GoalType {
        /// Requested type
        expected: &'static str,
        /// Implementation name of the goal
        actual: String,
    },
}

impl FixtureError {
    /// Wrap a setup failure at `step`
    pub fn setup(step: FixtureState, source: impl Into<SetupError>) -> Self {
        Self::Setup {
            step,
            source: source.into(),
        }
    }

    /// Failure of the body, as opposed to setup or teardown
    #[must_use]
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}
