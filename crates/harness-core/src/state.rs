//! Fixture lifecycle states

use crate::error::FixtureError;
use std::fmt::{self, Display, Formatter};

/// Where a fixture is in its per-test protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixtureState {
    /// Nothing done yet
    Idle,
    /// Base directory known
    BasedirResolved,
    /// Session and execution scopes open and seeded
    ScopesOpen,
    /// Plugin descriptor loaded and its components registered
    DescriptorLoaded,
    /// Goal instance created
    UnderTestInstantiated,
    /// Goal fields bound
    Configured,
    /// Goal executed
    Executed,
    /// Scopes closed
    TornDown,
}

impl FixtureState {
    /// Next state of the setup sequence
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::BasedirResolved),
            Self::BasedirResolved => Some(Self::ScopesOpen),
            Self::ScopesOpen => Some(Self::DescriptorLoaded),
            Self::DescriptorLoaded => Some(Self::UnderTestInstantiated),
            Self::UnderTestInstantiated => Some(Self::Configured),
            Self::Configured => Some(Self::Executed),
            Self::Executed => Some(Self::TornDown),
            Self::TornDown => None,
        }
    }

    /// Whether the goal may run in this state
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Configured
    }

    /// Whether scopes may still be open
    #[inline]
    #[must_use]
    pub fn is_live(self) -> bool {
        self >= Self::ScopesOpen && self != Self::TornDown
    }
}

impl Display for FixtureState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::BasedirResolved => "basedir-resolved",
            Self::ScopesOpen => "scopes-open",
            Self::DescriptorLoaded => "descriptor-loaded",
            Self::UnderTestInstantiated => "under-test-instantiated",
            Self::Configured => "configured",
            Self::Executed => "executed",
            Self::TornDown => "torn-down",
        })
    }
}

/// Check a lifecycle transition
///
/// Setup advances one state at a time; teardown is reachable from every
/// state but itself.
///
/// # Errors
/// Returns [`FixtureError::IllegalTransition`] for any other move.
pub fn validate_transition(from: FixtureState, to: FixtureState) -> Result<(), FixtureError> {
    let allowed = match to {
        FixtureState::TornDown => from != FixtureState::TornDown,
        _ => from.next() == Some(to),
    };
    if allowed {
        Ok(())
    } else {
        Err(FixtureError::IllegalTransition { from, to })
    }
}
