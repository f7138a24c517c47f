//! Harness Injection
//!
//! Runtime machinery a goal is wired with during a test.
//!
//! # Core Concepts
//!
//! - [`Container`] / [`DefaultContainer`]: Components by type and hint, goals by descriptor
//! - [`ScopeStack`]: Session and execution scoped singletons, strictly nested
//! - [`ExpressionEvaluator`]: `${...}` evaluation, with [`FallbackEvaluator`] for container lookups
//! - [`FieldDirectory`] / [`Configurable`]: Named fields instead of reflection
//! - [`Configurator`]: Binds a resolved configuration onto a goal
//!
//! # Example
//!
//! ```rust
//! use harness_inject::{ContextEvaluator, ExpressionEvaluator, Session, Value};
//! use std::sync::Arc;
//!
//! let session = Arc::new(Session::new().with_user_property("property", "value"));
//! let evaluator = ContextEvaluator::new("/work").with_session(session);
//!
//! assert_eq!(
//!     evaluator.evaluate("test-${property}", None).unwrap(),
//!     Some(Value::text("test-value"))
//! );
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod configurator;
mod container;
mod error;
mod evaluator;
mod fields;
mod goal;
mod model;
mod scope;
mod value;

pub use configurator::Configurator;
pub use container::{
    ensure_binding, Binding, ComponentFactory, Container, ContainerExt, DefaultContainer, Factories, GoalFactory,
    GoalInstance, Provenance,
};
pub use error::{ExpressionError, FieldError, LookupError, ScopeError};
pub use evaluator::{ContextEvaluator, ExpressionEvaluator, FallbackEvaluator};
pub use fields::{
    field_type, read_all_fields, read_field, read_field_as, write_field, AsAny, Configurable, FieldDirectory, Fields,
};
pub use goal::{Goal, GoalLog, LogLevel, LogRecord};
pub use model::{Execution, Project, Session, BUILD_DIRECTORY, OUTPUT_DIRECTORY};
pub use scope::{Scope, ScopeKind, ScopeStack};
pub use value::{ComponentRef, FieldValue, Value, ValueType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
