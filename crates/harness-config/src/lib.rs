//! Harness Configuration
//!
//! Everything needed to turn documents into the configuration a goal is bound with.
//!
//! # Core Concepts
//!
//! - [`DescriptorLoader`]: Reads plugin descriptors with `${key}` substitution
//! - [`PluginDescriptor`] / [`GoalDescriptor`] / [`ParameterSpec`]: Immutable descriptor model
//! - [`GoalCoordinate`]: `group:artifact:version:goal` addressing
//! - [`ProjectSource`] / [`ProjectDocument`]: Where plugin configuration is declared
//! - [`ConfigResolver`]: Override > project > descriptor default precedence
//!
//! # Example
//!
//! ```rust
//! use harness_config::{ConfigResolver, DescriptorLoader, GoalCoordinate, ProjectDocument};
//!
//! let descriptor = DescriptorLoader::default()
//!     .load_str(
//!         "groupId: g\nartifactId: a\nversion: '1.0'\ngoals:\n  - goal: build\n    implementation: Build\n    parameters:\n      - name: outDir\n        defaultValue: target\n",
//!         "inline",
//!     )
//!     .unwrap();
//! let coordinate = GoalCoordinate::resolve("build", &descriptor).unwrap();
//!
//! let resolved = ConfigResolver::new().resolve(
//!     &coordinate,
//!     &ProjectDocument::empty(),
//!     [("outDir", "override-out")],
//!     descriptor.goal("build"),
//! );
//! assert_eq!(resolved.child_value("outDir"), Some("override-out"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod coordinate;
pub mod descriptor;
mod error;
mod interpolate;
mod loader;
mod project;
mod resolver;

pub use coordinate::GoalCoordinate;
pub use descriptor::{ComponentDescriptor, GoalDescriptor, ParameterSpec, PluginDescriptor, PluginKey};
pub use error::{ConfigError, DescriptorError};
pub use interpolate::interpolate;
pub use loader::DescriptorLoader;
pub use project::{extract_plugin_configuration, ProjectDocument, ProjectLocation, ProjectSource};
pub use resolver::ConfigResolver;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
