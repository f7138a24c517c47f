//! Harness Configuration Trees
//!
//! Parsed configuration documents expressed as ordered, attribute-bearing trees.
//!
//! # Core Concepts
//!
//! - [`ConfigNode`]: Named node with an optional value, attributes and ordered children
//! - [`merge`]: Recursive per-name merge of an override tree over a base tree
//! - [`document`]: Conversion of YAML documents into [`ConfigNode`] trees
//!
//! # Example
//!
//! ```rust
//! use harness_tree::{merge, ConfigNode};
//!
//! let project = ConfigNode::new("configuration")
//!     .with_child(ConfigNode::new("plain").with_value("explicitValue"));
//! let overrides = ConfigNode::new("configuration")
//!     .with_child(ConfigNode::new("plain").with_value("plainValue"));
//!
//! let merged = merge(Some(&overrides), Some(&project), false).unwrap();
//! assert_eq!(merged.child_value("plain"), Some("plainValue"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod document;
mod error;
mod merge;
mod node;

pub use error::TreeError;
pub use merge::{merge, merge_children};
pub use node::ConfigNode;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
