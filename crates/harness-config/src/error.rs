//! Error types for descriptor and configuration loading
//!
//! - [`DescriptorError`]: plugin descriptor could not be found or parsed
//! - [`ConfigError`]: project document or configuration could not be resolved

use harness_tree::TreeError;
use std::path::PathBuf;

/// Errors raised while loading a plugin descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Descriptor path or resource does not exist
    #[error("plugin descriptor not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Descriptor is malformed or inconsistent
    #[error("invalid plugin descriptor {origin}: {message}")]
    Parse {
        /// Where the descriptor came from
        origin: String,
        /// What went wrong
        message: String,
    },

    /// Descriptor file exists but cannot be read
    #[error("io error reading descriptor {}: {source}", path.display())]
    Io {
        /// Descriptor path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Goal coordinate names a goal the descriptor does not declare
    #[error("goal '{goal}' is not declared by plugin {plugin}")]
    UnknownGoal {
        /// Requested goal name
        goal: String,
        /// Plugin key (`group:artifact:version`)
        plugin: String,
    },

    /// Goal coordinate is malformed
    #[error("malformed goal coordinate '{0}'")]
    InvalidCoordinate(String),
}

impl DescriptorError {
    /// Create parse error for an origin
    pub fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while resolving a goal's configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Project document is malformed
    #[error("invalid project document {origin}: {message}")]
    Parse {
        /// Where the document came from
        origin: String,
        /// What went wrong
        message: String,
    },

    /// Project document does not exist
    #[error("project document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Project document exists but cannot be read
    #[error("io error reading project document {}: {source}", path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Base directory cannot be determined
    #[error("cannot resolve base directory: {0}")]
    Basedir(String),

    /// Project declares no configuration for the plugin
    #[error("project does not configure plugin '{artifact_id}'")]
    MissingPluginConfiguration {
        /// Artifact id that was searched for
        artifact_id: String,
    },
}

impl ConfigError {
    /// Create parse error for an origin
    pub fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a tree conversion failure
    pub fn from_tree(origin: impl Into<String>, error: &TreeError) -> Self {
        Self::parse(origin, error)
    }
}
