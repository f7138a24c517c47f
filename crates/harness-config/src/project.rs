//! Project documents
//!
//! The project document is where a goal's plugin configuration is declared:
//!
//! ```yaml
//! project:
//!   build:
//!     plugins:
//!       - artifactId: test-plugin
//!         configuration:
//!           plain: explicitValue
//! ```
//!
//! Only the plugin entries and the `properties` section are interpreted.

use crate::error::ConfigError;
use harness_tree::{document, ConfigNode};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const ROOT: &str = "project";
const CONFIGURATION: &str = "configuration";
const FILE_PREFIX: &str = "file:";
const RESOURCE_PREFIX: &str = "resource:";

/// Where a test's project document comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectSource {
    /// `<basedir>/<project file>` when the basedir was set explicitly, else nothing
    #[default]
    Default,
    /// Document text given in place
    Inline(String),
    /// File relative to the basedir
    File(PathBuf),
    /// Entry relative to the resource root
    Resource(String),
}

impl ProjectSource {
    /// Interpret a project reference
    ///
    /// # Examples
    /// ```
    /// use harness_config::ProjectSource;
    /// use std::path::PathBuf;
    ///
    /// assert_eq!(ProjectSource::parse(""), ProjectSource::Default);
    /// assert_eq!(ProjectSource::parse("file:sub/project.yaml"), ProjectSource::File(PathBuf::from("sub/project.yaml")));
    /// assert_eq!(ProjectSource::parse("resource:unit/project.yaml"), ProjectSource::Resource("unit/project.yaml".into()));
    /// assert!(matches!(ProjectSource::parse("project:\n  build: {}\n"), ProjectSource::Inline(_)));
    /// assert_eq!(ProjectSource::parse("other.yaml"), ProjectSource::File(PathBuf::from("other.yaml")));
    /// ```
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        if let Some(path) = reference.strip_prefix(FILE_PREFIX) {
            Self::File(PathBuf::from(path))
        } else if let Some(entry) = reference.strip_prefix(RESOURCE_PREFIX) {
            Self::Resource(entry.to_owned())
        } else if reference.contains('\n') || reference.trim_start().starts_with("project:") {
            Self::Inline(reference.to_owned())
        } else if reference.trim().is_empty() {
            Self::Default
        } else {
            Self::File(PathBuf::from(reference))
        }
    }

    /// Load the document this source designates
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] for a missing file or resource,
    /// [`ConfigError::Io`] for an unreadable one and [`ConfigError::Parse`]
    /// for malformed text.
    pub fn load(&self, location: &ProjectLocation<'_>) -> Result<ProjectDocument, ConfigError> {
        match self {
            Self::Inline(text) => ProjectDocument::parse(text, "inline project"),
            Self::File(path) => ProjectDocument::read(&location.basedir.join(path)),
            Self::Resource(entry) => ProjectDocument::read(&location.resource_root.join(entry)),
            Self::Default => {
                let candidate = location.basedir.join(location.file_name);
                if location.basedir_explicit && candidate.is_file() {
                    ProjectDocument::read(&candidate)
                } else {
                    debug!(candidate = %candidate.display(), "no project document, using empty one");
                    Ok(ProjectDocument::empty())
                }
            }
        }
    }
}

impl From<&str> for ProjectSource {
    fn from(reference: &str) -> Self {
        Self::parse(reference)
    }
}

impl From<PathBuf> for ProjectSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Directories a [`ProjectSource`] is resolved against
#[derive(Debug, Clone, Copy)]
pub struct ProjectLocation<'a> {
    /// Test base directory
    pub basedir: &'a Path,
    /// Root for `resource:` entries
    pub resource_root: &'a Path,
    /// Whether the basedir was set by the test rather than defaulted
    pub basedir_explicit: bool,
    /// File looked up in the basedir for [`ProjectSource::Default`]
    pub file_name: &'a str,
}

/// Parsed project document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDocument {
    root: ConfigNode,
    origin: String,
}

impl ProjectDocument {
    /// Document with no content
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: ConfigNode::new(ROOT),
            origin: "empty project".to_owned(),
        }
    }

    /// Document wrapping an existing tree
    #[must_use]
    pub fn from_tree(root: ConfigNode, origin: impl Into<String>) -> Self {
        Self {
            root,
            origin: origin.into(),
        }
    }

    /// Parse document text
    ///
    /// A single top-level `project` key is unwrapped.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed text.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut root = document::from_yaml_str(ROOT, text).map_err(|e| ConfigError::from_tree(origin, &e))?;
        if root.child_count() == 1 && root.attribute_count() == 0 && root.value().is_none() {
            if let Some(inner) = root.child(ROOT) {
                root = inner.clone();
            }
        }
        Ok(Self::from_tree(root, origin))
    }

    /// Read and parse a document file
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] when the file does not exist,
    /// [`ConfigError::Io`] when it cannot be read, otherwise as [`ProjectDocument::parse`].
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Document root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Where the document came from
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Plugin entry whose `artifactId` matches
    ///
    /// Entries without an `artifactId` are skipped.
    #[must_use]
    pub fn plugin(&self, artifact_id: &str) -> Option<&ConfigNode> {
        self.root
            .descend(&["build", "plugins"])?
            .children()
            .iter()
            .find(|plugin| plugin.child_value("artifactId") == Some(artifact_id))
    }

    /// Configuration declared for a plugin, or an empty `configuration` node
    #[must_use]
    pub fn plugin_configuration(&self, artifact_id: &str) -> ConfigNode {
        self.plugin(artifact_id)
            .and_then(|plugin| plugin.child(CONFIGURATION))
            .cloned()
            .unwrap_or_else(|| ConfigNode::new(CONFIGURATION))
    }

    /// Configuration declared for a plugin
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingPluginConfiguration`] when the project has
    /// no matching plugin entry or the entry has no configuration.
    pub fn require_plugin_configuration(&self, artifact_id: &str) -> Result<ConfigNode, ConfigError> {
        self.plugin(artifact_id)
            .and_then(|plugin| plugin.child(CONFIGURATION))
            .cloned()
            .ok_or_else(|| ConfigError::MissingPluginConfiguration {
                artifact_id: artifact_id.to_owned(),
            })
    }

    /// Entries of the `properties` section, in document order
    #[must_use]
    pub fn properties(&self) -> IndexMap<String, String> {
        self.root
            .child("properties")
            .map(|properties| {
                properties
                    .children()
                    .iter()
                    .filter_map(|p| p.value().map(|v| (p.name().to_owned(), v.to_owned())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Top-level scalar such as `groupId` or `version`
    #[must_use]
    pub fn coordinate(&self, name: &str) -> Option<&str> {
        self.root.child_value(name)
    }
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self::empty()
    }
}

/// Configuration declared for a plugin in a document, or an empty node
#[must_use]
pub fn extract_plugin_configuration(artifact_id: &str, document: &ProjectDocument) -> ConfigNode {
    document.plugin_configuration(artifact_id)
}
