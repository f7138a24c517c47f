//! Base directory resolution
//!
//! A per-test basedir wins over the harness default. `${basedir}` in the
//! per-test value stands for the default. Remaining relative paths, and
//! absolute ones that do not exist, are looked up as resource root entries
//! before being taken against the working directory.

use crate::config::HarnessConfig;
use harness_config::{interpolate, ConfigError};
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Basedir chosen for a test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basedir {
    /// Absolute, normalized path
    pub path: PathBuf,
    /// Whether the test set it rather than the harness
    pub explicit: bool,
}

/// Resolve the basedir for a test
///
/// # Errors
/// Returns [`ConfigError::Basedir`] when no absolute path can be formed.
pub fn resolve_basedir(requested: Option<&str>, config: &HarnessConfig) -> Result<Basedir, ConfigError> {
    let default = absolute(&config.default_basedir()?)?;
    let Some(requested) = requested.filter(|value| !value.trim().is_empty()) else {
        debug!(basedir = %default.display(), "using default basedir");
        return Ok(Basedir {
            path: default,
            explicit: false,
        });
    };

    let context = IndexMap::from([("basedir".to_owned(), default.display().to_string())]);
    let expanded = interpolate(requested, &context);
    let candidate = PathBuf::from(expanded.as_ref());
    let path = if candidate.is_absolute() && candidate.exists() {
        candidate
    } else {
        let entry = config
            .resource_root
            .join(candidate.strip_prefix("/").unwrap_or(candidate.as_path()));
        if entry.exists() {
            absolute(&entry)?
        } else {
            absolute(&candidate)?
        }
    };

    debug!(requested, basedir = %path.display(), "using test basedir");
    Ok(Basedir { path, explicit: true })
}

/// `path` made absolute against the working directory, then normalized
fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| ConfigError::Basedir(err.to_string()))?
            .join(path)
    };
    Ok(normalize(&joined))
}

/// Lexically remove `.` and `..` components
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_when_not_requested() {
        let config = HarnessConfig::new().with_default_basedir("/work/./module/../sample");
        let basedir = resolve_basedir(None, &config).unwrap();
        assert_eq!(basedir.path, PathBuf::from("/work/sample"));
        assert!(!basedir.explicit);
        assert!(!resolve_basedir(Some("  "), &config).unwrap().explicit);
    }

    #[test]
    fn placeholder_stands_for_default() {
        let config = HarnessConfig::new().with_default_basedir("/work");
        let basedir = resolve_basedir(Some("${basedir}/target/test-classes"), &config).unwrap();
        assert_eq!(basedir.path, PathBuf::from("/work/target/test-classes"));
        assert!(basedir.explicit);
    }

    #[test]
    fn resource_root_entries_win() {
        let resources = tempfile::tempdir().unwrap();
        fs::create_dir_all(resources.path().join("projects/sample")).unwrap();
        let config = HarnessConfig::new()
            .with_resource_root(resources.path())
            .with_default_basedir("/work");

        let relative = resolve_basedir(Some("projects/sample"), &config).unwrap();
        assert_eq!(relative.path, resources.path().join("projects/sample"));
        let rooted = resolve_basedir(Some("/projects/sample"), &config).unwrap();
        assert_eq!(rooted.path, resources.path().join("projects/sample"));
    }

    #[test]
    fn relative_paths_use_working_directory() {
        let config = HarnessConfig::new()
            .with_resource_root("/no/such/root")
            .with_default_basedir("/work");
        let basedir = resolve_basedir(Some("src/../projects/x"), &config).unwrap();
        assert_eq!(basedir.path, std::env::current_dir().unwrap().join("projects/x"));
    }
}
