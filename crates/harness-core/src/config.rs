//! Harness-wide configuration
//!
//! Defaults match the conventional layout of a goal's tests: documents under
//! `tests/resources`, the plugin descriptor at `META-INF/plugin.yaml` and a
//! `project.yaml` per project directory.

use harness_config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default basedir
pub const BASEDIR_ENV: &str = "basedir";

/// Settings shared by every test of a harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of test resources: descriptor, `resource:` projects, basedirs
    pub resource_root: PathBuf,
    /// Descriptor location relative to the resource root
    pub descriptor_location: String,
    /// Basedir for tests that set none; see [`HarnessConfig::default_basedir`]
    pub default_basedir: Option<PathBuf>,
    /// Project document looked up in an explicitly set basedir
    pub project_file_name: String,
    /// Extra `${key}` substitutions applied to the descriptor
    pub context: BTreeMap<String, String>,
    /// Ignore configuration that matches no goal field
    pub lenient_configuration: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("tests/resources"),
            descriptor_location: "META-INF/plugin.yaml".to_owned(),
            default_basedir: None,
            project_file_name: "project.yaml".to_owned(),
            context: BTreeMap::new(),
            lenient_configuration: false,
        }
    }
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With resource root
    #[inline]
    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    /// With descriptor location
    #[inline]
    #[must_use]
    pub fn with_descriptor_location(mut self, location: impl Into<String>) -> Self {
        self.descriptor_location = location.into();
        self
    }

    /// With default basedir
    #[inline]
    #[must_use]
    pub fn with_default_basedir(mut self, basedir: impl Into<PathBuf>) -> Self {
        self.default_basedir = Some(basedir.into());
        self
    }

    /// With project file name
    #[inline]
    #[must_use]
    pub fn with_project_file_name(mut self, name: impl Into<String>) -> Self {
        self.project_file_name = name.into();
        self
    }

    /// With descriptor substitution
    #[inline]
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// With lenient configuration binding
    #[inline]
    #[must_use]
    pub fn with_lenient_configuration(mut self, lenient: bool) -> Self {
        self.lenient_configuration = lenient;
        self
    }

    /// Basedir for tests that set none
    ///
    /// The configured value, else the `basedir` environment variable, else
    /// the working directory.
    ///
    /// # Errors
    /// Returns [`ConfigError::Basedir`] when the working directory is unavailable.
    pub fn default_basedir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(basedir) = &self.default_basedir {
            return Ok(basedir.clone());
        }
        if let Some(basedir) = std::env::var_os(BASEDIR_ENV).filter(|value| !value.is_empty()) {
            return Ok(PathBuf::from(basedir));
        }
        std::env::current_dir().map_err(|err| ConfigError::Basedir(err.to_string()))
    }

    /// Load from a TOML or YAML file, chosen by extension
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] for a missing file and
    /// [`ConfigError::Parse`] for malformed content.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let origin = path.display().to_string();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&text).map_err(|err| ConfigError::parse(origin, err)),
            _ => serde_yaml::from_str(&text).map_err(|err| ConfigError::parse(origin, err)),
        }
    }

    /// Load from a YAML file
    ///
    /// # Errors
    /// As [`HarnessConfig::from_file`].
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        serde_yaml::from_str(&text).map_err(|err| ConfigError::parse(path.display().to_string(), err))
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::io_error(path, err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.descriptor_location, "META-INF/plugin.yaml");
        assert_eq!(config.project_file_name, "project.yaml");
        assert!(!config.lenient_configuration);
    }

    #[test]
    fn configured_basedir_wins() {
        let config = HarnessConfig::new().with_default_basedir("/fixed");
        assert_eq!(config.default_basedir().unwrap(), PathBuf::from("/fixed"));
    }

    #[test]
    fn loads_toml_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("harness.toml");
        fs::write(
            &toml_path,
            "resource_root = \"fixtures\"\nlenient_configuration = true\n[context]\nversion = \"1.0\"\n",
        )
        .unwrap();
        let config = HarnessConfig::from_file(&toml_path).unwrap();
        assert_eq!(config.resource_root, PathBuf::from("fixtures"));
        assert!(config.lenient_configuration);
        assert_eq!(config.context.get("version").map(String::as_str), Some("1.0"));
        assert_eq!(config.project_file_name, "project.yaml");

        let yaml_path = dir.path().join("harness.yaml");
        fs::write(&yaml_path, "descriptor_location: plugin.yaml\n").unwrap();
        let config = HarnessConfig::from_yaml_file(&yaml_path).unwrap();
        assert_eq!(config.descriptor_location, "plugin.yaml");
    }

    #[test]
    fn missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            HarnessConfig::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::NotFound(_))
        ));
        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "resource_root: [unclosed").unwrap();
        assert!(matches!(HarnessConfig::from_file(&bad), Err(ConfigError::Parse { .. })));
    }
}
