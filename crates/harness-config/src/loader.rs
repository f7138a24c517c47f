//! Plugin descriptor loading
//!
//! A descriptor can refer to `${basedir}` and any other context entry. The
//! document is parsed first and placeholders are substituted inside string
//! scalars only, so substituted text never changes the YAML structure.
//! Loading never registers components; callers decide what to do with
//! [`PluginDescriptor::components`].

use crate::descriptor::{PluginDescriptor, RawPlugin};
use crate::error::DescriptorError;
use crate::interpolate::interpolate;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Key under which a descriptor document may nest its content
const ROOT_KEY: &str = "plugin";

/// Loads plugin descriptors with placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct DescriptorLoader {
    context: IndexMap<String, String>,
}

impl DescriptorLoader {
    /// Create loader with a substitution context
    #[inline]
    #[must_use]
    pub fn new(context: IndexMap<String, String>) -> Self {
        Self { context }
    }

    /// With context entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Substitution context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &IndexMap<String, String> {
        &self.context
    }

    /// Load descriptor from text
    ///
    /// # Errors
    /// Returns [`DescriptorError::Parse`] when the text is not valid YAML,
    /// misses required fields or declares a parameter twice.
    pub fn load_str(&self, text: &str, origin: &str) -> Result<PluginDescriptor, DescriptorError> {
        let mut document: Value = serde_yaml::from_str(text).map_err(|e| DescriptorError::parse(origin, e))?;
        interpolate_strings(&mut document, &self.context);

        if let Value::Mapping(mapping) = &mut document {
            if mapping.len() == 1 {
                if let Some(inner) = mapping.remove(ROOT_KEY) {
                    document = inner;
                }
            }
        }

        let raw: RawPlugin =
            serde_yaml::from_value(document).map_err(|e| DescriptorError::parse(origin, e))?;
        let descriptor = raw.into_descriptor(origin)?;
        debug!(
            plugin = %descriptor.key(),
            goals = descriptor.goals().len(),
            components = descriptor.declared_components().len(),
            "loaded plugin descriptor"
        );
        Ok(descriptor)
    }

    /// Load descriptor from a reader
    ///
    /// # Errors
    /// Returns [`DescriptorError::Parse`] when the stream cannot be read as
    /// UTF-8 text, otherwise as [`DescriptorLoader::load_str`].
    pub fn load_reader<R: Read>(&self, mut reader: R, origin: &str) -> Result<PluginDescriptor, DescriptorError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| DescriptorError::parse(origin, e))?;
        self.load_str(&text, origin)
    }

    /// Load descriptor from a file
    ///
    /// # Errors
    /// Returns [`DescriptorError::NotFound`] when the file does not exist,
    /// [`DescriptorError::Io`] when it cannot be read, otherwise as
    /// [`DescriptorLoader::load_str`].
    pub fn load_path(&self, path: &Path) -> Result<PluginDescriptor, DescriptorError> {
        if !path.is_file() {
            return Err(DescriptorError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| DescriptorError::io_error(path, e))?;
        self.load_str(&text, &path.display().to_string())
    }

    /// Load descriptor from a location under a resource root
    ///
    /// # Errors
    /// As [`DescriptorLoader::load_path`].
    pub fn load_resource(&self, resource_root: &Path, location: &str) -> Result<PluginDescriptor, DescriptorError> {
        self.load_path(&resource_root.join(location))
    }
}

/// Substitute placeholders in every string scalar of `value`
fn interpolate_strings(value: &mut Value, context: &IndexMap<String, String>) {
    match value {
        Value::String(text) => {
            let substituted = match interpolate(text.as_str(), context) {
                Cow::Owned(substituted) => Some(substituted),
                Cow::Borrowed(_) => None,
            };
            if let Some(substituted) = substituted {
                *text = substituted;
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(|item| interpolate_strings(item, context)),
        Value::Mapping(mapping) => mapping
            .values_mut()
            .for_each(|item| interpolate_strings(item, context)),
        Value::Tagged(tagged) => interpolate_strings(&mut tagged.value, context),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{GOAL_ROLE, DEFAULT_HINT};

    const DESCRIPTOR: &str = r"
groupId: g
artifactId: a
version: '1.0'
components:
  - role: helper
    implementation: HelperImpl
goals:
  - goal: build
    implementation: BuildGoal
    parameters:
      - name: outDir
        defaultValue: ${basedir}/target
      - name: outputEncoding
        alias: encoding
        expression: ${encoding}
        defaultValue: UTF-8
";

    #[test]
    fn loads_and_interpolates() {
        let loader = DescriptorLoader::default().with_entry("basedir", "/work");
        let descriptor = loader.load_str(DESCRIPTOR, "inline").unwrap();

        assert_eq!(descriptor.key().to_string(), "g:a:1.0");
        let build = descriptor.goal("build").unwrap();
        assert_eq!(build.parameters()[0].default_value(), Some("/work/target"));
        // not in the context, left for the goal's evaluator
        assert_eq!(build.parameters()[1].expression(), Some("${encoding}"));
        assert_eq!(build.parameters()[1].alias(), Some("encoding"));
    }

    #[test]
    fn component_defaults_and_goal_components() {
        let descriptor = DescriptorLoader::default().load_str(DESCRIPTOR, "inline").unwrap();
        let components = descriptor.components();
        assert_eq!(components[0].role_hint(), DEFAULT_HINT);
        assert_eq!(components[1].role(), GOAL_ROLE);
        assert_eq!(components[1].role_hint(), "g:a:1.0:build");
    }

    #[test]
    fn nested_plugin_root() {
        let nested = format!("plugin:\n{}", DESCRIPTOR.lines().map(|l| format!("  {l}\n")).collect::<String>());
        let descriptor = DescriptorLoader::default().load_str(&nested, "inline").unwrap();
        assert_eq!(descriptor.artifact_id(), "a");
    }

    #[test]
    fn missing_required_field() {
        let err = DescriptorLoader::default()
            .load_str("groupId: g\nversion: '1'\n", "inline")
            .unwrap_err();
        assert!(matches!(err, DescriptorError::Parse { .. }));
    }

    #[test]
    fn duplicate_parameter() {
        let text = "groupId: g\nartifactId: a\nversion: '1'\ngoals:\n  - goal: x\n    implementation: X\n    parameters:\n      - name: p\n      - name: p\n";
        let err = DescriptorLoader::default().load_str(text, "inline").unwrap_err();
        assert!(err.to_string().contains("parameter 'p' twice"));
    }

    #[test]
    fn scalars_of_any_type_read_as_text() {
        let text = "groupId: g\nartifactId: a\nversion: 1.0\ngoals:\n  - goal: serve\n    implementation: Serve\n    parameters:\n      - name: port\n        defaultValue: 8080\n      - name: skip\n        defaultValue: false\n      - name: retries\n        alias: 3\n        expression: ~\n";
        let descriptor = DescriptorLoader::default().load_str(text, "inline").unwrap();

        assert_eq!(descriptor.version(), "1.0");
        let parameters = descriptor.goal("serve").unwrap().parameters();
        assert_eq!(parameters[0].default_value(), Some("8080"));
        assert_eq!(parameters[1].default_value(), Some("false"));
        assert_eq!(parameters[2].alias(), Some("3"));
        assert_eq!(parameters[2].expression(), None);
    }

    #[test]
    fn collection_where_scalar_expected() {
        let err = DescriptorLoader::default()
            .load_str("groupId: g\nartifactId: a\nversion: [1, 0]\n", "inline")
            .unwrap_err();
        assert!(matches!(err, DescriptorError::Parse { .. }));
        assert!(err.to_string().contains("expected a scalar, found a sequence"));
    }

    #[test]
    fn substituted_text_is_not_parsed_as_yaml() {
        for basedir in ["/tmp/build #2", "/tmp/x: y", "/tmp/'quoted'"] {
            let descriptor = DescriptorLoader::default()
                .with_entry("basedir", basedir)
                .load_str(DESCRIPTOR, "inline")
                .unwrap();
            let build = descriptor.goal("build").unwrap();
            assert_eq!(build.parameters()[0].default_value(), Some(format!("{basedir}/target").as_str()));
        }
    }

    #[test]
    fn placeholders_inside_keys_stay_literal() {
        let text = "groupId: g\nartifactId: a\nversion: '1'\n'${basedir}': ignored\n";
        let descriptor = DescriptorLoader::default()
            .with_entry("basedir", "groupId")
            .load_str(text, "inline")
            .unwrap();
        assert_eq!(descriptor.group_id(), "g");
    }

    #[test]
    fn missing_path() {
        let err = DescriptorLoader::default()
            .load_path(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, DescriptorError::NotFound(_)));
    }

    #[test]
    fn reader_input() {
        let descriptor = DescriptorLoader::default()
            .load_reader(DESCRIPTOR.as_bytes(), "reader")
            .unwrap();
        assert_eq!(descriptor.goals().len(), 1);
    }
}
