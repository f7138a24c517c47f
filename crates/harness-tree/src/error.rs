//! Error types for configuration trees

/// Errors raised while building a tree from a document
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Document is not valid YAML
    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Mapping key that cannot be used as a node name
    #[error("unsupported key in '{node}': keys must be scalars")]
    InvalidKey {
        /// Node holding the offending key
        node: String,
    },

    /// Attribute whose value is a mapping or a sequence
    #[error("attribute '{attribute}' on '{node}' must be a scalar")]
    NonScalarAttribute {
        /// Node carrying the attribute
        node: String,
        /// Attribute name (without the `@` prefix)
        attribute: String,
    },

    /// Document root is not a mapping
    #[error("document root must be a mapping, got {0}")]
    InvalidRoot(&'static str),
}

impl TreeError {
    /// Create non-scalar attribute error
    pub fn non_scalar_attribute(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::NonScalarAttribute {
            node: node.into(),
            attribute: attribute.into(),
        }
    }
}
