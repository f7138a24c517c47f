//! Error types for injection, scoping and binding

use crate::scope::ScopeKind;

/// Errors raised by a container lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Nothing is registered for the type and hint
    #[error("no component of type {type_name} with hint '{hint}'")]
    NotFound {
        /// Requested type (or role)
        type_name: String,
        /// Requested hint
        hint: String,
    },

    /// A component exists for the hint but has another type
    #[error("component '{hint}' is a {actual}, not a {expected}")]
    TypeMismatch {
        /// Hint that was looked up
        hint: String,
        /// Requested type
        expected: String,
        /// Type actually registered
        actual: String,
    },

    /// A component is declared but no factory knows its implementation
    #[error("no factory registered for implementation '{0}'")]
    NoFactory(String),
}

impl LookupError {
    /// Create not found error
    pub fn not_found(type_name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            hint: hint.into(),
        }
    }
}

/// Misuse of a scope's enter/exit protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// `enter` on a scope that is already open
    #[error("{0} scope is already open")]
    AlreadyOpen(ScopeKind),

    /// Operation on a scope that is not open
    #[error("{0} scope is not open")]
    NotOpen(ScopeKind),

    /// Execution scope used outside the session scope
    #[error("scope nesting violated: {0}")]
    Nesting(&'static str),

    /// Binding under a type's key holds an instance of another type
    #[error("{scope} scope binding for {type_name} holds another type")]
    ForeignBinding {
        /// Scope holding the binding
        scope: ScopeKind,
        /// Type that was requested
        type_name: &'static str,
    },
}

/// Malformed expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// `${` without a closing `}`
    #[error("unterminated expression in '{0}'")]
    Unterminated(String),

    /// `${}`
    #[error("empty expression in '{0}'")]
    Empty(String),
}

/// Errors raised while reading or writing named fields
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// No layer of the type declares the field
    #[error("field '{field}' not found on {type_name}")]
    NotFound {
        /// Requested field
        field: String,
        /// Target type
        type_name: &'static str,
    },

    /// Value does not match the declared field type
    #[error("field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Declared type
        expected: String,
        /// Supplied value kind
        actual: String,
    },

    /// Directory used with an object of another type
    #[error("field directory for {expected} used on another type")]
    TargetMismatch {
        /// Type the directory describes
        expected: &'static str,
    },

    /// Configuration text cannot be converted to the field type
    #[error("cannot convert '{value}' for field '{field}': {reason}")]
    Coercion {
        /// Field name
        field: String,
        /// Offending text
        value: String,
        /// Why it failed
        reason: String,
    },

    /// Expression in the configuration is malformed
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

impl FieldError {
    /// Create not found error
    pub fn not_found(field: impl Into<String>, type_name: &'static str) -> Self {
        Self::NotFound {
            field: field.into(),
            type_name,
        }
    }

    /// Create type mismatch error
    pub fn type_mismatch(field: impl Into<String>, expected: impl ToString, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    /// Create coercion error
    pub fn coercion(field: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Coercion {
            field: field.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
