//! Expression evaluation
//!
//! Configuration values may embed `${...}` expressions. [`ContextEvaluator`]
//! resolves them against the session, project and execution a goal runs in;
//! [`FallbackEvaluator`] wraps any evaluator and, when it yields nothing for a
//! whole `${name}` expression, looks the name up as a container component.

use crate::container::Container;
use crate::error::ExpressionError;
use crate::model::{Execution, Project, Session, BUILD_DIRECTORY, OUTPUT_DIRECTORY};
use crate::value::{ComponentRef, Value, ValueType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Evaluates configuration expressions
#[cfg_attr(test, mockall::automock)]
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression`, `expected` being the type of the receiving field
    ///
    /// Returns `None` when a whole-string expression does not resolve.
    ///
    /// # Errors
    /// Returns [`ExpressionError`] for malformed expressions.
    fn evaluate<'a>(&self, expression: &str, expected: Option<&'a ValueType>)
        -> Result<Option<Value>, ExpressionError>;

    /// Absolute form of `path`, relative paths taken against the base directory
    fn align_to_basedir(&self, path: &Path) -> PathBuf;
}

// ============================================================================
// Expression syntax
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

/// Split `text` into literal runs and `${...}` expressions
fn segments(text: &str) -> Result<Vec<Segment<'_>>, ExpressionError> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        // `$${` is an escaped literal `${`
        if start > 0 && rest.as_bytes()[start - 1] == b'$' {
            if start > 1 {
                parts.push(Segment::Literal(&rest[..start - 1]));
            }
            parts.push(Segment::Literal("${"));
            rest = &rest[start + 2..];
            continue;
        }
        if start > 0 {
            parts.push(Segment::Literal(&rest[..start]));
        }
        let body = &rest[start + 2..];
        let end = body
            .find('}')
            .ok_or_else(|| ExpressionError::Unterminated(text.to_owned()))?;
        let key = body[..end].trim();
        if key.is_empty() {
            return Err(ExpressionError::Empty(text.to_owned()));
        }
        parts.push(Segment::Expression(key));
        rest = &body[end + 1..];
    }
    if !rest.is_empty() {
        parts.push(Segment::Literal(rest));
    }
    Ok(parts)
}

/// `name` of an expression of the exact form `${name}`
fn strip_tokens(expression: &str) -> Option<&str> {
    let name = expression.strip_prefix("${")?.strip_suffix('}')?.trim();
    if name.is_empty() || name.contains('}') || name.contains("${") {
        return None;
    }
    Some(name)
}

// ============================================================================
// Context evaluator
// ============================================================================

/// Evaluator over the simulated build model
///
/// Plain `${key}` expressions are looked up in the session's user
/// properties, then its system properties, then the project properties.
#[derive(Debug, Clone)]
pub struct ContextEvaluator {
    basedir: PathBuf,
    session: Option<Arc<Session>>,
    project: Option<Arc<Project>>,
    execution: Option<Arc<Execution>>,
}

impl ContextEvaluator {
    /// Create evaluator rooted at `basedir`
    #[must_use]
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            session: None,
            project: None,
            execution: None,
        }
    }

    /// With session
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// With project
    #[inline]
    #[must_use]
    pub fn with_project(mut self, project: Arc<Project>) -> Self {
        self.project = Some(project);
        self
    }

    /// With execution
    #[inline]
    #[must_use]
    pub fn with_execution(mut self, execution: Arc<Execution>) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Project basedir when known, else the evaluator's own
    #[must_use]
    pub fn basedir(&self) -> PathBuf {
        self.project
            .as_ref()
            .and_then(|project| project.basedir())
            .unwrap_or_else(|| self.basedir.clone())
    }

    fn resolve(&self, key: &str) -> Option<Value> {
        let project = self.project.as_deref();
        match key {
            "basedir" | "project.basedir" => Some(Value::Path(self.basedir())),
            "project.build.directory" => Some(Value::Path(self.basedir().join(BUILD_DIRECTORY))),
            "project.build.outputDirectory" => Some(Value::Path(
                self.basedir().join(BUILD_DIRECTORY).join(OUTPUT_DIRECTORY),
            )),
            "project.groupId" => project.map(|p| Value::Text(p.group_id())),
            "project.artifactId" => project.map(|p| Value::Text(p.artifact_id())),
            "project.version" => project.map(|p| Value::Text(p.version())),
            "session" => self
                .session
                .as_ref()
                .map(|s| Value::Component(Arc::clone(s) as ComponentRef)),
            "project" => self
                .project
                .as_ref()
                .map(|p| Value::Component(Arc::clone(p) as ComponentRef)),
            "execution" => self
                .execution
                .as_ref()
                .map(|e| Value::Component(Arc::clone(e) as ComponentRef)),
            "goal" | "execution.goal" => self
                .execution
                .as_ref()
                .and_then(|e| e.goal_name())
                .map(Value::Text),
            _ => {
                if let Some(property) = key.strip_prefix("project.properties.") {
                    return project.and_then(|p| p.property(property)).map(Value::Text);
                }
                self.property(key).map(Value::Text)
            }
        }
    }

    fn property(&self, key: &str) -> Option<String> {
        let session = self.session.as_deref();
        session
            .and_then(|s| s.user_property(key))
            .or_else(|| session.and_then(|s| s.system_property(key)))
            .or_else(|| self.project.as_deref().and_then(|p| p.property(key)))
    }
}

impl ExpressionEvaluator for ContextEvaluator {
    fn evaluate<'a>(&self, expression: &str, _expected: Option<&'a ValueType>) -> Result<Option<Value>, ExpressionError> {
        let parts = segments(expression)?;
        if let [Segment::Expression(key)] = parts.as_slice() {
            let value = self.resolve(key);
            trace!(expression, resolved = value.is_some(), "evaluated");
            return Ok(value);
        }

        let mut text = String::with_capacity(expression.len());
        for part in parts {
            match part {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Expression(key) => match self.resolve(key).and_then(|value| value.render()) {
                    Some(rendered) => text.push_str(&rendered),
                    None => {
                        text.push_str("${");
                        text.push_str(key);
                        text.push('}');
                    }
                },
            }
        }
        Ok(Some(Value::Text(text)))
    }

    fn align_to_basedir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.basedir().join(path)
        }
    }
}

// ============================================================================
// Container fallback
// ============================================================================

/// Evaluator that falls back to container lookups
///
/// When the base evaluator yields nothing for `${name}`, a component
/// registered under hint `name` is returned instead: of the expected
/// component type, or of any type when no type is expected. Lookup failures
/// are reported as "no value", never as errors.
pub struct FallbackEvaluator<E> {
    base: E,
    container: Arc<dyn Container>,
}

impl<E> FallbackEvaluator<E> {
    /// Wrap `base`
    #[must_use]
    pub fn new(base: E, container: Arc<dyn Container>) -> Self {
        Self { base, container }
    }

    /// Wrapped evaluator
    #[inline]
    #[must_use]
    pub fn base(&self) -> &E {
        &self.base
    }
}

impl<E: ExpressionEvaluator> ExpressionEvaluator for FallbackEvaluator<E> {
    fn evaluate<'a>(&self, expression: &str, expected: Option<&'a ValueType>) -> Result<Option<Value>, ExpressionError> {
        if let Some(value) = self.base.evaluate(expression, expected)? {
            return Ok(Some(value));
        }
        let Some(hint) = strip_tokens(expression) else {
            return Ok(None);
        };

        let found = match expected {
            Some(ValueType::Component { type_id, type_name }) => self.container.lookup_dyn(*type_id, *type_name, hint),
            None => self.container.lookup_any(hint),
            Some(_) => return Ok(None),
        };
        match found {
            Ok(component) => {
                debug!(hint, "expression resolved from container");
                Ok(Some(Value::Component(component)))
            }
            Err(err) => {
                debug!(hint, error = %err, "container fallback found nothing");
                Ok(None)
            }
        }
    }

    fn align_to_basedir(&self, path: &Path) -> PathBuf {
        self.base.align_to_basedir(path)
    }
}
