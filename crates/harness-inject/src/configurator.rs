//! Binding resolved configuration onto goal fields
//!
//! Each child of a `configuration` node names a field. Its text is evaluated
//! with the field's type as the expected type, falling back to the
//! `default-value` attribute when nothing resolves, then converted and
//! written through the goal's field directory.

use crate::container::Container;
use crate::error::FieldError;
use crate::evaluator::ExpressionEvaluator;
use crate::fields::Configurable;
use crate::value::{Value, ValueType};
use harness_config::descriptor::{DEFAULT_VALUE_ATTRIBUTE, IMPLEMENTATION_ATTRIBUTE};
use harness_tree::ConfigNode;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// Writes configuration values into [`Configurable`] targets
#[derive(Clone, Default)]
pub struct Configurator {
    lenient: bool,
    container: Option<Arc<dyn Container>>,
}

impl std::fmt::Debug for Configurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configurator")
            .field("lenient", &self.lenient)
            .field("container", &self.container.is_some())
            .finish()
    }
}

impl Configurator {
    /// Create strict configurator: unknown configuration is an error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore configuration that matches no field
    #[inline]
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Resolve `implementation` hints of component fields in `container`
    #[inline]
    #[must_use]
    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Bind every child of `configuration` onto `target`
    ///
    /// Repeated children bind only their first occurrence. A child with no
    /// value and no default leaves its field untouched.
    ///
    /// # Errors
    /// - [`FieldError::NotFound`] for a child matching no field (strict mode)
    /// - [`FieldError::Coercion`] / [`FieldError::TypeMismatch`] when a value does not fit
    /// - [`FieldError::Expression`] for malformed expressions
    pub fn configure<C: Configurable + ?Sized>(
        &self,
        target: &mut C,
        configuration: &ConfigNode,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<(), FieldError> {
        let fields = target.fields();
        let mut seen = HashSet::new();

        for child in configuration.children() {
            let name = child.name();
            if !seen.insert(name) {
                trace!(field = name, "repeated configuration ignored");
                continue;
            }
            let Some(ty) = fields.field_type(name) else {
                if self.lenient {
                    debug!(field = name, target = fields.type_name(), "no such field, configuration ignored");
                    continue;
                }
                return Err(FieldError::not_found(name, fields.type_name()));
            };

            match self.coerce(name, &ty, child, evaluator)? {
                Some(value) => {
                    trace!(field = name, value = ?value, "binding field");
                    fields.write(target.as_any_mut(), name, value)?;
                }
                None => trace!(field = name, "no value, field left as is"),
            }
        }
        Ok(())
    }

    fn coerce(
        &self,
        field: &str,
        ty: &ValueType,
        node: &ConfigNode,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<Option<Value>, FieldError> {
        match ty {
            ValueType::List(inner) => self.coerce_list(field, inner, node, evaluator),
            ValueType::Component { type_id, type_name } => {
                if let Some(value) = source_value(node, ty, evaluator)? {
                    return match value {
                        Value::Component(_) => Ok(Some(value)),
                        other => Err(FieldError::type_mismatch(field, ty, other.kind())),
                    };
                }
                let (Some(hint), Some(container)) = (node.attribute(IMPLEMENTATION_ATTRIBUTE), &self.container)
                else {
                    return Ok(None);
                };
                container
                    .lookup_dyn(*type_id, *type_name, hint)
                    .map(|component| Some(Value::Component(component)))
                    .map_err(|err| FieldError::coercion(field, hint, err))
            }
            scalar => match source_value(node, scalar, evaluator)? {
                Some(value) => convert_scalar(field, scalar, value, evaluator).map(Some),
                None => Ok(None),
            },
        }
    }

    fn coerce_list(
        &self,
        field: &str,
        inner: &ValueType,
        node: &ConfigNode,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<Option<Value>, FieldError> {
        if node.child_count() > 0 {
            let mut items = Vec::with_capacity(node.child_count());
            for child in node.children() {
                if let Some(item) = self.coerce(field, inner, child, evaluator)? {
                    items.push(item);
                }
            }
            return Ok(Some(Value::List(items)));
        }

        let list_type = ValueType::list(inner.clone());
        let Some(value) = source_value(node, &list_type, evaluator)? else {
            return Ok(None);
        };
        let items = match value {
            Value::List(items) => items,
            Value::Text(text) if text.is_empty() => Vec::new(),
            Value::Text(text) => text.split(',').map(|item| Value::text(item.trim())).collect(),
            single => vec![single],
        };
        items
            .into_iter()
            .map(|item| match inner {
                ValueType::Component { .. } | ValueType::List(_) => Ok(item),
                scalar => convert_scalar(field, scalar, item, evaluator),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Some(Value::List(items)))
    }
}

/// Evaluated node value, else the evaluated `default-value` attribute
fn source_value(
    node: &ConfigNode,
    expected: &ValueType,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<Option<Value>, FieldError> {
    if let Some(text) = node.value() {
        if let Some(value) = evaluator.evaluate(text, Some(expected))? {
            return Ok(Some(value));
        }
    }
    match node.attribute(DEFAULT_VALUE_ATTRIBUTE) {
        Some(default) => Ok(evaluator.evaluate(default, Some(expected))?),
        None => Ok(None),
    }
}

fn convert_scalar(
    field: &str,
    ty: &ValueType,
    value: Value,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<Value, FieldError> {
    let text = match (ty, value) {
        (ValueType::Text, Value::Text(text)) => return Ok(Value::Text(text)),
        (ValueType::Bool, Value::Bool(b)) => return Ok(Value::Bool(b)),
        (ValueType::Int, Value::Int(i)) => return Ok(Value::Int(i)),
        (ValueType::Float, Value::Float(x)) => return Ok(Value::Float(x)),
        (ValueType::Path, Value::Path(path)) => return Ok(Value::Path(evaluator.align_to_basedir(&path))),
        (_, other) => other
            .render()
            .ok_or_else(|| FieldError::type_mismatch(field, ty, other.kind()))?,
    };

    match ty {
        ValueType::Text => Ok(Value::Text(text)),
        ValueType::Bool => match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(FieldError::coercion(field, text.as_str(), "expected true or false")),
        },
        ValueType::Int => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|err| FieldError::coercion(field, text.as_str(), err)),
        ValueType::Float => text
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|err| FieldError::coercion(field, text.as_str(), err)),
        ValueType::Path => Ok(Value::Path(evaluator.align_to_basedir(&PathBuf::from(text)))),
        ValueType::List(_) | ValueType::Component { .. } => Err(FieldError::type_mismatch(field, ty, "text")),
    }
}
