//! Values and declared types for goal fields
//!
//! [`ValueType`] describes what a field holds, [`Value`] carries what is
//! read from or written to it. [`FieldValue`] connects both to concrete Rust
//! field types.

use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared, type-erased component
pub type ComponentRef = Arc<dyn Any + Send + Sync>;

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// Text
    Text,
    /// `true` / `false`
    Bool,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// Filesystem path, aligned to the base directory when bound
    Path,
    /// Ordered list of one element type
    List(Box<ValueType>),
    /// Injected component
    Component {
        /// Component type
        type_id: TypeId,
        /// Component type name, for messages
        type_name: &'static str,
    },
}

impl ValueType {
    /// Component type for `T`
    #[inline]
    #[must_use]
    pub fn component<T: Any>() -> Self {
        Self::Component {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// List of `inner`
    #[inline]
    #[must_use]
    pub fn list(inner: ValueType) -> Self {
        Self::List(Box::new(inner))
    }

    /// True for types configured from a single text value
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Text | Self::Bool | Self::Int | Self::Float | Self::Path)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Path => f.write_str("path"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Component { type_name, .. } => f.write_str(type_name),
        }
    }
}

/// Field value
#[derive(Clone)]
pub enum Value {
    /// Text
    Text(String),
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Path
    Path(PathBuf),
    /// List
    List(Vec<Value>),
    /// Component instance
    Component(ComponentRef),
}

impl Value {
    /// Text value
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Component value
    #[inline]
    #[must_use]
    pub fn component<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        Self::Component(instance)
    }

    /// Short name of the variant, for messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Path(_) => "path",
            Self::List(_) => "list",
            Self::Component(_) => "component",
        }
    }

    /// Text content
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Path content
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Boolean content
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Component downcast to `T`
    #[must_use]
    pub fn as_component<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Component(component) => Arc::clone(component).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Rendering used when a value is embedded in surrounding text
    ///
    /// Components have no text form.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(x) => Some(x.to_string()),
            Self::Path(path) => Some(path.display().to_string()),
            Self::List(items) => items
                .iter()
                .map(Value::render)
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            Self::Component(_) => None,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Component(component) => {
                write!(f, "Component({:p})", Arc::as_ptr(component))
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Path(a), Self::Path(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

// ============================================================================
// Rust field types
// ============================================================================

/// Rust type that can back a named field
///
/// `Option<V>` reads as absent when `None`; `Arc<C>` fields hold components.
pub trait FieldValue: Sized + Send + Sync + 'static {
    /// Declared type of the field
    fn value_type() -> ValueType;

    /// Current content, `None` when unset
    fn to_value(&self) -> Option<Value>;

    /// Convert a bound value, or report the kind that was supplied
    ///
    /// # Errors
    /// Returns the supplied value's kind when it cannot be held.
    fn from_value(value: Value) -> Result<Self, String>;
}

impl FieldValue for String {
    fn value_type() -> ValueType {
        ValueType::Text
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl FieldValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl FieldValue for i64 {
    fn value_type() -> ValueType {
        ValueType::Int
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Int(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl FieldValue for f64 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Float(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(x) => Ok(x),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(i as f64),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl FieldValue for PathBuf {
    fn value_type() -> ValueType {
        ValueType::Path
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Path(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Path(path) => Ok(path),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl<V: FieldValue> FieldValue for Vec<V> {
    fn value_type() -> ValueType {
        ValueType::list(V::value_type())
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::List(self.iter().filter_map(FieldValue::to_value).collect()))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::List(items) => items.into_iter().map(V::from_value).collect(),
            other => Err(other.kind().to_owned()),
        }
    }
}

impl<V: FieldValue> FieldValue for Option<V> {
    fn value_type() -> ValueType {
        V::value_type()
    }

    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        V::from_value(value).map(Some)
    }
}

impl<C: Any + Send + Sync> FieldValue for Arc<C> {
    fn value_type() -> ValueType {
        ValueType::component::<C>()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Component(Arc::clone(self) as ComponentRef))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Component(component) => component
                .downcast::<C>()
                .map_err(|_| "component of another type".to_owned()),
            other => Err(other.kind().to_owned()),
        }
    }
}
