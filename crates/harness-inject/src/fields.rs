//! Named-field directories
//!
//! Goals expose their configurable state through a [`FieldDirectory`] built
//! once per type, instead of runtime reflection:
//! - Each field has a name, a [`ValueType`], a getter and a setter
//! - Ancestor state embedded in a type contributes its own layer via
//!   [`FieldDirectory::extend`]
//! - Layers are ordered most-derived first, so a redeclared name shadows the
//!   ancestor's field
//!
//! ```
//! use harness_inject::{read_field, write_field, Configurable, FieldDirectory, Fields, Value};
//! use once_cell::sync::Lazy;
//!
//! #[derive(Default)]
//! struct Compile {
//!     source: Option<String>,
//! }
//!
//! static FIELDS: Lazy<FieldDirectory<Compile>> =
//!     Lazy::new(|| FieldDirectory::<Compile>::new().field("source", |c| &c.source, |c| &mut c.source));
//!
//! impl Configurable for Compile {
//!     fn fields(&self) -> &'static dyn Fields {
//!         &*FIELDS
//!     }
//! }
//!
//! let mut goal = Compile::default();
//! write_field(&mut goal, "source", "1.8").unwrap();
//! assert_eq!(read_field(&goal, "source").unwrap(), Some(Value::text("1.8")));
//! ```

use crate::error::FieldError;
use crate::value::{FieldValue, Value, ValueType};
use indexmap::IndexMap;
use std::any::Any;
use std::sync::Arc;

type Getter<T> = Arc<dyn Fn(&T) -> Option<Value> + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;

struct FieldSpec<T> {
    name: &'static str,
    ty: ValueType,
    get: Getter<T>,
    set: Setter<T>,
}

struct Layer<T> {
    owner: &'static str,
    fields: Vec<FieldSpec<T>>,
}

/// Per-type table of named fields
pub struct FieldDirectory<T> {
    type_name: &'static str,
    layers: Vec<Layer<T>>,
}

impl<T: 'static> Default for FieldDirectory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> FieldDirectory<T> {
    /// Create directory with one empty layer for `T`
    #[must_use]
    pub fn new() -> Self {
        let type_name = std::any::type_name::<T>();
        Self {
            type_name,
            layers: vec![Layer {
                owner: type_name,
                fields: Vec::new(),
            }],
        }
    }

    /// With field backed by a struct member
    #[must_use]
    pub fn field<V: FieldValue>(
        self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.custom(
            name,
            V::value_type(),
            move |target: &T| get(target).to_value(),
            move |target: &mut T, value| {
                *get_mut(target) = V::from_value(value)?;
                Ok(())
            },
        )
    }

    /// With field read and written through arbitrary functions
    ///
    /// The setter reports the kind of value it could not accept.
    #[must_use]
    pub fn custom<G, S>(mut self, name: &'static str, ty: ValueType, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), String> + Send + Sync + 'static,
    {
        if let Some(own) = self.layers.first_mut() {
            own.fields.push(FieldSpec {
                name,
                ty,
                get: Arc::new(get),
                set: Arc::new(set),
            });
        }
        self
    }

    /// With the layers of an embedded ancestor appended
    #[must_use]
    pub fn extend<P: 'static>(
        mut self,
        parent: &FieldDirectory<P>,
        project: fn(&T) -> &P,
        project_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        for layer in &parent.layers {
            let fields = layer
                .fields
                .iter()
                .map(|spec| {
                    let get = Arc::clone(&spec.get);
                    let set = Arc::clone(&spec.set);
                    FieldSpec {
                        name: spec.name,
                        ty: spec.ty.clone(),
                        get: Arc::new(move |target: &T| get(project(target))) as Getter<T>,
                        set: Arc::new(move |target: &mut T, value| set(project_mut(target), value)) as Setter<T>,
                    }
                })
                .collect();
            self.layers.push(Layer {
                owner: layer.owner,
                fields,
            });
        }
        self
    }

    fn find(&self, name: &str) -> Option<&FieldSpec<T>> {
        self.layers
            .iter()
            .find_map(|layer| layer.fields.iter().find(|spec| spec.name == name))
    }

    /// Read a field of `target`
    ///
    /// # Errors
    /// Returns [`FieldError::NotFound`] when no layer declares `name`.
    pub fn get(&self, target: &T, name: &str) -> Result<Option<Value>, FieldError> {
        let spec = self
            .find(name)
            .ok_or_else(|| FieldError::not_found(name, self.type_name))?;
        Ok((spec.get)(target))
    }

    /// Write a field of `target`
    ///
    /// # Errors
    /// Returns [`FieldError::NotFound`] when no layer declares `name` and
    /// [`FieldError::TypeMismatch`] when the value does not fit the field.
    pub fn set(&self, target: &mut T, name: &str, value: Value) -> Result<(), FieldError> {
        let spec = self
            .find(name)
            .ok_or_else(|| FieldError::not_found(name, self.type_name))?;
        (spec.set)(target, value).map_err(|actual| FieldError::type_mismatch(name, &spec.ty, actual))
    }

    /// Every field of every layer, the most-derived declaration winning
    #[must_use]
    pub fn get_all(&self, target: &T) -> IndexMap<&'static str, Option<Value>> {
        let mut values = IndexMap::new();
        for spec in self.layers.iter().flat_map(|layer| &layer.fields) {
            values.entry(spec.name).or_insert_with(|| (spec.get)(target));
        }
        values
    }

    /// Type that declares the visible field `name`
    #[must_use]
    pub fn declared_in(&self, name: &str) -> Option<&'static str> {
        self.layers
            .iter()
            .find(|layer| layer.fields.iter().any(|spec| spec.name == name))
            .map(|layer| layer.owner)
    }
}

/// Type-erased view of a [`FieldDirectory`]
pub trait Fields: Send + Sync {
    /// Type the directory describes
    fn type_name(&self) -> &'static str;

    /// Declared type of the visible field `name`
    fn field_type(&self, name: &str) -> Option<ValueType>;

    /// Visible field names, most-derived layer first
    fn field_names(&self) -> Vec<&'static str>;

    /// Read a field
    ///
    /// # Errors
    /// [`FieldError::TargetMismatch`] for a target of another type, otherwise
    /// as [`FieldDirectory::get`].
    fn read(&self, target: &dyn Any, name: &str) -> Result<Option<Value>, FieldError>;

    /// Write a field
    ///
    /// # Errors
    /// [`FieldError::TargetMismatch`] for a target of another type, otherwise
    /// as [`FieldDirectory::set`].
    fn write(&self, target: &mut dyn Any, name: &str, value: Value) -> Result<(), FieldError>;

    /// Read every visible field
    ///
    /// # Errors
    /// [`FieldError::TargetMismatch`] for a target of another type.
    fn read_all(&self, target: &dyn Any) -> Result<IndexMap<&'static str, Option<Value>>, FieldError>;
}

impl<T: Any> Fields for FieldDirectory<T> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn field_type(&self, name: &str) -> Option<ValueType> {
        self.find(name).map(|spec| spec.ty.clone())
    }

    fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for spec in self.layers.iter().flat_map(|layer| &layer.fields) {
            if !names.contains(&spec.name) {
                names.push(spec.name);
            }
        }
        names
    }

    fn read(&self, target: &dyn Any, name: &str) -> Result<Option<Value>, FieldError> {
        let target = target.downcast_ref::<T>().ok_or(FieldError::TargetMismatch {
            expected: self.type_name,
        })?;
        self.get(target, name)
    }

    fn write(&self, target: &mut dyn Any, name: &str, value: Value) -> Result<(), FieldError> {
        let target = target.downcast_mut::<T>().ok_or(FieldError::TargetMismatch {
            expected: self.type_name,
        })?;
        self.set(target, name, value)
    }

    fn read_all(&self, target: &dyn Any) -> Result<IndexMap<&'static str, Option<Value>>, FieldError> {
        let target = target.downcast_ref::<T>().ok_or(FieldError::TargetMismatch {
            expected: self.type_name,
        })?;
        Ok(self.get_all(target))
    }
}

/// Access to `self` as [`Any`], implemented for every `'static` type
///
/// Call through a deref (`(*goal).as_any()`) when holding a `Box<dyn Goal>`,
/// otherwise the box itself is what gets viewed.
pub trait AsAny: Any {
    /// Shared view
    fn as_any(&self) -> &dyn Any;

    /// Mutable view
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Object whose state is reachable through a field directory
pub trait Configurable: AsAny {
    /// Directory describing this object's type
    fn fields(&self) -> &'static dyn Fields;
}

/// Read a field by name, searching ancestor layers
///
/// # Errors
/// Returns [`FieldError::NotFound`] for an unknown name.
pub fn read_field<C: Configurable + ?Sized>(target: &C, name: &str) -> Result<Option<Value>, FieldError> {
    target.fields().read(target.as_any(), name)
}

/// Read a field and convert it to a Rust type
///
/// `Ok(None)` when the field is unset.
///
/// # Errors
/// Returns [`FieldError::NotFound`] for an unknown name and
/// [`FieldError::TypeMismatch`] when the value is not a `V`.
pub fn read_field_as<V: FieldValue, C: Configurable + ?Sized>(target: &C, name: &str) -> Result<Option<V>, FieldError> {
    read_field(target, name)?
        .map(|value| V::from_value(value).map_err(|actual| FieldError::type_mismatch(name, V::value_type(), actual)))
        .transpose()
}

/// Write a field by name without going through a setter of the goal
///
/// # Errors
/// Returns [`FieldError::NotFound`] for an unknown name and
/// [`FieldError::TypeMismatch`] when the value does not fit.
pub fn write_field<C: Configurable + ?Sized>(
    target: &mut C,
    name: &str,
    value: impl Into<Value>,
) -> Result<(), FieldError> {
    let fields = target.fields();
    fields.write(target.as_any_mut(), name, value.into())
}

/// Every field across all layers, the most-derived declaration winning
///
/// # Errors
/// Only fails for a directory that does not describe `target`.
pub fn read_all_fields<C: Configurable + ?Sized>(
    target: &C,
) -> Result<IndexMap<&'static str, Option<Value>>, FieldError> {
    target.fields().read_all(target.as_any())
}

/// Declared type of a field
///
/// # Errors
/// Returns [`FieldError::NotFound`] for an unknown name.
pub fn field_type<C: Configurable + ?Sized>(target: &C, name: &str) -> Result<ValueType, FieldError> {
    let fields = target.fields();
    fields
        .field_type(name)
        .ok_or_else(|| FieldError::not_found(name, fields.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Base {
        skip: bool,
        encoding: Option<String>,
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        encoding: Option<String>,
        count: i64,
        dirs: Vec<PathBuf>,
    }

    static BASE_FIELDS: Lazy<FieldDirectory<Base>> = Lazy::new(|| {
        FieldDirectory::<Base>::new()
            .field("skip", |b| &b.skip, |b| &mut b.skip)
            .field("encoding", |b| &b.encoding, |b| &mut b.encoding)
    });

    static DERIVED_FIELDS: Lazy<FieldDirectory<Derived>> = Lazy::new(|| {
        FieldDirectory::<Derived>::new()
            .field("encoding", |d| &d.encoding, |d| &mut d.encoding)
            .field("count", |d| &d.count, |d| &mut d.count)
            .field("dirs", |d| &d.dirs, |d| &mut d.dirs)
            .extend(&*BASE_FIELDS, |d| &d.base, |d| &mut d.base)
    });

    impl Configurable for Base {
        fn fields(&self) -> &'static dyn Fields {
            &*BASE_FIELDS
        }
    }

    impl Configurable for Derived {
        fn fields(&self) -> &'static dyn Fields {
            &*DERIVED_FIELDS
        }
    }

    #[test]
    fn ancestor_field_reachable() {
        let mut derived = Derived::default();
        write_field(&mut derived, "skip", true).unwrap();
        assert!(derived.base.skip);
        assert_eq!(read_field(&derived, "skip").unwrap(), Some(Value::Bool(true)));
        assert_eq!(DERIVED_FIELDS.declared_in("skip"), Some(std::any::type_name::<Base>()));
    }

    #[test]
    fn most_derived_shadows() {
        let mut derived = Derived::default();
        derived.base.encoding = Some("base".into());
        write_field(&mut derived, "encoding", "derived").unwrap();
        assert_eq!(derived.encoding.as_deref(), Some("derived"));
        assert_eq!(derived.base.encoding.as_deref(), Some("base"));

        let all = read_all_fields(&derived).unwrap();
        assert_eq!(all["encoding"], Some(Value::text("derived")));
        let names: Vec<_> = all.keys().copied().collect();
        assert_eq!(names, vec!["encoding", "count", "dirs", "skip"]);
    }

    #[test]
    fn unknown_field() {
        let derived = Derived::default();
        assert!(matches!(read_field(&derived, "missing"), Err(FieldError::NotFound { .. })));
        assert!(matches!(field_type(&derived, "missing"), Err(FieldError::NotFound { .. })));
    }

    #[test]
    fn wrong_value_kind() {
        let mut derived = Derived::default();
        let err = write_field(&mut derived, "count", "seven").unwrap_err();
        assert!(matches!(err, FieldError::TypeMismatch { .. }));
        assert_eq!(derived.count, 0);
    }

    #[test]
    fn typed_read() {
        let mut derived = Derived::default();
        assert_eq!(read_field_as::<String, _>(&derived, "encoding").unwrap(), None);
        derived.count = 4;
        assert_eq!(read_field_as::<i64, _>(&derived, "count").unwrap(), Some(4));
        assert!(read_field_as::<bool, _>(&derived, "count").is_err());
    }

    #[test]
    fn list_field() {
        let mut derived = Derived::default();
        write_field(
            &mut derived,
            "dirs",
            Value::List(vec![Value::Path("/a".into()), Value::Path("/b".into())]),
        )
        .unwrap();
        assert_eq!(derived.dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(field_type(&derived, "dirs").unwrap(), ValueType::list(ValueType::Path));
    }

    #[test]
    fn directory_rejects_foreign_target() {
        let base = Base::default();
        let err = DERIVED_FIELDS.read(&base, "skip").unwrap_err();
        assert!(matches!(err, FieldError::TargetMismatch { .. }));
    }

    #[test]
    fn works_through_trait_objects() {
        let mut boxed: Box<dyn Configurable> = Box::new(Derived::default());
        write_field(&mut *boxed, "count", Value::Int(9)).unwrap();
        assert_eq!(read_field(&*boxed, "count").unwrap(), Some(Value::Int(9)));
    }
}
