//! Scoped singletons
//!
//! A [`Scope`] holds one instance per type while it is open:
//! - Instances are seeded explicitly or created on first access
//! - Repeated lookups return the same `Arc`
//! - Everything is dropped on exit
//!
//! [`ScopeStack`] pairs the session scope with the execution scope and keeps
//! the execution scope strictly inside the session scope.

use crate::error::ScopeError;
use crate::value::ComponentRef;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, trace};

/// Which scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Lives for the whole simulated build session
    Session,
    /// Lives for one goal execution
    Execution,
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => f.write_str("session"),
            Self::Execution => f.write_str("execution"),
        }
    }
}

/// Open/closed store of per-type singletons
#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    bindings: Mutex<Option<HashMap<TypeId, ComponentRef>>>,
}

impl Scope {
    /// Create closed scope
    #[must_use]
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: Mutex::new(None),
        }
    }

    /// Which scope this is
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Whether the scope is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.bindings.lock().is_some()
    }

    /// Open the scope
    ///
    /// # Errors
    /// Returns [`ScopeError::AlreadyOpen`] when the scope is open.
    pub fn enter(&self) -> Result<(), ScopeError> {
        let mut bindings = self.bindings.lock();
        if bindings.is_some() {
            return Err(ScopeError::AlreadyOpen(self.kind));
        }
        *bindings = Some(HashMap::new());
        debug!(scope = %self.kind, "scope entered");
        Ok(())
    }

    /// Close the scope, dropping every binding
    ///
    /// # Errors
    /// Returns [`ScopeError::NotOpen`] when the scope is closed.
    pub fn exit(&self) -> Result<(), ScopeError> {
        let released = self
            .bindings
            .lock()
            .take()
            .ok_or(ScopeError::NotOpen(self.kind))?;
        debug!(scope = %self.kind, released = released.len(), "scope exited");
        Ok(())
    }

    /// Bind `instance` for `T`, replacing an earlier binding
    ///
    /// # Errors
    /// Returns [`ScopeError::NotOpen`] when the scope is closed.
    pub fn seed<T: Any + Send + Sync>(&self, instance: Arc<T>) -> Result<(), ScopeError> {
        let mut bindings = self.bindings.lock();
        let map = bindings.as_mut().ok_or(ScopeError::NotOpen(self.kind))?;
        if map.insert(TypeId::of::<T>(), instance).is_some() {
            trace!(scope = %self.kind, r#type = std::any::type_name::<T>(), "seed replaced binding");
        }
        Ok(())
    }

    /// Instance bound for `T`, if any
    ///
    /// # Errors
    /// Returns [`ScopeError::NotOpen`] when the scope is closed.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>, ScopeError> {
        let bindings = self.bindings.lock();
        let map = bindings.as_ref().ok_or(ScopeError::NotOpen(self.kind))?;
        Ok(map
            .get(&TypeId::of::<T>())
            .and_then(|instance| Arc::clone(instance).downcast::<T>().ok()))
    }

    /// Instance bound for `T`, creating it with `factory` on first access
    ///
    /// The factory runs without the scope lock held, so it may use the scope
    /// itself. When another binding for `T` lands meanwhile, that one wins.
    ///
    /// # Errors
    /// Returns [`ScopeError::NotOpen`] when the scope is closed, also when it
    /// was closed while the factory ran.
    pub fn get_or_seed_with<T, F>(&self, factory: F) -> Result<Arc<T>, ScopeError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.binding_for::<T>()? {
            return Self::downcast(self.kind, existing);
        }

        let created = Arc::new(factory()) as ComponentRef;

        let mut bindings = self.bindings.lock();
        let map = bindings.as_mut().ok_or(ScopeError::NotOpen(self.kind))?;
        let entry = map.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(scope = %self.kind, r#type = std::any::type_name::<T>(), "created on first access");
            created
        });
        Self::downcast(self.kind, Arc::clone(entry))
    }

    fn binding_for<T: Any>(&self) -> Result<Option<ComponentRef>, ScopeError> {
        let bindings = self.bindings.lock();
        let map = bindings.as_ref().ok_or(ScopeError::NotOpen(self.kind))?;
        Ok(map.get(&TypeId::of::<T>()).map(Arc::clone))
    }

    fn downcast<T: Any + Send + Sync>(kind: ScopeKind, instance: ComponentRef) -> Result<Arc<T>, ScopeError> {
        instance.downcast::<T>().map_err(|_| ScopeError::ForeignBinding {
            scope: kind,
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Number of live bindings, `None` when closed
    #[must_use]
    pub fn binding_count(&self) -> Option<usize> {
        self.bindings.lock().as_ref().map(HashMap::len)
    }
}

/// Session scope with the execution scope nested inside
#[derive(Debug)]
pub struct ScopeStack {
    session: Scope,
    execution: Scope,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Create with both scopes closed
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: Scope::new(ScopeKind::Session),
            execution: Scope::new(ScopeKind::Execution),
        }
    }

    /// Session scope
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Scope {
        &self.session
    }

    /// Execution scope
    #[inline]
    #[must_use]
    pub fn execution(&self) -> &Scope {
        &self.execution
    }

    /// Scope by kind
    #[inline]
    #[must_use]
    pub fn scope(&self, kind: ScopeKind) -> &Scope {
        match kind {
            ScopeKind::Session => &self.session,
            ScopeKind::Execution => &self.execution,
        }
    }

    /// Open the session scope
    ///
    /// # Errors
    /// Returns [`ScopeError::AlreadyOpen`] when it is open.
    pub fn enter_session(&self) -> Result<(), ScopeError> {
        self.session.enter()
    }

    /// Open the execution scope
    ///
    /// # Errors
    /// Returns [`ScopeError::Nesting`] when the session scope is closed.
    pub fn enter_execution(&self) -> Result<(), ScopeError> {
        if !self.session.is_open() {
            return Err(ScopeError::Nesting("execution scope entered outside a session"));
        }
        self.execution.enter()
    }

    /// Close the execution scope
    ///
    /// # Errors
    /// Returns [`ScopeError::NotOpen`] when it is closed.
    pub fn exit_execution(&self) -> Result<(), ScopeError> {
        self.execution.exit()
    }

    /// Close the session scope
    ///
    /// # Errors
    /// Returns [`ScopeError::Nesting`] while the execution scope is open.
    pub fn exit_session(&self) -> Result<(), ScopeError> {
        if self.execution.is_open() {
            return Err(ScopeError::Nesting("session scope exited while an execution is open"));
        }
        self.session.exit()
    }

    /// Instance for `T` from the innermost open scope that binds it
    #[must_use]
    pub fn lookup<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        [&self.execution, &self.session]
            .into_iter()
            .find_map(|scope| scope.get::<T>().ok().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Marker(u32);

    #[test]
    fn enter_twice_fails() {
        let scope = Scope::new(ScopeKind::Session);
        scope.enter().unwrap();
        assert_eq!(scope.enter(), Err(ScopeError::AlreadyOpen(ScopeKind::Session)));
    }

    #[test]
    fn closed_scope_rejects_use() {
        let scope = Scope::new(ScopeKind::Execution);
        assert_eq!(scope.exit(), Err(ScopeError::NotOpen(ScopeKind::Execution)));
        assert_eq!(
            scope.seed(Arc::new(Marker(1))),
            Err(ScopeError::NotOpen(ScopeKind::Execution))
        );
        assert!(scope.get::<Marker>().is_err());
        assert!(scope.get_or_seed_with(Marker::default).is_err());
    }

    #[test]
    fn seed_and_get() {
        let scope = Scope::new(ScopeKind::Session);
        scope.enter().unwrap();
        let marker = Arc::new(Marker(7));
        scope.seed(Arc::clone(&marker)).unwrap();
        let found = scope.get::<Marker>().unwrap().unwrap();
        assert!(Arc::ptr_eq(&marker, &found));
        assert!(scope.get::<String>().unwrap().is_none());
        assert_eq!(scope.binding_count(), Some(1));
    }

    #[test]
    fn first_access_memoized() {
        let scope = Scope::new(ScopeKind::Execution);
        scope.enter().unwrap();
        let mut calls = 0;
        let first = scope
            .get_or_seed_with(|| {
                calls += 1;
                Marker(1)
            })
            .unwrap();
        let second = scope.get_or_seed_with(|| Marker(2)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.0, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn factory_may_use_its_own_scope() {
        let scope = Scope::new(ScopeKind::Session);
        scope.enter().unwrap();
        scope.seed(Arc::new(Marker(4))).unwrap();

        let derived = scope
            .get_or_seed_with(|| {
                let base = scope.get::<Marker>().unwrap().unwrap();
                format!("derived-{}", base.0)
            })
            .unwrap();
        assert_eq!(derived.as_str(), "derived-4");
        assert_eq!(scope.binding_count(), Some(2));
    }

    #[test]
    fn binding_seeded_during_factory_wins() {
        let scope = Scope::new(ScopeKind::Execution);
        scope.enter().unwrap();
        let seeded = Arc::new(Marker(9));

        let found = scope
            .get_or_seed_with(|| {
                scope.seed(Arc::clone(&seeded)).unwrap();
                Marker(1)
            })
            .unwrap();
        assert!(Arc::ptr_eq(&found, &seeded));
        assert_eq!(scope.get::<Marker>().unwrap().unwrap().0, 9);
    }

    #[test]
    fn scope_closed_during_factory() {
        let scope = Scope::new(ScopeKind::Execution);
        scope.enter().unwrap();

        let result = scope.get_or_seed_with(|| {
            scope.exit().unwrap();
            Marker(1)
        });
        assert_eq!(result.unwrap_err(), ScopeError::NotOpen(ScopeKind::Execution));
    }

    #[test]
    fn foreign_binding_is_reported() {
        let stored: ComponentRef = Arc::new(String::from("not a marker"));
        let err = Scope::downcast::<Marker>(ScopeKind::Session, stored).unwrap_err();

        assert!(matches!(
            err,
            ScopeError::ForeignBinding {
                scope: ScopeKind::Session,
                type_name,
            } if type_name.ends_with("Marker")
        ));
        assert!(!matches!(err, ScopeError::Nesting(_)));
        assert!(err.to_string().starts_with("session scope binding for"));
    }

    #[test]
    fn exit_drops_bindings() {
        let scope = Scope::new(ScopeKind::Session);
        scope.enter().unwrap();
        let marker = Arc::new(Marker(3));
        scope.seed(Arc::clone(&marker)).unwrap();
        assert_eq!(Arc::strong_count(&marker), 2);
        scope.exit().unwrap();
        assert_eq!(Arc::strong_count(&marker), 1);
        assert!(!scope.is_open());

        scope.enter().unwrap();
        assert!(scope.get::<Marker>().unwrap().is_none());
    }

    #[test]
    fn execution_requires_session() {
        let stack = ScopeStack::new();
        assert!(matches!(stack.enter_execution(), Err(ScopeError::Nesting(_))));
        stack.enter_session().unwrap();
        stack.enter_execution().unwrap();
        assert!(matches!(stack.exit_session(), Err(ScopeError::Nesting(_))));
        stack.exit_execution().unwrap();
        stack.exit_session().unwrap();
    }

    #[test]
    fn lookup_prefers_execution() {
        let stack = ScopeStack::new();
        stack.enter_session().unwrap();
        stack.enter_execution().unwrap();
        stack.session().seed(Arc::new(Marker(1))).unwrap();
        assert_eq!(stack.lookup::<Marker>().unwrap().0, 1);
        stack.execution().seed(Arc::new(Marker(2))).unwrap();
        assert_eq!(stack.lookup::<Marker>().unwrap().0, 2);

        stack.exit_execution().unwrap();
        assert_eq!(stack.lookup::<Marker>().unwrap().0, 1);
    }
}
