//! Component container
//!
//! Components are registered per `(type, hint)` and shared as `Arc`s. Plugin
//! descriptors bind `(role, hint)` pairs to implementation names, and
//! [`Factories`] map those names to constructors, which is how goals and
//! helper components are created without class loading.

use crate::error::LookupError;
use crate::goal::Goal;
use crate::value::ComponentRef;
use harness_config::descriptor::{DEFAULT_HINT, GOAL_ROLE};
use harness_config::ComponentDescriptor;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Constructor for a goal implementation
pub type GoalFactory = Arc<dyn Fn() -> Box<dyn Goal> + Send + Sync>;

/// Constructor for a helper component implementation
pub type ComponentFactory = Arc<dyn Fn() -> ComponentRef + Send + Sync>;

/// Goal created by a container
pub struct GoalInstance {
    /// Implementation name the goal was created from
    pub implementation: String,
    /// The goal
    pub goal: Box<dyn Goal>,
}

impl fmt::Debug for GoalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalInstance")
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}

/// Lookup and registration of components
pub trait Container: Send + Sync {
    /// Component of `type_id` registered under `hint`
    ///
    /// # Errors
    /// [`LookupError::NotFound`] when nothing matches, [`LookupError::TypeMismatch`]
    /// when the hint names a component of another type.
    fn lookup_dyn(&self, type_id: TypeId, type_name: &'static str, hint: &str) -> Result<ComponentRef, LookupError>;

    /// Component of any type registered under `hint`
    ///
    /// # Errors
    /// [`LookupError::NotFound`] when nothing matches.
    fn lookup_any(&self, hint: &str) -> Result<ComponentRef, LookupError>;

    /// Whether a component of `type_id` is registered under `hint`
    fn has_component(&self, type_id: TypeId, hint: &str) -> bool;

    /// Register an instance, replacing any earlier one for the same type and hint
    fn add_component_dyn(&self, instance: ComponentRef, type_id: TypeId, type_name: &'static str, hint: &str);

    /// Register a component descriptor
    fn add_component_descriptor(&self, descriptor: ComponentDescriptor);

    /// Create the goal bound to `(role, hint)`
    ///
    /// # Errors
    /// [`LookupError::NotFound`] when no descriptor matches,
    /// [`LookupError::NoFactory`] when its implementation is unknown.
    fn instantiate(&self, role: &str, hint: &str) -> Result<GoalInstance, LookupError>;
}

/// Typed helpers over [`Container`]
pub trait ContainerExt: Container {
    /// Component of type `T` under `hint`
    ///
    /// # Errors
    /// As [`Container::lookup_dyn`].
    fn lookup<T: Any + Send + Sync>(&self, hint: &str) -> Result<Arc<T>, LookupError> {
        let type_name = std::any::type_name::<T>();
        let instance = self.lookup_dyn(TypeId::of::<T>(), type_name, hint)?;
        instance.downcast::<T>().map_err(|_| LookupError::TypeMismatch {
            hint: hint.to_owned(),
            expected: type_name.to_owned(),
            actual: "another type".to_owned(),
        })
    }

    /// Component of type `T` under the default hint
    ///
    /// # Errors
    /// As [`Container::lookup_dyn`].
    fn lookup_default<T: Any + Send + Sync>(&self) -> Result<Arc<T>, LookupError> {
        self.lookup::<T>(DEFAULT_HINT)
    }

    /// Whether a `T` is registered under the default hint
    fn has<T: Any + Send + Sync>(&self) -> bool {
        self.has_component(TypeId::of::<T>(), DEFAULT_HINT)
    }

    /// Register a `T` under `hint`
    fn add<T: Any + Send + Sync>(&self, instance: Arc<T>, hint: &str) {
        self.add_component_dyn(instance, TypeId::of::<T>(), std::any::type_name::<T>(), hint);
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}

// ============================================================================
// Factories
// ============================================================================

/// Constructors keyed by implementation name
#[derive(Clone, Default)]
pub struct Factories {
    goals: HashMap<String, GoalFactory>,
    components: HashMap<String, ComponentFactory>,
}

impl fmt::Debug for Factories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factories")
            .field("goals", &self.goals.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Factories {
    /// Create empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With goal constructor
    #[must_use]
    pub fn with_goal<F>(mut self, implementation: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Goal> + Send + Sync + 'static,
    {
        self.register_goal(implementation, factory);
        self
    }

    /// With goal constructed through `Default`
    #[must_use]
    pub fn with_default_goal<G: Goal + Default + 'static>(self, implementation: impl Into<String>) -> Self {
        self.with_goal(implementation, || Box::new(G::default()))
    }

    /// With component constructor
    #[must_use]
    pub fn with_component<T, F>(mut self, implementation: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_component(implementation, factory);
        self
    }

    /// Register goal constructor
    pub fn register_goal<F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Goal> + Send + Sync + 'static,
    {
        self.goals.insert(implementation.into(), Arc::new(factory));
    }

    /// Register component constructor
    pub fn register_component<T, F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.components.insert(
            implementation.into(),
            Arc::new(move || Arc::new(factory()) as ComponentRef),
        );
    }

    /// Goal constructor by implementation name
    #[must_use]
    pub fn goal(&self, implementation: &str) -> Option<&GoalFactory> {
        self.goals.get(implementation)
    }

    /// Component constructor by implementation name
    #[must_use]
    pub fn component(&self, implementation: &str) -> Option<&ComponentFactory> {
        self.components.get(implementation)
    }
}

// ============================================================================
// Default container
// ============================================================================

struct Entry {
    type_name: &'static str,
    instance: ComponentRef,
}

#[derive(Default)]
struct Registry {
    instances: HashMap<(TypeId, String), Entry>,
    /// Types registered per hint, in registration order
    by_hint: HashMap<String, Vec<TypeId>>,
    descriptors: Vec<ComponentDescriptor>,
}

impl Registry {
    fn insert(&mut self, instance: ComponentRef, type_id: TypeId, type_name: &'static str, hint: &str) {
        let replaced = self
            .instances
            .insert((type_id, hint.to_owned()), Entry { type_name, instance })
            .is_some();
        if !replaced {
            self.by_hint.entry(hint.to_owned()).or_default().push(type_id);
        }
    }

    /// Name of some other type registered under `hint`
    fn other_type(&self, type_id: TypeId, hint: &str) -> Option<&'static str> {
        self.by_hint
            .get(hint)?
            .iter()
            .find(|other| **other != type_id)
            .and_then(|other| self.instances.get(&(*other, hint.to_owned())))
            .map(|entry| entry.type_name)
    }

    fn helper_descriptor(&self, hint: &str) -> Option<&ComponentDescriptor> {
        self.descriptors
            .iter()
            .rev()
            .find(|d| d.role() != GOAL_ROLE && d.role_hint() == hint)
    }
}

/// Thread-safe in-memory container
pub struct DefaultContainer {
    registry: RwLock<Registry>,
    factories: Factories,
}

impl fmt::Debug for DefaultContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("DefaultContainer")
            .field("instances", &registry.instances.len())
            .field("descriptors", &registry.descriptors.len())
            .field("factories", &self.factories)
            .finish()
    }
}

impl Default for DefaultContainer {
    fn default() -> Self {
        Self::new(Factories::default())
    }
}

impl DefaultContainer {
    /// Create container using `factories` for declared implementations
    #[must_use]
    pub fn new(factories: Factories) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            factories,
        }
    }

    /// Registered component descriptors
    #[must_use]
    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.registry.read().descriptors.clone()
    }

    /// Create a helper component for `hint`, from a descriptor or a factory named `hint`
    fn create(&self, hint: &str) -> Result<Option<ComponentRef>, LookupError> {
        let implementation = {
            let registry = self.registry.read();
            match registry.helper_descriptor(hint) {
                Some(descriptor) => descriptor.implementation().to_owned(),
                None if self.factories.component(hint).is_some() => hint.to_owned(),
                None => return Ok(None),
            }
        };
        let factory = self
            .factories
            .component(&implementation)
            .ok_or_else(|| LookupError::NoFactory(implementation.clone()))?;
        trace!(hint, implementation = %implementation, "creating component");
        Ok(Some(factory()))
    }
}

impl Container for DefaultContainer {
    fn lookup_dyn(&self, type_id: TypeId, type_name: &'static str, hint: &str) -> Result<ComponentRef, LookupError> {
        {
            let registry = self.registry.read();
            if let Some(entry) = registry.instances.get(&(type_id, hint.to_owned())) {
                return Ok(Arc::clone(&entry.instance));
            }
            if let Some(actual) = registry.other_type(type_id, hint) {
                return Err(LookupError::TypeMismatch {
                    hint: hint.to_owned(),
                    expected: type_name.to_owned(),
                    actual: actual.to_owned(),
                });
            }
        }

        let Some(created) = self.create(hint)? else {
            return Err(LookupError::not_found(type_name, hint));
        };
        let actual = (*created).type_id();
        if actual != type_id {
            return Err(LookupError::TypeMismatch {
                hint: hint.to_owned(),
                expected: type_name.to_owned(),
                actual: "a component of another type".to_owned(),
            });
        }

        let mut registry = self.registry.write();
        // another thread may have created it meanwhile; first one wins
        if let Some(entry) = registry.instances.get(&(type_id, hint.to_owned())) {
            return Ok(Arc::clone(&entry.instance));
        }
        registry.insert(Arc::clone(&created), type_id, type_name, hint);
        Ok(created)
    }

    fn lookup_any(&self, hint: &str) -> Result<ComponentRef, LookupError> {
        {
            let registry = self.registry.read();
            let first = registry
                .by_hint
                .get(hint)
                .and_then(|types| types.first())
                .and_then(|type_id| registry.instances.get(&(*type_id, hint.to_owned())));
            if let Some(entry) = first {
                return Ok(Arc::clone(&entry.instance));
            }
        }

        let created = self
            .create(hint)?
            .ok_or_else(|| LookupError::not_found("any", hint))?;
        let type_id = (*created).type_id();
        let mut registry = self.registry.write();
        registry.insert(Arc::clone(&created), type_id, "dynamic component", hint);
        Ok(created)
    }

    fn has_component(&self, type_id: TypeId, hint: &str) -> bool {
        self.registry
            .read()
            .instances
            .contains_key(&(type_id, hint.to_owned()))
    }

    fn add_component_dyn(&self, instance: ComponentRef, type_id: TypeId, type_name: &'static str, hint: &str) {
        debug!(r#type = type_name, hint, "component registered");
        self.registry.write().insert(instance, type_id, type_name, hint);
    }

    fn add_component_descriptor(&self, descriptor: ComponentDescriptor) {
        trace!(
            role = descriptor.role(),
            hint = descriptor.role_hint(),
            implementation = descriptor.implementation(),
            "component descriptor registered"
        );
        self.registry.write().descriptors.push(descriptor);
    }

    fn instantiate(&self, role: &str, hint: &str) -> Result<GoalInstance, LookupError> {
        let implementation = self
            .registry
            .read()
            .descriptors
            .iter()
            .rev()
            .find(|d| d.role() == role && d.role_hint() == hint)
            .map(|d| d.implementation().to_owned())
            .ok_or_else(|| LookupError::not_found(role, hint))?;

        let factory = self
            .factories
            .goal(&implementation)
            .ok_or_else(|| LookupError::NoFactory(implementation.clone()))?;
        debug!(role, hint, implementation = %implementation, "goal instantiated");
        Ok(GoalInstance {
            implementation,
            goal: factory(),
        })
    }
}

// ============================================================================
// Stand-ins
// ============================================================================

/// Where a bound collaborator came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Registered before the harness looked for it
    Registered,
    /// Created by the harness because nothing was registered
    StandIn,
}

/// Collaborator resolved by [`ensure_binding`]
#[derive(Debug)]
pub struct Binding<T> {
    /// The collaborator
    pub instance: Arc<T>,
    /// Where it came from
    pub provenance: Provenance,
}

impl<T> Binding<T> {
    /// Whether the harness created this collaborator
    #[inline]
    #[must_use]
    pub fn is_stand_in(&self) -> bool {
        self.provenance == Provenance::StandIn
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            provenance: self.provenance,
        }
    }
}

/// Use the registered `T`, or register a stand-in built by `stand_in`
///
/// # Errors
/// Only when a registered component cannot be looked up.
pub fn ensure_binding<T, F>(container: &dyn Container, stand_in: F) -> Result<Binding<T>, LookupError>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    if container.has::<T>() {
        return Ok(Binding {
            instance: container.lookup_default::<T>()?,
            provenance: Provenance::Registered,
        });
    }
    let instance = Arc::new(stand_in());
    container.add(Arc::clone(&instance), DEFAULT_HINT);
    trace!(r#type = std::any::type_name::<T>(), "stand-in registered");
    Ok(Binding {
        instance,
        provenance: Provenance::StandIn,
    })
}
