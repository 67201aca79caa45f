//! Caller services and the registry holding their instances.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use trellis_config::MaterializedConfig;

use crate::error::ComponentError;

/// Service constructed from its materialized configuration.
pub trait Service: Any + Send + Sync + Sized {
    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is unusable.
    fn from_config(config: &MaterializedConfig) -> Result<Self, ComponentError>;
}

/// Identity of a service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    /// Identity of `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type identifier.
    #[must_use]
    pub const fn id(self) -> TypeId {
        self.id
    }

    /// Type name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name)
    }
}

/// Type-erased service constructor.
pub trait ServiceFactory: Send + Sync {
    /// Type the factory produces.
    fn service_type(&self) -> ServiceType;

    /// Constructs an instance.
    ///
    /// # Errors
    ///
    /// Returns the constructor's failure.
    fn construct(
        &self,
        config: &MaterializedConfig,
    ) -> Result<Arc<dyn Any + Send + Sync>, ComponentError>;
}

pub(crate) struct TypedFactory<S>(PhantomData<fn() -> S>);

impl<S> TypedFactory<S> {
    pub(crate) const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Service> ServiceFactory for TypedFactory<S> {
    fn service_type(&self) -> ServiceType {
        ServiceType::of::<S>()
    }

    fn construct(
        &self,
        config: &MaterializedConfig,
    ) -> Result<Arc<dyn Any + Send + Sync>, ComponentError> {
        let service = S::from_config(config)?;
        Ok(Arc::new(service))
    }
}

pub(crate) struct FnFactory<S, F> {
    constructor: F,
    _service: PhantomData<fn() -> S>,
}

impl<S, F> FnFactory<S, F> {
    pub(crate) const fn new(constructor: F) -> Self {
        Self {
            constructor,
            _service: PhantomData,
        }
    }
}

impl<S, F> ServiceFactory for FnFactory<S, F>
where
    S: Any + Send + Sync,
    F: Fn(&MaterializedConfig) -> Result<S, ComponentError> + Send + Sync,
{
    fn service_type(&self) -> ServiceType {
        ServiceType::of::<S>()
    }

    fn construct(
        &self,
        config: &MaterializedConfig,
    ) -> Result<Arc<dyn Any + Send + Sync>, ComponentError> {
        let service = (self.constructor)(config)?;
        Ok(Arc::new(service))
    }
}

/// Constructed service together with the declaration it came from.
#[derive(Clone)]
pub struct ServiceEntry {
    name: String,
    service_type: ServiceType,
    instance: Arc<dyn Any + Send + Sync>,
}

impl ServiceEntry {
    /// Declared service name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Type of the instance.
    #[must_use]
    pub const fn service_type(&self) -> ServiceType {
        self.service_type
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("service_type", &self.service_type)
            .finish_non_exhaustive()
    }
}

/// Services keyed by type; one instance per type.
#[derive(Debug, Default, Clone)]
pub struct ServiceRegistry {
    entries: HashMap<TypeId, ServiceEntry>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an instance, returning the entry it displaced.
    pub(crate) fn insert(
        &mut self,
        name: impl Into<String>,
        service_type: ServiceType,
        instance: Arc<dyn Any + Send + Sync>,
    ) -> Option<ServiceEntry> {
        self.entries.insert(
            service_type.id(),
            ServiceEntry {
                name: name.into(),
                service_type,
                instance,
            },
        )
    }

    /// Borrows the instance of `S`.
    #[must_use]
    pub fn get<S: Any + Send + Sync>(&self) -> Option<&S> {
        self.entries
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.instance.downcast_ref::<S>())
    }

    /// Shares the instance of `S`.
    #[must_use]
    pub fn get_arc<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        self.entries
            .get(&TypeId::of::<S>())
            .and_then(|entry| Arc::clone(&entry.instance).downcast::<S>().ok())
    }

    /// Entry of the service declared under `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ServiceEntry> {
        self.entries.values().find(|entry| entry.name == name)
    }

    /// Returns `true` when an instance of `S` is registered.
    #[must_use]
    pub fn contains<S: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<S>())
    }

    /// Declared names of every registered service, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(ServiceEntry::name).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no service is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
