//! Process-wide singleton slots keyed by type.
//!
//! Each type owns at most one slot. [`Registry::get_or_try_register`] marks
//! the slot as under construction before running its initialiser, so a
//! re-entrant request for the same type fails with
//! [`RegistryError::UnderConstruction`] instead of building a second instance.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use thiserror::Error;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Errors raised by registry lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No instance of the type has been registered.
    #[error("no instance of {type_name} has been constructed")]
    NotConstructed {
        /// Requested type.
        type_name: &'static str,
    },
    /// The instance is still being constructed.
    #[error("{type_name} is still under construction")]
    UnderConstruction {
        /// Requested type.
        type_name: &'static str,
    },
    /// The slot holds a value of another type.
    #[error("slot for {type_name} holds a value of another type")]
    TypeMismatch {
        /// Requested type.
        type_name: &'static str,
    },
}

enum Slot {
    Constructing,
    Ready(Arc<dyn Any + Send + Sync>),
}

/// Type-keyed store holding one shared instance per type.
#[derive(Default)]
pub struct Registry {
    slots: Mutex<HashMap<TypeId, Slot>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Stores `instance`, returning the instance it replaced.
    pub fn register<T: Any + Send + Sync>(&self, instance: Arc<T>) -> Option<Arc<T>> {
        let previous = self.lock().insert(TypeId::of::<T>(), Slot::Ready(instance));
        match previous {
            Some(Slot::Ready(previous)) => previous.downcast::<T>().ok(),
            Some(Slot::Constructing) | None => None,
        }
    }

    /// Returns the registered instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotConstructed`] when no instance exists and
    /// [`RegistryError::UnderConstruction`] while one is being built.
    pub fn get_instance<T: Any + Send + Sync>(&self) -> Result<Arc<T>, RegistryError> {
        let slots = self.lock();
        Self::ready::<T>(&slots)
    }

    /// Returns `true` when a finished instance of `T` is registered.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        matches!(self.lock().get(&TypeId::of::<T>()), Some(Slot::Ready(_)))
    }

    /// Removes and returns the instance of `T`.
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let mut slots = self.lock();
        let type_id = TypeId::of::<T>();
        if !matches!(slots.get(&type_id), Some(Slot::Ready(_))) {
            return None;
        }
        match slots.remove(&type_id) {
            Some(Slot::Ready(instance)) => instance.downcast::<T>().ok(),
            Some(Slot::Constructing) | None => None,
        }
    }

    /// Returns the instance of `T`, constructing it with `init` on first use.
    ///
    /// The lock is released while `init` runs. A failed or panicking
    /// initialiser leaves the slot empty.
    ///
    /// The under-construction marker does not record which thread claimed
    /// the slot. A caller on another thread that arrives while `init` is
    /// still running gets [`RegistryError::UnderConstruction`] rather than
    /// waiting for the instance; construction is expected to run on a single
    /// thread.
    ///
    /// # Errors
    ///
    /// Returns the initialiser's error, or [`RegistryError::UnderConstruction`]
    /// (converted into `E`) when called re-entrantly for `T`.
    pub fn get_or_try_register<T, E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        E: From<RegistryError>,
        F: FnOnce() -> Result<T, E>,
    {
        let type_id = TypeId::of::<T>();
        {
            let mut slots = self.lock();
            match Self::ready::<T>(&slots) {
                Ok(instance) => return Ok(instance),
                Err(RegistryError::NotConstructed { .. }) => {
                    slots.insert(type_id, Slot::Constructing);
                }
                Err(error) => return Err(error.into()),
            }
        }

        let mut guard = ConstructionGuard {
            registry: self,
            type_id,
            armed: true,
        };
        let instance = Arc::new(init()?);
        self.lock()
            .insert(type_id, Slot::Ready(Arc::clone(&instance) as Arc<dyn Any + Send + Sync>));
        guard.armed = false;
        Ok(instance)
    }

    fn ready<T: Any + Send + Sync>(
        slots: &HashMap<TypeId, Slot>,
    ) -> Result<Arc<T>, RegistryError> {
        let type_name = std::any::type_name::<T>();
        match slots.get(&TypeId::of::<T>()) {
            None => Err(RegistryError::NotConstructed { type_name }),
            Some(Slot::Constructing) => Err(RegistryError::UnderConstruction { type_name }),
            Some(Slot::Ready(instance)) => Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_| RegistryError::TypeMismatch { type_name }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

struct ConstructionGuard<'a> {
    registry: &'a Registry,
    type_id: TypeId,
    armed: bool,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.registry.lock();
            if matches!(slots.get(&self.type_id), Some(Slot::Constructing)) {
                slots.remove(&self.type_id);
            }
        }
    }
}
