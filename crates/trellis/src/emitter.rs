//! Emitters: objects built against the host that push updates to clients.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::ComponentError;
use crate::host::Host;

type EmitterFactory =
    dyn Fn(&dyn Host) -> Result<Box<dyn Any + Send + Sync>, ComponentError> + Send + Sync;

/// Declared emitter.
#[derive(Clone)]
pub struct EmitterDescriptor {
    name: String,
    factory: Arc<EmitterFactory>,
}

impl EmitterDescriptor {
    /// Declares an emitter built by `factory` from the assembled host.
    #[must_use]
    pub fn new<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Host) -> Result<T, ComponentError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move |host: &dyn Host| {
                factory(host).map(|emitter| Box::new(emitter) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn construct(
        &self,
        host: &dyn Host,
    ) -> Result<Box<dyn Any + Send + Sync>, ComponentError> {
        (self.factory)(host)
    }
}

impl fmt::Debug for EmitterDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EmitterDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Constructed emitters in declaration order.
#[derive(Default)]
pub struct EmitterRegistry {
    entries: Vec<(String, Box<dyn Any + Send + Sync>)>,
}

impl EmitterRegistry {
    pub(crate) fn push(&mut self, name: impl Into<String>, emitter: Box<dyn Any + Send + Sync>) {
        self.entries.push((name.into(), emitter));
    }

    /// Borrows the emitter declared under `name` as `T`.
    ///
    /// When a name is declared more than once the latest declaration wins.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .rev()
            .find(|(entry, _)| entry == name)
            .and_then(|(_, emitter)| emitter.downcast_ref::<T>())
    }

    /// Declared names in construction order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of constructed emitters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no emitter was constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EmitterRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.names()).finish()
    }
}
