//! Built-in components and the provider that constructs them.
//!
//! The host is always assembled. The data layer and the realtime layer are
//! optional and enabled purely by the presence of their configuration
//! component among the scanned sources.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use trellis_config::{
    DATA_LAYER_COMPONENT, DataLayerConfig, HOST_COMPONENT, HostConfig, REALTIME_COMPONENT,
    RealtimeConfig, SourceMap,
};

use crate::app_error::AppError;
use crate::error::ComponentError;
use crate::host::{Host, HostParams, ServingHandle};

/// Built-in components an assembly may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinKind {
    /// HTTP-serving core.
    Host,
    /// Database access layer.
    DataLayer,
    /// Bidirectional event channel layer.
    Realtime,
}

impl BuiltinKind {
    /// Configuration component the built-in reads.
    #[must_use]
    pub const fn component(self) -> &'static str {
        match self {
            Self::Host => HOST_COMPONENT,
            Self::DataLayer => DATA_LAYER_COMPONENT,
            Self::Realtime => REALTIME_COMPONENT,
        }
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Host => "host",
            Self::DataLayer => "data_layer",
            Self::Realtime => "realtime",
        };
        formatter.write_str(label)
    }
}

/// Error returned when parsing a built-in kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported built-in kind: {0}")]
pub struct BuiltinKindParseError(String);

impl BuiltinKindParseError {
    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for BuiltinKind {
    type Err = BuiltinKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "data_layer" | "data layer" => Ok(Self::DataLayer),
            "realtime" => Ok(Self::Realtime),
            other => Err(BuiltinKindParseError(other.to_owned())),
        }
    }
}

/// Built-in component selected for construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinDescriptor {
    /// Host, constructed with its parameters.
    Host(HostParams),
    /// Data layer.
    DataLayer,
    /// Realtime layer.
    Realtime,
}

impl BuiltinDescriptor {
    /// Kind of built-in described.
    #[must_use]
    pub const fn kind(&self) -> BuiltinKind {
        match self {
            Self::Host(_) => BuiltinKind::Host,
            Self::DataLayer => BuiltinKind::DataLayer,
            Self::Realtime => BuiltinKind::Realtime,
        }
    }

    /// Built-ins enabled by `sources`, host first.
    #[must_use]
    pub fn discover(sources: &SourceMap, params: HostParams) -> Vec<Self> {
        let mut descriptors = vec![Self::Host(params)];
        if sources.contains(DATA_LAYER_COMPONENT) {
            descriptors.push(Self::DataLayer);
        }
        if sources.contains(REALTIME_COMPONENT) {
            descriptors.push(Self::Realtime);
        }
        descriptors
    }
}

/// Database access layer.
pub trait DataLayer: Send + Sync + 'static {
    /// Attaches the layer to the host's serving object.
    ///
    /// Called once, after the host exists and before any service is built.
    ///
    /// # Errors
    ///
    /// Returns an error when the layer cannot attach.
    fn setup(&mut self, handle: &ServingHandle) -> Result<(), ComponentError>;

    /// Initialises the migration repository.
    ///
    /// # Errors
    ///
    /// Returns an error when initialisation fails.
    fn init_migrations(&self) -> Result<(), ComponentError>;

    /// Generates a migration from model changes.
    ///
    /// # Errors
    ///
    /// Returns an error when generation fails.
    fn migrate(&self) -> Result<(), ComponentError>;

    /// Applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error when the upgrade fails.
    fn upgrade(&self) -> Result<(), ComponentError>;
}

/// Handler for the events of one realtime namespace.
pub trait NamespaceHandler: Send + Sync + 'static {
    /// Namespace the handler serves.
    fn namespace(&self) -> &str;

    /// Handles an incoming event, optionally answering with a payload.
    ///
    /// # Errors
    ///
    /// Returns the error passed to the namespace's error handler.
    fn on_event(&self, event: &str, payload: &Value) -> Result<Option<Value>, AppError> {
        let _ = (event, payload);
        Ok(None)
    }
}

/// Callback receiving errors raised inside a namespace.
pub type SocketErrorHandler = Arc<dyn Fn(&str, &AppError) + Send + Sync>;

/// Error handler bound to namespaces that declare none.
///
/// Logs the failure under the namespace it occurred in.
#[must_use]
pub fn default_socket_error_handler() -> SocketErrorHandler {
    Arc::new(|namespace, error| {
        tracing::error!(
            target: "trellis::sockets",
            event = "namespace_error",
            namespace,
            error = %error,
            "realtime namespace raised an error"
        );
    })
}

/// Bidirectional event channel layer.
pub trait Realtime: Send + Sync + 'static {
    /// Binds a namespace handler.
    ///
    /// # Errors
    ///
    /// Returns an error when the namespace cannot be bound.
    fn bind_namespace(&mut self, handler: Box<dyn NamespaceHandler>) -> Result<(), ComponentError>;

    /// Binds the error handler for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error when the handler cannot be bound.
    fn bind_error_handler(
        &mut self,
        namespace: &str,
        handler: SocketErrorHandler,
    ) -> Result<(), ComponentError>;

    /// Emits an event to connected clients.
    ///
    /// # Errors
    ///
    /// Returns an error when the event cannot be delivered.
    fn emit(&self, event: &str, payload: &Value, namespace: Option<&str>)
    -> Result<(), ComponentError>;
}

/// Constructs the built-in components of an assembly.
pub trait BuiltinProvider {
    /// Builds the host.
    ///
    /// # Errors
    ///
    /// Returns an error when the host cannot be constructed.
    fn build_host(
        &self,
        params: &HostParams,
        config: HostConfig,
    ) -> Result<Box<dyn Host>, ComponentError>;

    /// Builds the data layer; setup against the host happens separately.
    ///
    /// # Errors
    ///
    /// Returns an error when the layer cannot be constructed.
    fn build_data_layer(&self, config: DataLayerConfig)
    -> Result<Box<dyn DataLayer>, ComponentError>;

    /// Builds the realtime layer bound to `host`.
    ///
    /// # Errors
    ///
    /// Returns an error when the layer cannot be constructed.
    fn build_realtime(
        &self,
        config: RealtimeConfig,
        host: &dyn Host,
    ) -> Result<Box<dyn Realtime>, ComponentError>;
}
