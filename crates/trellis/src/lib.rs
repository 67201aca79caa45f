//! Declarative assembly of web applications.
//!
//! An application describes itself once as a [`Build`]: the services it
//! needs, the views it serves, its error handlers, emitters, lifecycle hooks,
//! commands and realtime namespaces. [`Assembler`] turns that declaration into
//! a running [`Assembly`] by walking a fixed sequence of [`Phase`]s:
//!
//! 1. install the process logger from the `log` configuration;
//! 2. discover which built-ins the configuration directory enables;
//! 3. construct the host, then the data layer and realtime layer when their
//!    configuration files exist;
//! 4. construct caller services from their materialized configuration;
//! 5. register views, error handlers, emitters, hooks and commands;
//! 6. bind realtime namespaces;
//! 7. give the host its post-build step.
//!
//! Concrete hosts, data layers and realtime layers come from a
//! [`BuiltinProvider`]. Any failure aborts assembly with an [`AssemblyError`]
//! naming the phase and component, and every step is reported through an
//! [`AssemblyReporter`] as structured `tracing` events.
//!
//! The finished assembly can live in the process-wide [`Registry`], where
//! [`Assembly::instance`] retrieves it.

mod app_error;
mod assembler;
mod assembly;
mod builtins;
mod declaration;
mod emitter;
mod error;
mod health;
mod host;
mod phase;
mod push;
mod registry;
mod service;
mod telemetry;

pub use app_error::{
    AppError, ErrorClass, ErrorHandler, ErrorResponse, handle_wildcard_builtin_error,
    handle_wildcard_error, wildcard_builtin_error_handler, wildcard_error_handler,
};
pub use assembler::Assembler;
pub use assembly::Assembly;
pub use builtins::{
    BuiltinDescriptor, BuiltinKind, BuiltinKindParseError, BuiltinProvider, DataLayer,
    NamespaceHandler, Realtime, SocketErrorHandler, default_socket_error_handler,
};
pub use declaration::{
    Build, BuildBuilder, ErrorDescriptor, LifecycleHooks, ServiceDescriptor, SocketDescriptor,
    ViewDescriptor, derive_endpoint,
};
pub use emitter::{EmitterDescriptor, EmitterRegistry};
pub use error::{AssemblyError, ComponentError, PostBuildError, RunError};
pub use health::{
    AssemblyReporter, AssemblySummary, ServiceReplacement, StructuredAssemblyReporter,
};
pub use host::{
    CliCommand, ContextProcessor, HookKind, Host, HostParams, HttpMethod, LifecycleHook,
    RequestHook, RouteRegistration, ServingHandle, ShellProcessor, View, ViewRequest,
};
pub use phase::Phase;
pub use push::{Push, PushAction, PushEmitter, PushSink};
pub use registry::{Registry, RegistryError};
pub use service::{Service, ServiceEntry, ServiceFactory, ServiceRegistry, ServiceType};
pub use telemetry::{LogInstaller, RotatingFile, RotatingWriter, TelemetryError, TracingLogInstaller};

pub use trellis_config as config;

#[cfg(test)]
mod tests;
