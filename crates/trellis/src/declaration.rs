//! The build declaration: everything a caller wants assembled.
//!
//! A [`Build`] is immutable once produced by [`BuildBuilder`]. Declaration
//! order is preserved for every list, and assembly walks each list in that
//! order.

use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use trellis_config::{DEFAULT_CONFIG_DIR, Environment, MaterializedConfig, Settings};

use crate::app_error::{AppError, ErrorClass, ErrorHandler, ErrorResponse};
use crate::builtins::{NamespaceHandler, SocketErrorHandler};
use crate::emitter::EmitterDescriptor;
use crate::error::ComponentError;
use crate::host::{CliCommand, ContextProcessor, RequestHook, ShellProcessor, View};
use crate::service::{FnFactory, Service, ServiceFactory, ServiceType, TypedFactory};

/// Declared caller service.
#[derive(Clone)]
pub struct ServiceDescriptor {
    name: String,
    factory: Arc<dyn ServiceFactory>,
    mode_settings: BTreeMap<Environment, Settings>,
}

impl ServiceDescriptor {
    /// Declares `S`, built through [`Service::from_config`].
    #[must_use]
    pub fn of<S: Service>(name: impl Into<String>) -> Self {
        Self::from_factory(name, Arc::new(TypedFactory::<S>::new()))
    }

    /// Declares a service built by `constructor`.
    #[must_use]
    pub fn with_constructor<S, F>(name: impl Into<String>, constructor: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&MaterializedConfig) -> Result<S, ComponentError> + Send + Sync + 'static,
    {
        Self::from_factory(name, Arc::new(FnFactory::<S, F>::new(constructor)))
    }

    /// Declares a service built by an arbitrary factory.
    #[must_use]
    pub fn from_factory(name: impl Into<String>, factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            name: name.into(),
            factory,
            mode_settings: BTreeMap::new(),
        }
    }

    /// Adds settings applied only when `environment` is active.
    ///
    /// They overlay the file configuration and are overlaid in turn by caller
    /// overrides.
    #[must_use]
    pub fn with_mode_settings(mut self, environment: Environment, settings: Settings) -> Self {
        self.mode_settings.insert(environment, settings);
        self
    }

    /// Declared name; also the configuration component name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Type the service constructs.
    #[must_use]
    pub fn service_type(&self) -> ServiceType {
        self.factory.service_type()
    }

    /// Settings for `environment`, if declared.
    #[must_use]
    pub fn mode_settings(&self, environment: Environment) -> Option<&Settings> {
        self.mode_settings.get(&environment)
    }

    pub(crate) fn factory(&self) -> &dyn ServiceFactory {
        self.factory.as_ref()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("service_type", &self.service_type())
            .field("mode_settings", &self.mode_settings)
            .finish()
    }
}

/// Declared view.
#[derive(Clone)]
pub struct ViewDescriptor {
    name: String,
    view: Arc<dyn View>,
    route: String,
    endpoint: Option<String>,
}

impl ViewDescriptor {
    /// Declares `view` bound to `route`.
    #[must_use]
    pub fn new(name: impl Into<String>, view: impl View, route: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            view: Arc::new(view),
            route: route.into(),
            endpoint: None,
        }
    }

    /// Overrides the derived endpoint name.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Route pattern.
    #[must_use]
    pub fn route(&self) -> &str {
        self.route.as_str()
    }

    /// Explicit endpoint, or the one derived from the route.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| derive_endpoint(&self.route))
    }

    /// Shared handler.
    #[must_use]
    pub fn view(&self) -> Arc<dyn View> {
        Arc::clone(&self.view)
    }
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ViewDescriptor")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Derives an endpoint name from a route pattern.
///
/// Parameter segments such as `<int:id>` contribute their parameter name,
/// segments are joined with `_`, and the root route becomes `index`:
///
/// ```text
/// /                       -> index
/// /users/<int:id>/posts   -> users_id_posts
/// /user-profile           -> user_profile
/// ```
#[must_use]
pub fn derive_endpoint(route: &str) -> String {
    let segments: Vec<String> = route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let name = segment
                .strip_prefix('<')
                .and_then(|inner| inner.strip_suffix('>'))
                .map_or(segment, |inner| {
                    inner.rsplit_once(':').map_or(inner, |(_, name)| name)
                });
            name.chars()
                .map(|character| {
                    if character.is_ascii_alphanumeric() || character == '_' {
                        character
                    } else {
                        '_'
                    }
                })
                .collect()
        })
        .collect();
    if segments.is_empty() {
        "index".to_owned()
    } else {
        segments.join("_")
    }
}

/// Declared error handler.
#[derive(Clone)]
pub struct ErrorDescriptor {
    class: ErrorClass,
    handler: ErrorHandler,
}

impl ErrorDescriptor {
    /// Declares `handler` for `class`.
    #[must_use]
    pub fn new<F>(class: ErrorClass, handler: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> ErrorResponse + Send + Sync + 'static,
    {
        Self {
            class,
            handler: Arc::new(handler),
        }
    }

    /// Declares `handler` for the concrete error type `E`.
    #[must_use]
    pub fn for_type<E, F>(handler: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&(dyn Error + 'static)) -> ErrorResponse + Send + Sync + 'static,
    {
        Self::new(ErrorClass::of::<E>(), handler)
    }

    /// Error class handled.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.class
    }

    /// Shared handler.
    #[must_use]
    pub fn handler(&self) -> ErrorHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for ErrorDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ErrorDescriptor")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

type NamespaceFactory = dyn Fn(&str) -> Box<dyn NamespaceHandler> + Send + Sync;

/// Declared realtime namespace.
#[derive(Clone)]
pub struct SocketDescriptor {
    namespace: String,
    handler: Arc<NamespaceFactory>,
    error_handler: Option<SocketErrorHandler>,
}

impl SocketDescriptor {
    /// Declares a namespace whose handler is built by `handler`.
    #[must_use]
    pub fn new<H, F>(namespace: impl Into<String>, handler: F) -> Self
    where
        H: NamespaceHandler,
        F: Fn(&str) -> H + Send + Sync + 'static,
    {
        Self {
            namespace: namespace.into(),
            handler: Arc::new(move |namespace: &str| {
                Box::new(handler(namespace)) as Box<dyn NamespaceHandler>
            }),
            error_handler: None,
        }
    }

    /// Binds a dedicated error handler to the namespace.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &AppError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Namespace path.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Dedicated error handler, if declared.
    #[must_use]
    pub fn error_handler(&self) -> Option<&SocketErrorHandler> {
        self.error_handler.as_ref()
    }

    pub(crate) fn build_handler(&self) -> Box<dyn NamespaceHandler> {
        (self.handler)(&self.namespace)
    }
}

impl fmt::Debug for SocketDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SocketDescriptor")
            .field("namespace", &self.namespace)
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Lifecycle hooks grouped by kind.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    context_processors: Vec<ContextProcessor>,
    each_request: Vec<RequestHook>,
    first_request: Vec<RequestHook>,
}

impl LifecycleHooks {
    /// Template context processors.
    #[must_use]
    pub fn context_processors(&self) -> &[ContextProcessor] {
        &self.context_processors
    }

    /// Hooks run before every request.
    #[must_use]
    pub fn each_request(&self) -> &[RequestHook] {
        &self.each_request
    }

    /// Hooks run before the first request.
    #[must_use]
    pub fn first_request(&self) -> &[RequestHook] {
        &self.first_request
    }

    /// Total number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.context_processors.len() + self.each_request.len() + self.first_request.len()
    }

    /// Returns `true` when no hook is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LifecycleHooks")
            .field("context_processors", &self.context_processors.len())
            .field("each_request", &self.each_request.len())
            .field("first_request", &self.first_request.len())
            .finish()
    }
}

/// Immutable description of an application.
#[derive(Clone)]
pub struct Build {
    version: String,
    config_dir: Utf8PathBuf,
    services: Vec<ServiceDescriptor>,
    views: Vec<ViewDescriptor>,
    errors: Vec<ErrorDescriptor>,
    emitters: Vec<EmitterDescriptor>,
    hooks: LifecycleHooks,
    shell_processors: Vec<ShellProcessor>,
    cli_commands: Vec<CliCommand>,
    sockets: Vec<SocketDescriptor>,
    default_socket_error_handler: Option<SocketErrorHandler>,
}

impl Build {
    /// Starts a declaration for `version`.
    #[must_use]
    pub fn builder(version: impl Into<String>) -> BuildBuilder {
        BuildBuilder::new(version)
    }

    /// Application version.
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Configuration directory, relative to the root unless absolute.
    #[must_use]
    pub fn config_dir(&self) -> &Utf8Path {
        self.config_dir.as_path()
    }

    /// Declared services.
    #[must_use]
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Declared views.
    #[must_use]
    pub fn views(&self) -> &[ViewDescriptor] {
        &self.views
    }

    /// Declared error handlers.
    #[must_use]
    pub fn errors(&self) -> &[ErrorDescriptor] {
        &self.errors
    }

    /// Declared emitters.
    #[must_use]
    pub fn emitters(&self) -> &[EmitterDescriptor] {
        &self.emitters
    }

    /// Declared lifecycle hooks.
    #[must_use]
    pub const fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Declared shell processors.
    #[must_use]
    pub fn shell_processors(&self) -> &[ShellProcessor] {
        &self.shell_processors
    }

    /// Declared command-line commands.
    #[must_use]
    pub fn cli_commands(&self) -> &[CliCommand] {
        &self.cli_commands
    }

    /// Declared realtime namespaces.
    #[must_use]
    pub fn sockets(&self) -> &[SocketDescriptor] {
        &self.sockets
    }

    /// Error handler for namespaces that declare none.
    #[must_use]
    pub fn default_socket_error_handler(&self) -> Option<&SocketErrorHandler> {
        self.default_socket_error_handler.as_ref()
    }
}

impl fmt::Debug for Build {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Build")
            .field("version", &self.version)
            .field("config_dir", &self.config_dir)
            .field("services", &self.services)
            .field("views", &self.views)
            .field("errors", &self.errors)
            .field("emitters", &self.emitters)
            .field("hooks", &self.hooks)
            .field("shell_processors", &self.shell_processors.len())
            .field("cli_commands", &self.cli_commands)
            .field("sockets", &self.sockets)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Build`].
#[derive(Debug)]
pub struct BuildBuilder {
    build: Build,
}

impl BuildBuilder {
    /// Starts a declaration for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            build: Build {
                version: version.into(),
                config_dir: Utf8PathBuf::from(DEFAULT_CONFIG_DIR),
                services: Vec::new(),
                views: Vec::new(),
                errors: Vec::new(),
                emitters: Vec::new(),
                hooks: LifecycleHooks::default(),
                shell_processors: Vec::new(),
                cli_commands: Vec::new(),
                sockets: Vec::new(),
                default_socket_error_handler: None,
            },
        }
    }

    /// Overrides the configuration directory.
    #[must_use]
    pub fn config_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.build.config_dir = path.into();
        self
    }

    /// Declares a service.
    #[must_use]
    pub fn service(mut self, descriptor: ServiceDescriptor) -> Self {
        self.build.services.push(descriptor);
        self
    }

    /// Declares a view.
    #[must_use]
    pub fn view(mut self, descriptor: ViewDescriptor) -> Self {
        self.build.views.push(descriptor);
        self
    }

    /// Declares an error handler.
    #[must_use]
    pub fn error(mut self, descriptor: ErrorDescriptor) -> Self {
        self.build.errors.push(descriptor);
        self
    }

    /// Declares an emitter.
    #[must_use]
    pub fn emitter(mut self, descriptor: EmitterDescriptor) -> Self {
        self.build.emitters.push(descriptor);
        self
    }

    /// Declares a template context processor.
    #[must_use]
    pub fn context_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn() -> Settings + Send + Sync + 'static,
    {
        self.build.hooks.context_processors.push(Arc::new(processor));
        self
    }

    /// Declares a hook run before every request.
    #[must_use]
    pub fn each_request<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.build.hooks.each_request.push(Arc::new(hook));
        self
    }

    /// Declares a hook run before the first request.
    #[must_use]
    pub fn first_request<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.build.hooks.first_request.push(Arc::new(hook));
        self
    }

    /// Declares a shell context processor.
    #[must_use]
    pub fn shell_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn() -> Settings + Send + Sync + 'static,
    {
        self.build.shell_processors.push(Arc::new(processor));
        self
    }

    /// Declares a command-line command.
    #[must_use]
    pub fn cli_command(mut self, command: CliCommand) -> Self {
        self.build.cli_commands.push(command);
        self
    }

    /// Declares a realtime namespace.
    #[must_use]
    pub fn socket(mut self, descriptor: SocketDescriptor) -> Self {
        self.build.sockets.push(descriptor);
        self
    }

    /// Sets the error handler for namespaces that declare none.
    #[must_use]
    pub fn default_socket_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &AppError) + Send + Sync + 'static,
    {
        self.build.default_socket_error_handler = Some(Arc::new(handler));
        self
    }

    /// Finishes the declaration.
    #[must_use]
    pub fn build(self) -> Build {
        self.build
    }
}
