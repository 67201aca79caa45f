//! The host contract: the HTTP-serving core every assembly is built around.
//!
//! Assembly never serves traffic itself. It hands routes, error handlers,
//! lifecycle hooks and commands to a [`Host`] supplied by a
//! [`BuiltinProvider`](crate::BuiltinProvider), then asks the host to serve or
//! to open a shell when [`Assembly::run`](crate::Assembly::run) is called.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

use trellis_config::{DEFAULT_HOST, DEFAULT_PORT, Mode, Settings};

use crate::app_error::{AppError, ErrorClass, ErrorHandler};
use crate::error::{ComponentError, PostBuildError};
use crate::push::PushSink;

/// Parameters the host is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostParams {
    /// Active process mode.
    pub mode: Mode,
    /// Network host the serving loop binds to.
    pub host: String,
    /// Network port the serving loop binds to.
    pub port: u16,
}

impl HostParams {
    /// Builds parameters with the default host and port.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
        }
    }

    /// Base URL clients reach the serving loop at.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// Type-erased handle onto the host's native serving object.
///
/// The data and realtime layers attach themselves to this handle during
/// deferred setup; they downcast it to the concrete type their host exposes.
#[derive(Clone)]
pub struct ServingHandle(Arc<dyn Any + Send + Sync>);

impl ServingHandle {
    /// Wraps a serving object.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wraps an already shared serving object.
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrows the serving object as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Shares the serving object as `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    /// Returns `true` when both handles point at the same object.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ServingHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ServingHandle").finish_non_exhaustive()
    }
}

/// HTTP methods a view can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Every method a registered route accepts.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];
}

/// Request data handed to a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRequest {
    /// Values captured from the route's parameter segments.
    pub params: Settings,
    /// Decoded request body.
    pub body: Value,
}

/// Request handler bound to one route.
///
/// Every method defaults to a 405 answer; views override the methods they
/// support.
pub trait View: Send + Sync + 'static {
    /// Answers `GET`.
    ///
    /// # Errors
    ///
    /// Returns the error the host should hand to its error handlers.
    fn get(&self, request: &ViewRequest) -> Result<Value, AppError> {
        let _ = request;
        Err(AppError::method_not_allowed(HttpMethod::Get))
    }

    /// Answers `POST`.
    ///
    /// # Errors
    ///
    /// Returns the error the host should hand to its error handlers.
    fn post(&self, request: &ViewRequest) -> Result<Value, AppError> {
        let _ = request;
        Err(AppError::method_not_allowed(HttpMethod::Post))
    }

    /// Answers `PUT`.
    ///
    /// # Errors
    ///
    /// Returns the error the host should hand to its error handlers.
    fn put(&self, request: &ViewRequest) -> Result<Value, AppError> {
        let _ = request;
        Err(AppError::method_not_allowed(HttpMethod::Put))
    }

    /// Answers `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns the error the host should hand to its error handlers.
    fn delete(&self, request: &ViewRequest) -> Result<Value, AppError> {
        let _ = request;
        Err(AppError::method_not_allowed(HttpMethod::Delete))
    }

    /// Routes `request` to the method handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's error.
    fn dispatch(&self, method: HttpMethod, request: &ViewRequest) -> Result<Value, AppError> {
        match method {
            HttpMethod::Get => self.get(request),
            HttpMethod::Post => self.post(request),
            HttpMethod::Put => self.put(request),
            HttpMethod::Delete => self.delete(request),
        }
    }
}

/// Route handed to [`Host::register_route`].
#[derive(Clone)]
pub struct RouteRegistration {
    /// Endpoint name the route is registered under.
    pub endpoint: String,
    /// Route pattern such as `/users/<int:id>`.
    pub route: String,
    /// Methods the route accepts.
    pub methods: Vec<HttpMethod>,
    /// Handler bound to the route.
    pub view: Arc<dyn View>,
}

impl fmt::Debug for RouteRegistration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RouteRegistration")
            .field("endpoint", &self.endpoint)
            .field("route", &self.route)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Callable contributing variables to every rendered template.
pub type ContextProcessor = Arc<dyn Fn() -> Settings + Send + Sync>;

/// Callable run around request handling.
pub type RequestHook = Arc<dyn Fn() -> Result<(), AppError> + Send + Sync>;

/// Callable contributing names to the interactive shell.
pub type ShellProcessor = Arc<dyn Fn() -> Settings + Send + Sync>;

/// Kinds of lifecycle hook a host accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    /// Template context processor.
    ContextProcessor,
    /// Runs before every request.
    EachRequest,
    /// Runs before the first request only.
    FirstRequest,
}

/// Lifecycle hook handed to [`Host::register_lifecycle_hook`].
#[derive(Clone)]
pub enum LifecycleHook {
    /// Template context processor.
    ContextProcessor(ContextProcessor),
    /// Runs before every request.
    EachRequest(RequestHook),
    /// Runs before the first request only.
    FirstRequest(RequestHook),
}

impl LifecycleHook {
    /// Kind of the hook.
    #[must_use]
    pub const fn kind(&self) -> HookKind {
        match self {
            Self::ContextProcessor(_) => HookKind::ContextProcessor,
            Self::EachRequest(_) => HookKind::EachRequest,
            Self::FirstRequest(_) => HookKind::FirstRequest,
        }
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("LifecycleHook").field(&self.kind()).finish()
    }
}

type CommandFn = dyn Fn(&[String]) -> Result<(), AppError> + Send + Sync;

/// Named command exposed through the host's command-line surface.
#[derive(Clone)]
pub struct CliCommand {
    name: String,
    about: String,
    run: Arc<CommandFn>,
}

impl CliCommand {
    /// Builds a command.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, about: impl Into<String>, run: F) -> Self
    where
        F: Fn(&[String]) -> Result<(), AppError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            about: about.into(),
            run: Arc::new(run),
        }
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// One-line description.
    #[must_use]
    pub fn about(&self) -> &str {
        self.about.as_str()
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns the command's failure.
    pub fn invoke(&self, args: &[String]) -> Result<(), AppError> {
        (self.run)(args)
    }
}

impl fmt::Debug for CliCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CliCommand")
            .field("name", &self.name)
            .field("about", &self.about)
            .finish_non_exhaustive()
    }
}

/// HTTP-serving core of an assembly.
pub trait Host: Send + Sync + 'static {
    /// Binds a view to a route.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the route.
    fn register_route(&mut self, route: RouteRegistration) -> Result<(), ComponentError>;

    /// Registers a handler for a class of errors.
    ///
    /// A later registration for the same class replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the handler.
    fn register_error(
        &mut self,
        class: ErrorClass,
        handler: ErrorHandler,
    ) -> Result<(), ComponentError>;

    /// Registers a lifecycle hook.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the hook.
    fn register_lifecycle_hook(&mut self, hook: LifecycleHook) -> Result<(), ComponentError>;

    /// Registers a shell context processor.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the processor.
    fn register_shell_processor(
        &mut self,
        processor: ShellProcessor,
    ) -> Result<(), ComponentError>;

    /// Registers a command-line command.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the command.
    fn register_cli_command(&mut self, command: CliCommand) -> Result<(), ComponentError>;

    /// Whether the universal fallback error handler should be registered.
    fn wildcard_builtin_error_handler_enabled(&self) -> bool;

    /// Handle onto the native serving object.
    fn serving_handle(&self) -> ServingHandle;

    /// Push channel for partial page updates, when the host supports them.
    fn push_sink(&self) -> Option<Arc<dyn PushSink>> {
        None
    }

    /// Last wiring step after every phase has run.
    ///
    /// # Errors
    ///
    /// Returns [`PostBuildError::NotImplemented`] by default, which assembly
    /// treats as success.
    fn postbuild(&mut self) -> Result<(), PostBuildError> {
        Err(PostBuildError::NotImplemented)
    }

    /// Runs the serving loop until it stops.
    ///
    /// # Errors
    ///
    /// Returns an error when the loop cannot start or aborts.
    fn serve(&self) -> Result<(), ComponentError>;

    /// Opens an interactive shell bound to the host.
    ///
    /// # Errors
    ///
    /// Fails by default; hosts with a shell override this.
    fn run_shell(&self) -> Result<(), ComponentError> {
        Err(ComponentError::new(
            trellis_config::HOST_COMPONENT,
            "host does not provide an interactive shell",
        ))
    }
}
