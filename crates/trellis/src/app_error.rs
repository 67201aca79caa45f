//! Application error base type and the handlers registered by default.

use std::any::TypeId;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Base error type for application failures surfaced to clients.
///
/// Handlers registered for [`ErrorClass::Base`] receive every `AppError`
/// raised by views and hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct AppError {
    name: String,
    message: String,
    status_code: u16,
}

impl AppError {
    /// Name used when none is supplied.
    pub const DEFAULT_NAME: &'static str = "Error";
    /// Message used when none is supplied.
    pub const DEFAULT_MESSAGE: &'static str = "Internal error occurred";
    /// Status code used when none is supplied.
    pub const DEFAULT_STATUS_CODE: u16 = 400;

    /// Builds an error with the default name.
    #[must_use]
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self::named(Self::DEFAULT_NAME, message, status_code)
    }

    /// Builds an error with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Error answered by views that do not implement the requested method.
    #[must_use]
    pub fn method_not_allowed(method: impl fmt::Display) -> Self {
        Self::named(
            "MethodNotAllowed",
            format!("method {method} is not allowed"),
            405,
        )
    }

    /// Error name as exposed to clients.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Response status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Client-facing representation of the error.
    ///
    /// ```text
    /// {"error": {"name": "...", "message": "...", "status_code": 400}}
    /// ```
    #[must_use]
    pub fn expose(&self) -> Value {
        json!({
            "error": {
                "name": self.name,
                "message": self.message,
                "status_code": self.status_code,
            }
        })
    }
}

impl Default for AppError {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MESSAGE, Self::DEFAULT_STATUS_CODE)
    }
}

/// Response produced by an error handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// Status code returned to the client.
    pub status_code: u16,
    /// Response body.
    pub body: Value,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            status_code: error.status_code(),
            body: error.expose(),
        }
    }
}

/// Handler invoked by the host for errors of a registered class.
pub type ErrorHandler = Arc<dyn Fn(&(dyn Error + 'static)) -> ErrorResponse + Send + Sync>;

/// Class of errors a handler is registered for.
#[derive(Clone, Copy)]
pub enum ErrorClass {
    /// Every [`AppError`].
    Base,
    /// Any error whatsoever; used by the universal fallback handler.
    Any,
    /// One concrete error type.
    Type {
        /// Identity of the concrete type.
        id: TypeId,
        /// Type name for diagnostics.
        name: &'static str,
        /// Predicate recognising erased instances of the type.
        matches: fn(&(dyn Error + 'static)) -> bool,
    },
}

impl ErrorClass {
    /// Class of the concrete error type `E`.
    ///
    /// `AppError` maps to [`ErrorClass::Base`].
    #[must_use]
    pub fn of<E: Error + 'static>() -> Self {
        if TypeId::of::<E>() == TypeId::of::<AppError>() {
            return Self::Base;
        }
        Self::Type {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            matches: is_instance::<E>,
        }
    }

    /// Returns `true` when `error` belongs to this class.
    #[must_use]
    pub fn matches(&self, error: &(dyn Error + 'static)) -> bool {
        match self {
            Self::Base => error.is::<AppError>(),
            Self::Any => true,
            Self::Type { matches, .. } => matches(error),
        }
    }

    /// Label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Base => "AppError",
            Self::Any => "any",
            Self::Type { name, .. } => *name,
        }
    }
}

impl PartialEq for ErrorClass {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Base, Self::Base) | (Self::Any, Self::Any) => true,
            (Self::Type { id: left, .. }, Self::Type { id: right, .. }) => left == right,
            _ => false,
        }
    }
}

impl Eq for ErrorClass {}

impl fmt::Debug for ErrorClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => formatter.write_str("Base"),
            Self::Any => formatter.write_str("Any"),
            Self::Type { name, .. } => formatter.debug_tuple("Type").field(name).finish(),
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

fn is_instance<E: Error + 'static>(error: &(dyn Error + 'static)) -> bool {
    error.is::<E>()
}

/// Default handler for [`ErrorClass::Base`].
///
/// Answers with the error's own exposure and status code. Errors that are not
/// `AppError` are wrapped in the default name and status code.
#[must_use]
pub fn handle_wildcard_error(error: &(dyn Error + 'static)) -> ErrorResponse {
    if let Some(app_error) = error.downcast_ref::<AppError>() {
        return ErrorResponse::from(app_error);
    }
    let wrapped = AppError::new(error.to_string(), AppError::DEFAULT_STATUS_CODE);
    ErrorResponse::from(&wrapped)
}

/// Universal fallback handler registered for [`ErrorClass::Any`].
///
/// Logs the error and answers with a generic internal server error so details
/// never leak to clients.
#[must_use]
pub fn handle_wildcard_builtin_error(error: &(dyn Error + 'static)) -> ErrorResponse {
    tracing::error!(
        target: "trellis::errors",
        event = "unhandled_error",
        error = %error,
        "unhandled error reached the fallback handler"
    );
    let internal = AppError::named("InternalServerError", "Internal server error", 500);
    ErrorResponse::from(&internal)
}

/// [`handle_wildcard_error`] as a registrable handler.
#[must_use]
pub fn wildcard_error_handler() -> ErrorHandler {
    Arc::new(handle_wildcard_error)
}

/// [`handle_wildcard_builtin_error`] as a registrable handler.
#[must_use]
pub fn wildcard_builtin_error_handler() -> ErrorHandler {
    Arc::new(handle_wildcard_builtin_error)
}
