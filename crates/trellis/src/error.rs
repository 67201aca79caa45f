//! Error types surfaced by assembly and by component collaborators.

use thiserror::Error;

use trellis_config::{MaterializeError, Mode, SourceScanError};

use crate::phase::Phase;
use crate::registry::RegistryError;
use crate::telemetry::TelemetryError;

/// Failure reported by a component or a caller-supplied constructor.
#[derive(Debug, Error)]
#[error("{component}: {message}")]
pub struct ComponentError {
    component: String,
    message: String,
    /// Optional source error reported by the component implementation.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ComponentError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        component: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Name of the component that failed.
    #[must_use]
    pub fn component(&self) -> &str {
        self.component.as_str()
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Outcome of a host's post-build hook.
#[derive(Debug, Error)]
pub enum PostBuildError {
    /// The host has no post-build work; assembly treats this as success.
    #[error("post-build hook is not implemented")]
    NotImplemented,
    /// The host attempted post-build work and failed.
    #[error(transparent)]
    Failed(#[from] ComponentError),
}

/// Errors that abort an assembly run.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The configuration directory could not be scanned.
    #[error("failed to scan configuration sources: {source}")]
    Sources {
        /// Underlying scan error.
        #[source]
        source: SourceScanError,
    },
    /// A component's configuration could not be materialized or typed.
    #[error("{phase} phase: configuration for '{component}' is unusable: {source}")]
    Configuration {
        /// Phase that requested the configuration.
        phase: Phase,
        /// Component being configured.
        component: String,
        /// Underlying materialization error.
        #[source]
        source: MaterializeError,
    },
    /// A component or constructor failed.
    #[error("{phase} phase: {source}")]
    Component {
        /// Phase in which the failure occurred.
        phase: Phase,
        /// Underlying component error.
        #[source]
        source: ComponentError,
    },
    /// The process logger could not be installed.
    #[error("{phase} phase: failed to install logging: {source}")]
    Telemetry {
        /// Phase in which the failure occurred.
        phase: Phase,
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The build declaration holds a value assembly cannot use.
    #[error("{phase} phase: invalid declaration for '{subject}': {message}")]
    Declaration {
        /// Phase that rejected the declaration.
        phase: Phase,
        /// Declared item that was rejected.
        subject: String,
        /// Description of the problem.
        message: String,
    },
    /// The singleton registry refused the assembly.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AssemblyError {
    /// Phase that failed, when the failure happened inside one.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Configuration { phase, .. }
            | Self::Component { phase, .. }
            | Self::Telemetry { phase, .. }
            | Self::Declaration { phase, .. } => Some(*phase),
            Self::Sources { .. } | Self::Registry(_) => None,
        }
    }

    /// Name of the component or declared item that failed, if known.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Configuration { component, .. } => Some(component.as_str()),
            Self::Component { source, .. } => Some(source.component()),
            Self::Declaration { subject, .. } => Some(subject.as_str()),
            Self::Sources { .. } | Self::Telemetry { .. } | Self::Registry(_) => None,
        }
    }
}

/// Errors returned by [`Assembly::run`](crate::Assembly::run).
#[derive(Debug, Error)]
pub enum RunError {
    /// The mode has no runnable behaviour.
    #[error("mode '{mode}' cannot be run directly")]
    Unsupported {
        /// Mode that was requested.
        mode: Mode,
    },
    /// A migration mode was requested without a configured data layer.
    #[error("mode '{mode}' requires a data layer but none is configured")]
    MissingDataLayer {
        /// Mode that was requested.
        mode: Mode,
    },
    /// The dispatched component failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
