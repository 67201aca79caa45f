//! Structured health reporting for assembly lifecycle events.

use std::sync::Arc;

use camino::Utf8Path;

use trellis_config::Mode;

use crate::builtins::BuiltinKind;
use crate::error::AssemblyError;
use crate::phase::Phase;
use crate::service::ServiceType;

/// A service declaration displaced by a later one of the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReplacement {
    /// Type both declarations construct.
    pub service_type: ServiceType,
    /// Name of the displaced declaration.
    pub replaced: String,
    /// Name of the surviving declaration.
    pub winner: String,
}

/// Counts describing a finished assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblySummary {
    /// Mode the assembly ran in.
    pub mode: Mode,
    /// Built-ins that were constructed, host first.
    pub builtins: Vec<BuiltinKind>,
    /// Registered services.
    pub services: usize,
    /// Registered views.
    pub views: usize,
    /// Constructed emitters.
    pub emitters: usize,
    /// Bound realtime namespaces.
    pub sockets: usize,
}

/// Observer trait used to surface assembly events to telemetry sinks.
pub trait AssemblyReporter: Send + Sync {
    /// Invoked before any phase runs.
    fn assembly_starting(&self, mode: Mode, root: &Utf8Path);

    /// Invoked when a phase begins.
    fn phase_starting(&self, phase: Phase);

    /// Invoked when a phase completes.
    fn phase_completed(&self, phase: Phase);

    /// Invoked when a phase is skipped entirely.
    fn phase_skipped(&self, phase: Phase);

    /// Invoked after a built-in has been constructed.
    fn builtin_ready(&self, kind: BuiltinKind);

    /// Invoked when a later service declaration displaces an earlier one.
    fn service_replaced(&self, replacement: &ServiceReplacement);

    /// Invoked after every phase has completed.
    fn assembly_succeeded(&self, summary: &AssemblySummary);

    /// Invoked when assembly aborts.
    fn assembly_failed(&self, error: &AssemblyError);
}

impl<T> AssemblyReporter for Arc<T>
where
    T: AssemblyReporter,
{
    fn assembly_starting(&self, mode: Mode, root: &Utf8Path) {
        (**self).assembly_starting(mode, root);
    }

    fn phase_starting(&self, phase: Phase) {
        (**self).phase_starting(phase);
    }

    fn phase_completed(&self, phase: Phase) {
        (**self).phase_completed(phase);
    }

    fn phase_skipped(&self, phase: Phase) {
        (**self).phase_skipped(phase);
    }

    fn builtin_ready(&self, kind: BuiltinKind) {
        (**self).builtin_ready(kind);
    }

    fn service_replaced(&self, replacement: &ServiceReplacement) {
        (**self).service_replaced(replacement);
    }

    fn assembly_succeeded(&self, summary: &AssemblySummary) {
        (**self).assembly_succeeded(summary);
    }

    fn assembly_failed(&self, error: &AssemblyError) {
        (**self).assembly_failed(error);
    }
}

/// Default reporter that records assembly events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredAssemblyReporter;

impl StructuredAssemblyReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AssemblyReporter for StructuredAssemblyReporter {
    fn assembly_starting(&self, mode: Mode, root: &Utf8Path) {
        tracing::info!(
            target: "trellis::health",
            event = "assembly_starting",
            mode = %mode,
            root = %root,
            "starting application assembly"
        );
    }

    fn phase_starting(&self, phase: Phase) {
        tracing::debug!(
            target: "trellis::health",
            event = "phase_starting",
            phase = %phase,
            "starting assembly phase"
        );
    }

    fn phase_completed(&self, phase: Phase) {
        tracing::debug!(
            target: "trellis::health",
            event = "phase_completed",
            phase = %phase,
            "assembly phase completed"
        );
    }

    fn phase_skipped(&self, phase: Phase) {
        tracing::debug!(
            target: "trellis::health",
            event = "phase_skipped",
            phase = %phase,
            "assembly phase skipped"
        );
    }

    fn builtin_ready(&self, kind: BuiltinKind) {
        tracing::info!(
            target: "trellis::health",
            event = "builtin_ready",
            builtin = %kind,
            "built-in component ready"
        );
    }

    fn service_replaced(&self, replacement: &ServiceReplacement) {
        tracing::warn!(
            target: "trellis::health",
            event = "service_replaced",
            service_type = %replacement.service_type,
            replaced = %replacement.replaced,
            winner = %replacement.winner,
            "service declaration replaced an earlier one of the same type"
        );
    }

    fn assembly_succeeded(&self, summary: &AssemblySummary) {
        tracing::info!(
            target: "trellis::health",
            event = "assembly_succeeded",
            mode = %summary.mode,
            builtins = ?summary.builtins,
            services = summary.services,
            views = summary.views,
            emitters = summary.emitters,
            sockets = summary.sockets,
            "application assembly completed"
        );
    }

    fn assembly_failed(&self, error: &AssemblyError) {
        tracing::error!(
            target: "trellis::health",
            event = "assembly_failed",
            phase = ?error.phase(),
            subject = ?error.subject(),
            error = %error,
            "application assembly failed"
        );
    }
}
