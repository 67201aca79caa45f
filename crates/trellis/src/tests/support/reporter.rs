//! Test double for [`AssemblyReporter`] that records lifecycle events.

use std::sync::Mutex;

use camino::Utf8Path;

use trellis_config::Mode;

use crate::builtins::BuiltinKind;
use crate::error::AssemblyError;
use crate::health::{AssemblyReporter, AssemblySummary, ServiceReplacement};
use crate::phase::Phase;

/// Assembly events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyEvent {
    /// Assembly started in a mode.
    Starting(Mode),
    /// A phase began.
    PhaseStarting(Phase),
    /// A phase completed.
    PhaseCompleted(Phase),
    /// A phase was skipped.
    PhaseSkipped(Phase),
    /// A built-in was constructed.
    BuiltinReady(BuiltinKind),
    /// A service declaration was displaced.
    ServiceReplaced { replaced: String, winner: String },
    /// Assembly finished.
    Succeeded(AssemblySummary),
    /// Assembly aborted in a phase.
    Failed { phase: Option<Phase>, message: String },
}

/// Records assembly events for assertions.
#[derive(Debug, Default)]
pub struct RecordingAssemblyReporter {
    events: Mutex<Vec<AssemblyEvent>>,
}

impl RecordingAssemblyReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AssemblyEvent> {
        self.events
            .lock()
            .expect("assembly reporter mutex poisoned")
            .clone()
    }

    /// Phases in the order they completed.
    #[must_use]
    pub fn completed_phases(&self) -> Vec<Phase> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AssemblyEvent::PhaseCompleted(phase) => Some(phase),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: AssemblyEvent) {
        self.events
            .lock()
            .expect("assembly reporter mutex poisoned")
            .push(event);
    }
}

impl AssemblyReporter for RecordingAssemblyReporter {
    fn assembly_starting(&self, mode: Mode, _root: &Utf8Path) {
        self.record(AssemblyEvent::Starting(mode));
    }

    fn phase_starting(&self, phase: Phase) {
        self.record(AssemblyEvent::PhaseStarting(phase));
    }

    fn phase_completed(&self, phase: Phase) {
        self.record(AssemblyEvent::PhaseCompleted(phase));
    }

    fn phase_skipped(&self, phase: Phase) {
        self.record(AssemblyEvent::PhaseSkipped(phase));
    }

    fn builtin_ready(&self, kind: BuiltinKind) {
        self.record(AssemblyEvent::BuiltinReady(kind));
    }

    fn service_replaced(&self, replacement: &ServiceReplacement) {
        self.record(AssemblyEvent::ServiceReplaced {
            replaced: replacement.replaced.clone(),
            winner: replacement.winner.clone(),
        });
    }

    fn assembly_succeeded(&self, summary: &AssemblySummary) {
        self.record(AssemblyEvent::Succeeded(summary.clone()));
    }

    fn assembly_failed(&self, error: &AssemblyError) {
        self.record(AssemblyEvent::Failed {
            phase: error.phase(),
            message: error.to_string(),
        });
    }
}
