//! Log installer double that records the settings it was handed.

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};

use trellis_config::LogSettings;

use crate::telemetry::{LogInstaller, TelemetryError};

/// Records installs instead of touching the global subscriber.
#[derive(Debug, Default)]
pub struct RecordingLogInstaller {
    installs: Mutex<Vec<(LogSettings, Utf8PathBuf)>>,
    failure: Option<String>,
}

impl RecordingLogInstaller {
    /// Installer whose every install fails with an invalid filter.
    pub fn failing(filter: impl Into<String>) -> Self {
        Self {
            installs: Mutex::new(Vec::new()),
            failure: Some(filter.into()),
        }
    }

    /// Settings of every recorded install.
    pub fn installs(&self) -> Vec<LogSettings> {
        self.installs
            .lock()
            .expect("log installer mutex poisoned")
            .iter()
            .map(|(settings, _)| settings.clone())
            .collect()
    }

    /// Root passed to the last install.
    pub fn last_root(&self) -> Option<Utf8PathBuf> {
        self.installs
            .lock()
            .expect("log installer mutex poisoned")
            .last()
            .map(|(_, root)| root.clone())
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl LogInstaller for RecordingLogInstaller {
    fn install(&self, settings: &LogSettings, root: &Utf8Path) -> Result<(), TelemetryError> {
        if let Some(filter) = &self.failure {
            return Err(TelemetryError::Filter(filter.clone()));
        }
        self.installs
            .lock()
            .expect("log installer mutex poisoned")
            .push((settings.clone(), root.to_path_buf()));
        Ok(())
    }
}
