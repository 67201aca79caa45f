//! Typed views over the built-in components' configuration.
//!
//! Each view names the keys the engine and its collaborators rely on and keeps
//! everything else in an `extra` bag so component-specific extensions still
//! pass through.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::defaults::default_true;
use crate::environment::{Environment, Mode};
use crate::settings::Settings;

/// Configuration of the host component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostConfig {
    /// Project root injected during materialization.
    pub root_path: Utf8PathBuf,
    /// Environment injected during materialization.
    #[serde(default)]
    pub environment: Option<Environment>,
    /// Whether the universal fallback error handler is registered.
    #[serde(default = "default_true")]
    pub wildcard_builtin_error_handler_enabled: bool,
    /// Explicit testing flag; derived from the mode when absent.
    #[serde(default)]
    pub testing: Option<bool>,
    /// Enables cross-origin resource sharing.
    #[serde(default)]
    pub cors_enabled: bool,
    /// Session signing key; hosts generate one when absent.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Template directory override.
    #[serde(default)]
    pub template_path: Option<Utf8PathBuf>,
    /// Static asset directory override.
    #[serde(default)]
    pub static_path: Option<Utf8PathBuf>,
    /// Instance directory override.
    #[serde(default)]
    pub instance_path: Option<Utf8PathBuf>,
    /// Session backend identifier such as `redis`.
    #[serde(default)]
    pub session_type: Option<String>,
    /// Keys the engine does not interpret.
    #[serde(flatten)]
    pub extra: Settings,
}

impl HostConfig {
    /// Template directory, defaulting to `<root>/src/app`.
    #[must_use]
    pub fn template_path(&self) -> Utf8PathBuf {
        self.path_or_default(self.template_path.as_deref(), "src/app")
    }

    /// Static asset directory, defaulting to `<root>/src/assets`.
    #[must_use]
    pub fn static_path(&self) -> Utf8PathBuf {
        self.path_or_default(self.static_path.as_deref(), "src/assets")
    }

    /// Instance directory, defaulting to `<root>/var`.
    #[must_use]
    pub fn instance_path(&self) -> Utf8PathBuf {
        self.path_or_default(self.instance_path.as_deref(), "var")
    }

    /// Testing flag: the explicit value wins, otherwise `true` only when
    /// running the test environment.
    #[must_use]
    pub fn testing_for(&self, mode: Mode) -> bool {
        self.testing.unwrap_or_else(|| mode.is_test())
    }

    fn path_or_default(&self, configured: Option<&Utf8Path>, fallback: &str) -> Utf8PathBuf {
        configured.map_or_else(|| self.root_path.join(fallback), Utf8Path::to_path_buf)
    }
}

/// Configuration of the data layer component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataLayerConfig {
    /// Project root injected during materialization.
    pub root_path: Utf8PathBuf,
    /// Database connection URI.
    pub uri: String,
    /// Echo issued statements to the log.
    #[serde(default)]
    pub echo: bool,
    /// Keys the engine does not interpret.
    #[serde(flatten)]
    pub extra: Settings,
}

/// Configuration of the realtime layer component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RealtimeConfig {
    /// Project root injected during materialization.
    pub root_path: Utf8PathBuf,
    /// Origins allowed to open socket connections; `None` defers to the host.
    #[serde(default)]
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Keys the engine does not interpret.
    #[serde(flatten)]
    pub extra: Settings,
}
