//! The assembled application and its run-time dispatch.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use trellis_config::{Environment, HelperMode, LogSettings, MigrationMode, Mode, SourceMap};

use crate::builtins::{BuiltinKind, DataLayer, Realtime};
use crate::declaration::Build;
use crate::emitter::EmitterRegistry;
use crate::error::RunError;
use crate::health::AssemblySummary;
use crate::host::{Host, HostParams};
use crate::registry::{Registry, RegistryError};
use crate::service::ServiceRegistry;

/// Fully wired application produced by [`Assembler`](crate::Assembler).
pub struct Assembly {
    pub(crate) params: HostParams,
    pub(crate) root_dir: Utf8PathBuf,
    pub(crate) build: Build,
    pub(crate) sources: SourceMap,
    pub(crate) log_settings: LogSettings,
    pub(crate) host: Box<dyn Host>,
    pub(crate) data_layer: Option<Box<dyn DataLayer>>,
    pub(crate) realtime: Option<Box<dyn Realtime>>,
    pub(crate) services: ServiceRegistry,
    pub(crate) emitters: EmitterRegistry,
    pub(crate) sockets: usize,
}

impl Assembly {
    /// Assembly registered in the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotConstructed`] before
    /// [`Assembler::assemble_global`](crate::Assembler::assemble_global) has
    /// succeeded and [`RegistryError::UnderConstruction`] while it runs.
    pub fn instance() -> Result<Arc<Self>, RegistryError> {
        Registry::global().get_instance::<Self>()
    }

    /// Active mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.params.mode
    }

    /// Environment the configuration was materialized for.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.params.mode.environment()
    }

    /// Project root.
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        self.root_dir.as_path()
    }

    /// Application version from the build declaration.
    #[must_use]
    pub fn version(&self) -> &str {
        self.build.version()
    }

    /// Build declaration the assembly was produced from.
    #[must_use]
    pub const fn build(&self) -> &Build {
        &self.build
    }

    /// Base URL of the serving loop.
    #[must_use]
    pub fn url(&self) -> String {
        self.params.url()
    }

    /// Parameters the host was built with.
    #[must_use]
    pub const fn host_params(&self) -> &HostParams {
        &self.params
    }

    /// Scanned configuration sources.
    #[must_use]
    pub const fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Log settings the logger was installed with.
    #[must_use]
    pub const fn log_settings(&self) -> &LogSettings {
        &self.log_settings
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// The data layer, when configured.
    #[must_use]
    pub fn data_layer(&self) -> Option<&dyn DataLayer> {
        self.data_layer.as_deref()
    }

    /// The realtime layer, when configured.
    #[must_use]
    pub fn realtime(&self) -> Option<&dyn Realtime> {
        self.realtime.as_deref()
    }

    /// Constructed caller services.
    #[must_use]
    pub const fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Constructed emitters.
    #[must_use]
    pub const fn emitters(&self) -> &EmitterRegistry {
        &self.emitters
    }

    /// Built-ins present in the assembly, host first.
    #[must_use]
    pub fn builtins(&self) -> Vec<BuiltinKind> {
        let mut builtins = vec![BuiltinKind::Host];
        if self.data_layer.is_some() {
            builtins.push(BuiltinKind::DataLayer);
        }
        if self.realtime.is_some() {
            builtins.push(BuiltinKind::Realtime);
        }
        builtins
    }

    /// Counts describing the assembly.
    #[must_use]
    pub fn summary(&self) -> AssemblySummary {
        AssemblySummary {
            mode: self.mode(),
            builtins: self.builtins(),
            services: self.services.len(),
            views: self.build.views().len(),
            emitters: self.emitters.len(),
            sockets: self.sockets,
        }
    }

    /// Runs the behaviour selected by the mode.
    ///
    /// Serving modes hand control to the host's serving loop, the shell
    /// helper opens the host shell, and migration modes run the matching data
    /// layer operation.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Unsupported`] for modes without a runnable
    /// behaviour, [`RunError::MissingDataLayer`] for migrations without a data
    /// layer, and the component's failure otherwise.
    pub fn run(&self) -> Result<(), RunError> {
        let mode = self.mode();
        tracing::info!(
            target: "trellis::assembly",
            mode = %mode,
            url = %self.url(),
            "running assembled application"
        );
        match mode {
            Mode::Run(Environment::Development | Environment::Production) => {
                self.host.serve().map_err(RunError::from)
            }
            Mode::Helper(HelperMode::Shell) => self.host.run_shell().map_err(RunError::from),
            Mode::Migration(migration) => {
                let data_layer = self
                    .data_layer
                    .as_deref()
                    .ok_or(RunError::MissingDataLayer { mode })?;
                let outcome = match migration {
                    MigrationMode::Init => data_layer.init_migrations(),
                    MigrationMode::Migrate => data_layer.migrate(),
                    MigrationMode::Upgrade => data_layer.upgrade(),
                };
                outcome.map_err(RunError::from)
            }
            Mode::Run(Environment::Test) | Mode::Helper(HelperMode::Cmd | HelperMode::Deploy) => {
                Err(RunError::Unsupported { mode })
            }
        }
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Assembly")
            .field("params", &self.params)
            .field("root_dir", &self.root_dir)
            .field("version", &self.build.version())
            .field("builtins", &self.builtins())
            .field("services", &self.services)
            .field("emitters", &self.emitters)
            .finish_non_exhaustive()
    }
}
