//! The assembly engine.
//!
//! [`Assembler`] collects the mode, build declaration and run-time inputs, and
//! [`Assembler::assemble`] runs every [`Phase`] in order against a
//! [`BuiltinProvider`]. Any failure aborts the run; no partially wired
//! assembly is ever returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;

use trellis_config::{
    DEFAULT_HOST, DEFAULT_PORT, LOG_COMPONENT, LogSettings, MaterializeError, Materializer, Mode,
    Settings, SourceMap,
};

use crate::app_error::{ErrorClass, wildcard_builtin_error_handler, wildcard_error_handler};
use crate::assembly::Assembly;
use crate::builtins::{
    BuiltinDescriptor, BuiltinKind, BuiltinProvider, DataLayer, Realtime,
    default_socket_error_handler,
};
use crate::declaration::Build;
use crate::emitter::EmitterRegistry;
use crate::error::{AssemblyError, ComponentError, PostBuildError};
use crate::health::{AssemblyReporter, ServiceReplacement, StructuredAssemblyReporter};
use crate::host::{Host, HostParams, HttpMethod, LifecycleHook, RouteRegistration};
use crate::phase::Phase;
use crate::registry::Registry;
use crate::service::ServiceRegistry;
use crate::telemetry::{LogInstaller, TracingLogInstaller};

const ASSEMBLY_TARGET: &str = "trellis::assembly";

/// Builder and entry point of the assembly engine.
pub struct Assembler {
    mode: Mode,
    build: Build,
    root_dir: Utf8PathBuf,
    host: String,
    port: u16,
    overrides: BTreeMap<String, Settings>,
    reporter: Arc<dyn AssemblyReporter>,
    log_installer: Arc<dyn LogInstaller>,
}

impl Assembler {
    /// Starts an assembly of `build` in `mode`, rooted at the working
    /// directory.
    #[must_use]
    pub fn new(mode: Mode, build: Build) -> Self {
        Self {
            mode,
            build,
            root_dir: Utf8PathBuf::from("."),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            overrides: BTreeMap::new(),
            reporter: Arc::new(StructuredAssemblyReporter::new()),
            log_installer: Arc::new(TracingLogInstaller::new()),
        }
    }

    /// Overrides the project root.
    #[must_use]
    pub fn root_dir(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    /// Overrides the network host handed to the host component.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Overrides the network port handed to the host component.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Adds settings that win over the files of `component`.
    ///
    /// Repeated calls for one component merge, later keys winning.
    #[must_use]
    pub fn override_config(mut self, component: impl Into<String>, settings: Settings) -> Self {
        self.overrides
            .entry(component.into())
            .or_default()
            .merge(&settings);
        self
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn AssemblyReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the logger installer.
    #[must_use]
    pub fn log_installer(mut self, installer: Arc<dyn LogInstaller>) -> Self {
        self.log_installer = installer;
        self
    }

    /// Active mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Configuration directory resolved against the root.
    #[must_use]
    pub fn config_dir(&self) -> Utf8PathBuf {
        let config_dir = self.build.config_dir();
        if config_dir.is_absolute() {
            config_dir.to_path_buf()
        } else {
            self.root_dir.join(config_dir)
        }
    }

    /// Runs every phase and returns the owned assembly.
    ///
    /// # Errors
    ///
    /// Returns the first phase failure, naming the phase and component.
    pub fn assemble<P>(self, provider: &P) -> Result<Assembly, AssemblyError>
    where
        P: BuiltinProvider + ?Sized,
    {
        let reporter = Arc::clone(&self.reporter);
        reporter.assembly_starting(self.mode, &self.root_dir);
        match self.run_phases(provider) {
            Ok(assembly) => {
                reporter.assembly_succeeded(&assembly.summary());
                Ok(assembly)
            }
            Err(error) => {
                reporter.assembly_failed(&error);
                Err(error)
            }
        }
    }

    /// Assembles into `registry`, or returns the assembly already there.
    ///
    /// The registry slot is claimed before the first phase runs, so a lookup
    /// made while assembling fails with
    /// [`RegistryError::UnderConstruction`](crate::RegistryError::UnderConstruction)
    /// rather than starting a second assembly.
    ///
    /// # Errors
    ///
    /// Returns the phase failure, or a registry error for re-entrant calls.
    pub fn assemble_into<P>(
        self,
        registry: &Registry,
        provider: &P,
    ) -> Result<Arc<Assembly>, AssemblyError>
    where
        P: BuiltinProvider + ?Sized,
    {
        registry.get_or_try_register(|| self.assemble(provider))
    }

    /// Assembles into the process-wide registry.
    ///
    /// # Errors
    ///
    /// See [`Assembler::assemble_into`].
    pub fn assemble_global<P>(self, provider: &P) -> Result<Arc<Assembly>, AssemblyError>
    where
        P: BuiltinProvider + ?Sized,
    {
        self.assemble_into(Registry::global(), provider)
    }

    fn run_phases<P>(self, provider: &P) -> Result<Assembly, AssemblyError>
    where
        P: BuiltinProvider + ?Sized,
    {
        let config_dir = self.config_dir();
        let sources =
            SourceMap::scan(&config_dir).map_err(|source| AssemblyError::Sources { source })?;

        let params = HostParams {
            mode: self.mode,
            host: self.host.clone(),
            port: self.port,
        };
        let context = PhaseContext {
            assembler: &self,
            sources: &sources,
        };

        let log_settings = context.phase(Phase::Log, || context.install_logging())?;
        let descriptors = context.phase(Phase::Discovery, || {
            warn_shadowed(&sources);
            Ok(BuiltinDescriptor::discover(&sources, params.clone()))
        })?;
        let mut builtins =
            context.phase(Phase::Builtins, || context.construct_builtins(provider, &descriptors))?;
        let services = context.phase(Phase::Services, || context.construct_services())?;
        context.phase(Phase::Views, || context.register_views(builtins.host.as_mut()))?;
        context.phase(Phase::Errors, || context.register_errors(builtins.host.as_mut()))?;
        let emitters =
            context.phase(Phase::Emitters, || context.construct_emitters(builtins.host.as_ref()))?;
        context.phase(Phase::Hooks, || context.register_hooks(builtins.host.as_mut()))?;
        context.phase(Phase::Commands, || context.register_commands(builtins.host.as_mut()))?;
        let sockets = match builtins.realtime.as_mut() {
            Some(realtime) => {
                context.phase(Phase::Sockets, || context.bind_sockets(realtime.as_mut()))?
            }
            None => {
                context.skip_sockets();
                0
            }
        };
        context.phase(Phase::PostBuild, || postbuild(builtins.host.as_mut()))?;

        Ok(Assembly {
            params,
            root_dir: self.root_dir,
            build: self.build,
            sources,
            log_settings,
            host: builtins.host,
            data_layer: builtins.data_layer,
            realtime: builtins.realtime,
            services,
            emitters,
            sockets,
        })
    }
}

struct Builtins {
    host: Box<dyn Host>,
    data_layer: Option<Box<dyn DataLayer>>,
    realtime: Option<Box<dyn Realtime>>,
}

struct PhaseContext<'a> {
    assembler: &'a Assembler,
    sources: &'a SourceMap,
}

impl PhaseContext<'_> {
    fn phase<T>(
        &self,
        phase: Phase,
        step: impl FnOnce() -> Result<T, AssemblyError>,
    ) -> Result<T, AssemblyError> {
        self.assembler.reporter.phase_starting(phase);
        let outcome = step()?;
        self.assembler.reporter.phase_completed(phase);
        Ok(outcome)
    }

    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(
            self.sources,
            &self.assembler.root_dir,
            self.assembler.mode.environment(),
        )
    }

    fn overrides(&self, component: &str) -> Option<&Settings> {
        self.assembler.overrides.get(component)
    }

    fn install_logging(&self) -> Result<LogSettings, AssemblyError> {
        let materializer = self.materializer();
        let overrides = self.overrides(LOG_COMPONENT);
        let config = match materializer.materialize(LOG_COMPONENT, overrides) {
            Err(error) if error.is_unresolved() => {
                tracing::debug!(
                    target: ASSEMBLY_TARGET,
                    component = LOG_COMPONENT,
                    "no log configuration for the active environment; using defaults"
                );
                materializer.materialize_lenient(LOG_COMPONENT, overrides)
            }
            resolved => resolved,
        };
        let settings = config
            .and_then(|config| config.typed::<LogSettings>())
            .map_err(configuration_error(Phase::Log, LOG_COMPONENT))?;
        self.assembler
            .log_installer
            .install(&settings, &self.assembler.root_dir)
            .map_err(|source| AssemblyError::Telemetry {
                phase: Phase::Log,
                source,
            })?;
        Ok(settings)
    }

    fn builtin_config<T: DeserializeOwned>(&self, kind: BuiltinKind) -> Result<T, AssemblyError> {
        let component = kind.component();
        let materializer = self.materializer();
        let overrides = self.overrides(component);
        let config = match kind {
            BuiltinKind::Host => materializer.materialize_tagged(component, overrides),
            BuiltinKind::DataLayer | BuiltinKind::Realtime => {
                materializer.materialize(component, overrides)
            }
        };
        config
            .and_then(|config| config.typed::<T>())
            .map_err(configuration_error(Phase::Builtins, component))
    }

    fn construct_builtins<P>(
        &self,
        provider: &P,
        descriptors: &[BuiltinDescriptor],
    ) -> Result<Builtins, AssemblyError>
    where
        P: BuiltinProvider + ?Sized,
    {
        let mut host: Option<Box<dyn Host>> = None;
        let mut data_layer = None;
        let mut realtime = None;

        for descriptor in descriptors {
            let kind = descriptor.kind();
            match descriptor {
                BuiltinDescriptor::Host(params) => {
                    let config = self.builtin_config(kind)?;
                    let built = provider
                        .build_host(params, config)
                        .map_err(component_error(Phase::Builtins))?;
                    host = Some(built);
                }
                BuiltinDescriptor::DataLayer => {
                    let live_host = require_host(host.as_deref(), kind)?;
                    let config = self.builtin_config(kind)?;
                    let mut layer = provider
                        .build_data_layer(config)
                        .map_err(component_error(Phase::Builtins))?;
                    layer
                        .setup(&live_host.serving_handle())
                        .map_err(component_error(Phase::Builtins))?;
                    data_layer = Some(layer);
                }
                BuiltinDescriptor::Realtime => {
                    let live_host = require_host(host.as_deref(), kind)?;
                    let config = self.builtin_config(kind)?;
                    let layer = provider
                        .build_realtime(config, live_host)
                        .map_err(component_error(Phase::Builtins))?;
                    realtime = Some(layer);
                }
            }
            self.assembler.reporter.builtin_ready(kind);
        }

        let host = host.ok_or_else(|| AssemblyError::Declaration {
            phase: Phase::Builtins,
            subject: BuiltinKind::Host.component().to_owned(),
            message: "no host was constructed".to_owned(),
        })?;
        Ok(Builtins {
            host,
            data_layer,
            realtime,
        })
    }

    fn construct_services(&self) -> Result<ServiceRegistry, AssemblyError> {
        let environment = self.assembler.mode.environment();
        let materializer = self.materializer();
        let mut services = ServiceRegistry::new();

        for descriptor in self.assembler.build.services() {
            let name = descriptor.name();
            let mut overrides = descriptor
                .mode_settings(environment)
                .cloned()
                .unwrap_or_default();
            if let Some(caller) = self.overrides(name) {
                overrides.merge(caller);
            }
            if self
                .sources
                .get(name)
                .is_some_and(|source| source.select(environment).is_none())
            {
                tracing::warn!(
                    target: ASSEMBLY_TARGET,
                    component = name,
                    environment = %environment,
                    "service configuration has no variant for the active environment; \
                     using an empty mapping"
                );
            }
            let config = materializer
                .materialize_lenient(name, Some(&overrides))
                .map_err(configuration_error(Phase::Services, name))?;
            let instance = descriptor
                .factory()
                .construct(&config)
                .map_err(component_error(Phase::Services))?;
            let service_type = descriptor.service_type();
            if let Some(previous) = services.insert(name, service_type, instance) {
                let replacement = ServiceReplacement {
                    service_type,
                    replaced: previous.name().to_owned(),
                    winner: name.to_owned(),
                };
                tracing::warn!(
                    target: ASSEMBLY_TARGET,
                    service_type = %service_type,
                    replaced = %replacement.replaced,
                    winner = %replacement.winner,
                    "later service declaration replaces an earlier one of the same type"
                );
                self.assembler.reporter.service_replaced(&replacement);
            }
        }
        Ok(services)
    }

    fn register_views(&self, host: &mut dyn Host) -> Result<(), AssemblyError> {
        for descriptor in self.assembler.build.views() {
            let route = descriptor.route();
            if !route.starts_with('/') {
                return Err(AssemblyError::Declaration {
                    phase: Phase::Views,
                    subject: descriptor.name().to_owned(),
                    message: format!("route '{route}' must start with '/'"),
                });
            }
            host.register_route(RouteRegistration {
                endpoint: descriptor.endpoint(),
                route: route.to_owned(),
                methods: HttpMethod::ALL.to_vec(),
                view: descriptor.view(),
            })
            .map_err(component_error(Phase::Views))?;
        }
        Ok(())
    }

    fn register_errors(&self, host: &mut dyn Host) -> Result<(), AssemblyError> {
        let mut base_declared = false;
        for descriptor in self.assembler.build.errors() {
            base_declared |= descriptor.class() == ErrorClass::Base;
            host.register_error(descriptor.class(), descriptor.handler())
                .map_err(component_error(Phase::Errors))?;
        }
        if base_declared {
            tracing::debug!(target: ASSEMBLY_TARGET, "application error handler declared by the build");
        } else {
            host.register_error(ErrorClass::Base, wildcard_error_handler())
                .map_err(component_error(Phase::Errors))?;
        }
        if host.wildcard_builtin_error_handler_enabled() {
            host.register_error(ErrorClass::Any, wildcard_builtin_error_handler())
                .map_err(component_error(Phase::Errors))?;
        }
        Ok(())
    }

    fn construct_emitters(&self, host: &dyn Host) -> Result<EmitterRegistry, AssemblyError> {
        let mut emitters = EmitterRegistry::default();
        for descriptor in self.assembler.build.emitters() {
            let emitter = descriptor
                .construct(host)
                .map_err(component_error(Phase::Emitters))?;
            emitters.push(descriptor.name(), emitter);
        }
        Ok(emitters)
    }

    fn register_hooks(&self, host: &mut dyn Host) -> Result<(), AssemblyError> {
        let hooks = self.assembler.build.hooks();
        let lifecycle = hooks
            .context_processors()
            .iter()
            .map(|hook| LifecycleHook::ContextProcessor(Arc::clone(hook)))
            .chain(
                hooks
                    .each_request()
                    .iter()
                    .map(|hook| LifecycleHook::EachRequest(Arc::clone(hook))),
            )
            .chain(
                hooks
                    .first_request()
                    .iter()
                    .map(|hook| LifecycleHook::FirstRequest(Arc::clone(hook))),
            );
        for hook in lifecycle {
            host.register_lifecycle_hook(hook)
                .map_err(component_error(Phase::Hooks))?;
        }
        Ok(())
    }

    fn register_commands(&self, host: &mut dyn Host) -> Result<(), AssemblyError> {
        for processor in self.assembler.build.shell_processors() {
            host.register_shell_processor(Arc::clone(processor))
                .map_err(component_error(Phase::Commands))?;
        }
        for command in self.assembler.build.cli_commands() {
            host.register_cli_command(command.clone())
                .map_err(component_error(Phase::Commands))?;
        }
        Ok(())
    }

    fn bind_sockets(&self, realtime: &mut dyn Realtime) -> Result<usize, AssemblyError> {
        let build = &self.assembler.build;
        for descriptor in build.sockets() {
            let namespace = descriptor.namespace();
            realtime
                .bind_namespace(descriptor.build_handler())
                .map_err(component_error(Phase::Sockets))?;
            let error_handler = descriptor
                .error_handler()
                .or_else(|| build.default_socket_error_handler())
                .map_or_else(default_socket_error_handler, |handler| Arc::clone(handler));
            realtime
                .bind_error_handler(namespace, error_handler)
                .map_err(component_error(Phase::Sockets))?;
        }
        Ok(build.sockets().len())
    }

    fn skip_sockets(&self) {
        let declared = self.assembler.build.sockets().len();
        if declared > 0 {
            tracing::debug!(
                target: ASSEMBLY_TARGET,
                declared,
                "realtime layer is not configured; socket declarations are ignored"
            );
        }
        self.assembler.reporter.phase_skipped(Phase::Sockets);
    }
}

fn postbuild(host: &mut dyn Host) -> Result<(), AssemblyError> {
    match host.postbuild() {
        Ok(()) => Ok(()),
        Err(PostBuildError::NotImplemented) => {
            tracing::debug!(target: ASSEMBLY_TARGET, "host has no post-build hook");
            Ok(())
        }
        Err(PostBuildError::Failed(source)) => Err(AssemblyError::Component {
            phase: Phase::PostBuild,
            source,
        }),
    }
}

fn require_host(host: Option<&dyn Host>, kind: BuiltinKind) -> Result<&dyn Host, AssemblyError> {
    host.ok_or_else(|| AssemblyError::Declaration {
        phase: Phase::Builtins,
        subject: kind.component().to_owned(),
        message: format!("the {kind} requires a host constructed before it"),
    })
}

fn warn_shadowed(sources: &SourceMap) {
    for source in sources.iter() {
        for path in source.shadowed() {
            tracing::warn!(
                target: ASSEMBLY_TARGET,
                component = source.name(),
                path = %path,
                "configuration file is shadowed by another file for the same environment"
            );
        }
    }
}

fn component_error(phase: Phase) -> impl Fn(ComponentError) -> AssemblyError {
    move |source| AssemblyError::Component { phase, source }
}

fn configuration_error(
    phase: Phase,
    component: &str,
) -> impl Fn(MaterializeError) -> AssemblyError + '_ {
    move |source| AssemblyError::Configuration {
        phase,
        component: component.to_owned(),
        source,
    }
}
