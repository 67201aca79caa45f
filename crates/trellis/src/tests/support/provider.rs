//! Built-in provider double: every component it builds writes into one shared
//! journal so tests can assert on construction order and registrations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use trellis_config::{DataLayerConfig, HostConfig, MigrationMode, RealtimeConfig};

use crate::app_error::{ErrorClass, ErrorHandler};
use crate::builtins::{
    BuiltinKind, BuiltinProvider, DataLayer, NamespaceHandler, Realtime, SocketErrorHandler,
};
use crate::error::{ComponentError, PostBuildError};
use crate::host::{
    CliCommand, Host, HostParams, LifecycleHook, RouteRegistration, ServingHandle, ShellProcessor,
};
use crate::push::{PushAction, PushSink};

/// How the recording host answers its post-build hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PostBuildBehaviour {
    /// Keep the trait's default.
    #[default]
    NotImplemented,
    /// Succeed.
    Succeed,
    /// Fail with the message.
    Fail(String),
}

/// Everything the recording components observed.
#[derive(Default)]
pub struct ProviderState {
    pub journal: Vec<String>,
    pub host_builds: usize,
    pub host_params: Option<HostParams>,
    pub host_config: Option<HostConfig>,
    pub data_layer_config: Option<DataLayerConfig>,
    pub realtime_config: Option<RealtimeConfig>,
    pub setup_handle: Option<ServingHandle>,
    pub routes: Vec<RouteRegistration>,
    pub errors: Vec<(ErrorClass, ErrorHandler)>,
    pub hooks: Vec<LifecycleHook>,
    pub shell_processors: Vec<ShellProcessor>,
    pub commands: Vec<CliCommand>,
    pub namespaces: Vec<Box<dyn NamespaceHandler>>,
    pub socket_error_handlers: Vec<(String, SocketErrorHandler)>,
    pub emitted: Vec<(String, Value, Option<String>)>,
    pub pushes: Vec<(PushAction, String, String)>,
    pub migrations: Vec<MigrationMode>,
    pub served: usize,
    pub shells: usize,
    pub postbuild: PostBuildBehaviour,
    pub failures: HashMap<BuiltinKind, String>,
}

impl ProviderState {
    /// Handler registered for `class`; later registrations win.
    pub fn handler_for(&self, class: ErrorClass) -> Option<ErrorHandler> {
        self.errors
            .iter()
            .rev()
            .find(|(registered, _)| *registered == class)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Classes in registration order.
    pub fn error_classes(&self) -> Vec<ErrorClass> {
        self.errors.iter().map(|(class, _)| *class).collect()
    }
}

/// Provider whose components record into a shared [`ProviderState`].
#[derive(Clone, Default)]
pub struct RecordingProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl RecordingProvider {
    /// Locks the shared state.
    pub fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().expect("provider state mutex poisoned")
    }

    /// Makes construction of `kind` fail.
    pub fn fail_on(&self, kind: BuiltinKind, message: impl Into<String>) {
        self.state().failures.insert(kind, message.into());
    }

    /// Sets the host's post-build behaviour.
    pub fn postbuild(&self, behaviour: PostBuildBehaviour) {
        self.state().postbuild = behaviour;
    }

    /// Copy of the journal.
    pub fn journal(&self) -> Vec<String> {
        self.state().journal.clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.state().journal.push(entry.into());
    }

    fn check(&self, kind: BuiltinKind) -> Result<(), ComponentError> {
        match self.state().failures.get(&kind) {
            Some(message) => Err(ComponentError::new(kind.component(), message.clone())),
            None => Ok(()),
        }
    }
}

impl BuiltinProvider for RecordingProvider {
    fn build_host(
        &self,
        params: &HostParams,
        config: HostConfig,
    ) -> Result<Box<dyn Host>, ComponentError> {
        self.check(BuiltinKind::Host)?;
        self.record("build_host");
        let wildcard = config.wildcard_builtin_error_handler_enabled;
        {
            let mut state = self.state();
            state.host_builds += 1;
            state.host_params = Some(params.clone());
            state.host_config = Some(config);
        }
        Ok(Box::new(RecordingHost {
            provider: self.clone(),
            handle: ServingHandle::new(params.url()),
            wildcard,
        }))
    }

    fn build_data_layer(
        &self,
        config: DataLayerConfig,
    ) -> Result<Box<dyn DataLayer>, ComponentError> {
        self.check(BuiltinKind::DataLayer)?;
        self.record("build_data_layer");
        self.state().data_layer_config = Some(config);
        Ok(Box::new(RecordingDataLayer {
            provider: self.clone(),
        }))
    }

    fn build_realtime(
        &self,
        config: RealtimeConfig,
        host: &dyn Host,
    ) -> Result<Box<dyn Realtime>, ComponentError> {
        self.check(BuiltinKind::Realtime)?;
        self.record("build_realtime");
        let _ = host.serving_handle();
        self.state().realtime_config = Some(config);
        Ok(Box::new(RecordingRealtime {
            provider: self.clone(),
        }))
    }
}

/// Host recording every registration.
pub struct RecordingHost {
    provider: RecordingProvider,
    handle: ServingHandle,
    wildcard: bool,
}

impl Host for RecordingHost {
    fn register_route(&mut self, route: RouteRegistration) -> Result<(), ComponentError> {
        self.provider.record(format!("route {}", route.route));
        self.provider.state().routes.push(route);
        Ok(())
    }

    fn register_error(
        &mut self,
        class: ErrorClass,
        handler: ErrorHandler,
    ) -> Result<(), ComponentError> {
        self.provider.record(format!("error {class}"));
        self.provider.state().errors.push((class, handler));
        Ok(())
    }

    fn register_lifecycle_hook(&mut self, hook: LifecycleHook) -> Result<(), ComponentError> {
        self.provider.record(format!("hook {}", hook.kind()));
        self.provider.state().hooks.push(hook);
        Ok(())
    }

    fn register_shell_processor(
        &mut self,
        processor: ShellProcessor,
    ) -> Result<(), ComponentError> {
        self.provider.record("shell_processor");
        self.provider.state().shell_processors.push(processor);
        Ok(())
    }

    fn register_cli_command(&mut self, command: CliCommand) -> Result<(), ComponentError> {
        self.provider.record(format!("command {}", command.name()));
        self.provider.state().commands.push(command);
        Ok(())
    }

    fn wildcard_builtin_error_handler_enabled(&self) -> bool {
        self.wildcard
    }

    fn serving_handle(&self) -> ServingHandle {
        self.handle.clone()
    }

    fn push_sink(&self) -> Option<Arc<dyn PushSink>> {
        Some(Arc::new(RecordingPushSink {
            provider: self.provider.clone(),
        }))
    }

    fn postbuild(&mut self) -> Result<(), PostBuildError> {
        self.provider.record("postbuild");
        match self.provider.state().postbuild.clone() {
            PostBuildBehaviour::NotImplemented => Err(PostBuildError::NotImplemented),
            PostBuildBehaviour::Succeed => Ok(()),
            PostBuildBehaviour::Fail(message) => {
                Err(ComponentError::new("app", message).into())
            }
        }
    }

    fn serve(&self) -> Result<(), ComponentError> {
        self.provider.state().served += 1;
        Ok(())
    }

    fn run_shell(&self) -> Result<(), ComponentError> {
        self.provider.state().shells += 1;
        Ok(())
    }
}

/// Data layer recording setup and migrations.
pub struct RecordingDataLayer {
    provider: RecordingProvider,
}

impl DataLayer for RecordingDataLayer {
    fn setup(&mut self, handle: &ServingHandle) -> Result<(), ComponentError> {
        self.provider.record("setup_data_layer");
        self.provider.state().setup_handle = Some(handle.clone());
        Ok(())
    }

    fn init_migrations(&self) -> Result<(), ComponentError> {
        self.provider.state().migrations.push(MigrationMode::Init);
        Ok(())
    }

    fn migrate(&self) -> Result<(), ComponentError> {
        self.provider.state().migrations.push(MigrationMode::Migrate);
        Ok(())
    }

    fn upgrade(&self) -> Result<(), ComponentError> {
        self.provider.state().migrations.push(MigrationMode::Upgrade);
        Ok(())
    }
}

/// Realtime layer recording bindings and emitted events.
pub struct RecordingRealtime {
    provider: RecordingProvider,
}

impl Realtime for RecordingRealtime {
    fn bind_namespace(&mut self, handler: Box<dyn NamespaceHandler>) -> Result<(), ComponentError> {
        self.provider
            .record(format!("namespace {}", handler.namespace()));
        self.provider.state().namespaces.push(handler);
        Ok(())
    }

    fn bind_error_handler(
        &mut self,
        namespace: &str,
        handler: SocketErrorHandler,
    ) -> Result<(), ComponentError> {
        self.provider
            .state()
            .socket_error_handlers
            .push((namespace.to_owned(), handler));
        Ok(())
    }

    fn emit(
        &self,
        event: &str,
        payload: &Value,
        namespace: Option<&str>,
    ) -> Result<(), ComponentError> {
        self.provider.state().emitted.push((
            event.to_owned(),
            payload.clone(),
            namespace.map(str::to_owned),
        ));
        Ok(())
    }
}

/// Push channel recording each operation.
pub struct RecordingPushSink {
    provider: RecordingProvider,
}

impl RecordingPushSink {
    fn push(&self, action: PushAction, target: &str, content: &str) -> Result<(), ComponentError> {
        self.provider
            .state()
            .pushes
            .push((action, target.to_owned(), content.to_owned()));
        Ok(())
    }
}

impl PushSink for RecordingPushSink {
    fn append(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Append, target, content)
    }

    fn prepend(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Prepend, target, content)
    }

    fn replace(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Replace, target, content)
    }

    fn update(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Update, target, content)
    }

    fn remove(&self, target: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Remove, target, "")
    }

    fn before(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::Before, target, content)
    }

    fn after(&self, target: &str, content: &str) -> Result<(), ComponentError> {
        self.push(PushAction::After, target, content)
    }
}
