//! Scenario world shared across BDD steps.

use std::cell::RefCell;
use std::sync::Arc;

use trellis_config::Mode;

use crate::assembler::Assembler;
use crate::assembly::Assembly;
use crate::declaration::{Build, BuildBuilder, ServiceDescriptor, ViewDescriptor};
use crate::error::AssemblyError;

use super::{ProjectDir, RecordingAssemblyReporter, RecordingLogInstaller, RecordingProvider};

/// Scenario state: a project directory, a declaration and recording doubles.
pub struct TestWorld {
    pub project: ProjectDir,
    pub provider: RecordingProvider,
    pub reporter: Arc<RecordingAssemblyReporter>,
    pub installer: Arc<RecordingLogInstaller>,
    mode: Mode,
    services: Vec<ServiceDescriptor>,
    views: Vec<ViewDescriptor>,
    outcome: Option<Result<Assembly, AssemblyError>>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            project: ProjectDir::new(),
            provider: RecordingProvider::default(),
            reporter: Arc::new(RecordingAssemblyReporter::default()),
            installer: RecordingLogInstaller::default().shared(),
            mode: Mode::Run(trellis_config::Environment::Production),
            services: Vec::new(),
            views: Vec::new(),
            outcome: None,
        }
    }

    pub fn use_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn declare_service(&mut self, descriptor: ServiceDescriptor) {
        self.services.push(descriptor);
    }

    pub fn declare_view(&mut self, descriptor: ViewDescriptor) {
        self.views.push(descriptor);
    }

    /// Declaration assembled from the declared parts.
    pub fn build(&self) -> Build {
        let builder = self
            .services
            .iter()
            .cloned()
            .fold(BuildBuilder::new("1.0.0"), BuildBuilder::service);
        self.views
            .iter()
            .cloned()
            .fold(builder, BuildBuilder::view)
            .build()
    }

    /// Assembles once with the recording doubles.
    pub fn assemble(&mut self) {
        let assembler = Assembler::new(self.mode, self.build())
            .root_dir(self.project.root())
            .reporter(self.reporter.clone())
            .log_installer(self.installer.clone());
        self.outcome = Some(assembler.assemble(&self.provider));
    }

    pub fn assembly(&self) -> &Assembly {
        match self.outcome.as_ref() {
            Some(Ok(assembly)) => assembly,
            Some(Err(error)) => panic!("assembly failed: {error}"),
            None => panic!("assembly has not run"),
        }
    }

    pub fn error(&self) -> &AssemblyError {
        match self.outcome.as_ref() {
            Some(Err(error)) => error,
            Some(Ok(assembly)) => panic!("assembly succeeded unexpectedly: {assembly:?}"),
            None => panic!("assembly has not run"),
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh world for a scenario.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
