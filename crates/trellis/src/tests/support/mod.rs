//! Test doubles and fixtures shared by the assembly suites.

mod log_installer;
mod project;
mod provider;
mod reporter;
mod services;
mod world;

pub use log_installer::RecordingLogInstaller;
pub use project::ProjectDir;
pub use provider::{PostBuildBehaviour, RecordingProvider};
pub use reporter::{AssemblyEvent, RecordingAssemblyReporter};
pub use services::{Cache, Mailer, RejectingService};
pub use world::{TestWorld, world};
