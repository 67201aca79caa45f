//! Environment tags and process modes.
//!
//! Exactly one [`Mode`] is active for the lifetime of a process. Serving modes
//! carry an [`Environment`] tag that selects the configuration variant; helper
//! and migration modes never serve traffic and materialize the development
//! variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Closed set of environment tags recognised in configuration filenames.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    EnumIter,
)]
pub enum Environment {
    /// Local development.
    #[serde(rename = "dev")]
    #[strum(serialize = "dev")]
    Development,
    /// Automated test runs.
    #[serde(rename = "test")]
    #[strum(serialize = "test")]
    Test,
    /// Production; also the implicit tag of untagged configuration files.
    #[serde(rename = "prod")]
    #[strum(serialize = "prod")]
    Production,
}

/// Non-serving helper modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum HelperMode {
    /// Interactive shell bound to the assembled host.
    Shell,
    /// Ad-hoc command execution.
    Cmd,
    /// Deployment helper.
    Deploy,
}

/// Data layer migration modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
pub enum MigrationMode {
    /// Initialise the migration repository.
    #[strum(serialize = "db-init")]
    Init,
    /// Generate a migration from model changes.
    #[strum(serialize = "db-migrate")]
    Migrate,
    /// Apply pending migrations.
    #[strum(serialize = "db-upgrade")]
    Upgrade,
}

/// Operating mode of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Serving mode bound to an environment.
    Run(Environment),
    /// Helper mode.
    Helper(HelperMode),
    /// Migration mode.
    Migration(MigrationMode),
}

impl Mode {
    /// Environment used when materializing configuration for this mode.
    ///
    /// Helper and migration modes fall back to [`Environment::Development`].
    #[must_use]
    pub const fn environment(self) -> Environment {
        match self {
            Self::Run(environment) => environment,
            Self::Helper(_) | Self::Migration(_) => Environment::Development,
        }
    }

    /// Returns `true` for modes that run the serving loop.
    #[must_use]
    pub const fn is_serving(self) -> bool {
        matches!(self, Self::Run(_))
    }

    /// Returns `true` when the mode runs the test environment.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Run(Environment::Test))
    }
}

impl From<Environment> for Mode {
    fn from(environment: Environment) -> Self {
        Self::Run(environment)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(environment) => environment.fmt(formatter),
            Self::Helper(helper) => helper.fmt(formatter),
            Self::Migration(migration) => migration.fmt(formatter),
        }
    }
}

/// Error returned when a mode label is not recognised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported mode '{0}'")]
pub struct ModeParseError(String);

impl ModeParseError {
    /// Returns the label that failed to parse.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(environment) = trimmed.parse::<Environment>() {
            return Ok(Self::Run(environment));
        }
        if let Ok(helper) = trimmed.parse::<HelperMode>() {
            return Ok(Self::Helper(helper));
        }
        trimmed
            .parse::<MigrationMode>()
            .map(Self::Migration)
            .map_err(|_| ModeParseError(trimmed.to_owned()))
    }
}
