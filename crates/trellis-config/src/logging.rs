use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::defaults;
use crate::settings::{Settings, SettingsError};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Default single-line output with every field.
    #[default]
    Full,
    /// Abbreviated single-line output.
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Size-based log file rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Rotation {
    /// Never rotate.
    Never,
    /// Rotate once the file would exceed the given number of bytes.
    Size(u64),
}

impl Rotation {
    /// Size limit in bytes, when rotation is enabled.
    #[must_use]
    pub const fn limit(self) -> Option<u64> {
        match self {
            Self::Never => None,
            Self::Size(bytes) => Some(bytes),
        }
    }
}

/// Errors encountered while parsing a [`Rotation`] policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RotationParseError {
    /// The numeric part was missing or not an integer.
    #[error("invalid rotation size in '{0}'")]
    InvalidSize(String),
    /// The unit was not recognised.
    #[error("unsupported rotation unit in '{0}'")]
    InvalidUnit(String),
    /// The size overflowed a 64-bit byte count.
    #[error("rotation size in '{0}' is too large")]
    Overflow(String),
}

impl FromStr for Rotation {
    type Err = RotationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("never") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::Never);
        }
        let split = trimmed
            .find(|character: char| !character.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let amount: u64 = digits
            .parse()
            .map_err(|_| RotationParseError::InvalidSize(input.to_owned()))?;
        let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "KB" => 1_000,
            "MB" => 1_000_000,
            "GB" => 1_000_000_000,
            "KIB" => 1 << 10,
            "MIB" => 1 << 20,
            "GIB" => 1 << 30,
            _ => return Err(RotationParseError::InvalidUnit(input.to_owned())),
        };
        amount
            .checked_mul(multiplier)
            .map(Self::Size)
            .ok_or_else(|| RotationParseError::Overflow(input.to_owned()))
    }
}

impl TryFrom<String> for Rotation {
    type Error = RotationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rotation> for String {
    fn from(rotation: Rotation) -> Self {
        rotation.to_string()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => formatter.write_str("never"),
            Self::Size(bytes) => write!(formatter, "{bytes} B"),
        }
    }
}

/// Parameters for the process-wide logger.
///
/// Values come from the optional `log` component merged over
/// [`LogSettings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Destination file; relative paths resolve against the project root.
    pub path: Utf8PathBuf,
    /// Filter expression such as `debug` or `trellis=info,warn`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Rotation policy for the destination file.
    pub rotation: Rotation,
    /// Forces structured JSON output when set.
    pub serialize: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from(defaults::DEFAULT_LOG_PATH),
            level: defaults::DEFAULT_LOG_LEVEL.to_owned(),
            format: LogFormat::default(),
            rotation: Rotation::Size(defaults::DEFAULT_LOG_ROTATION_BYTES),
            serialize: false,
        }
    }
}

impl LogSettings {
    /// Merges a materialized mapping over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a recognised key holds a value of the
    /// wrong shape.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        settings.deserialize()
    }

    /// Format after applying the `serialize` flag.
    #[must_use]
    pub const fn effective_format(&self) -> LogFormat {
        if self.serialize {
            LogFormat::Json
        } else {
            self.format
        }
    }

    /// Destination path resolved against `root`.
    #[must_use]
    pub fn resolved_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        }
    }
}
