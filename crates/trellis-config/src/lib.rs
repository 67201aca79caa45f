//! Configuration discovery and materialization for trellis applications.
//!
//! A project keeps its configuration in one flat directory. Each file belongs
//! to a named component and optionally to one environment:
//!
//! ```text
//! configs/
//!   app.yaml        # host, production (and fallback for every environment)
//!   db.yaml         # data layer, production
//!   db.dev.yaml     # data layer, development
//!   log.test.json   # logger, test runs only
//! ```
//!
//! [`SourceMap::scan`] groups those files by component and environment, and a
//! [`Materializer`] turns one component's files into a [`MaterializedConfig`]
//! for the active [`Environment`], merging caller overrides and injecting the
//! project root. Typed views such as [`HostConfig`] and [`LogSettings`] sit on
//! top of the open [`Settings`] bag.

mod component;
mod defaults;
mod environment;
mod extension;
mod logging;
mod materialize;
mod settings;
mod source;

pub use component::{DataLayerConfig, HostConfig, RealtimeConfig};
pub use defaults::{
    DATA_LAYER_COMPONENT, DEFAULT_CONFIG_DIR, DEFAULT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_LOG_PATH,
    DEFAULT_LOG_ROTATION_BYTES, DEFAULT_PORT, HOST_COMPONENT, LOG_COMPONENT, REALTIME_COMPONENT,
};
pub use environment::{Environment, HelperMode, MigrationMode, Mode, ModeParseError};
pub use extension::ConfigExtension;
pub use logging::{LogFormat, LogSettings, Rotation, RotationParseError};
pub use materialize::{
    ENVIRONMENT_KEY, MaterializeError, MaterializedConfig, Materializer, ROOT_PATH_KEY,
};
pub use settings::{Settings, SettingsError};
pub use source::{ClassifiedFile, ConfigSource, SourceFile, SourceMap, SourceScanError};

#[cfg(test)]
mod tests;
