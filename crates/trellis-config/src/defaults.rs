/// Component name of the logger configuration.
pub const LOG_COMPONENT: &str = "log";

/// Component name of the host configuration.
pub const HOST_COMPONENT: &str = "app";

/// Component name whose presence enables the data layer.
pub const DATA_LAYER_COMPONENT: &str = "db";

/// Component name whose presence enables the realtime layer.
pub const REALTIME_COMPONENT: &str = "socket";

/// Directory, relative to the root, holding configuration files.
pub const DEFAULT_CONFIG_DIR: &str = "configs";

/// Default network host the serving loop binds to.
pub const DEFAULT_HOST: &str = "localhost";

/// Default network port the serving loop binds to.
pub const DEFAULT_PORT: u16 = 5000;

/// Default log destination.
pub const DEFAULT_LOG_PATH: &str = "./var/logs/system.log";

/// Default log filter expression.
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Default rotation threshold (10 MB).
pub const DEFAULT_LOG_ROTATION_BYTES: u64 = 10_000_000;

pub(crate) const fn default_true() -> bool {
    true
}
