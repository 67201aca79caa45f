//! Ordered phases of an assembly run.

use strum::{Display, EnumIter, EnumString};

/// One step of the assembly sequence.
///
/// Variants are declared in execution order, so `Ord` follows the sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Resolve log settings and install the process logger.
    Log,
    /// Decide which built-in components the sources enable.
    Discovery,
    /// Construct the host, data layer and realtime layer.
    Builtins,
    /// Construct caller services.
    Services,
    /// Register views with the host.
    Views,
    /// Register error handlers with the host.
    Errors,
    /// Construct emitters.
    Emitters,
    /// Register lifecycle hooks.
    Hooks,
    /// Register shell processors and command-line commands.
    Commands,
    /// Bind realtime namespaces.
    Sockets,
    /// Give the host a last chance to finish wiring.
    PostBuild,
}
