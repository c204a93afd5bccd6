//! Default values applied when a configuration layer leaves a field unset.

use crate::logging::LogFormat;

/// Engine executable launched when no binary is configured.
pub const DEFAULT_ENGINE_BINARY: &str = "r2";

/// Flags passed to the engine so it speaks the NUL-terminated pipe protocol.
pub const DEFAULT_ENGINE_ARGS: &str = "-q0";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings namespace captured by snapshot helpers when none is given.
pub const DEFAULT_SETTINGS_PREFIX: &str = "asm.";

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
