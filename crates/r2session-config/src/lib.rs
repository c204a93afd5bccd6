//! Shared configuration for r2 session clients.
//!
//! [`Config`] is assembled by `ortho_config` from, in increasing precedence,
//! built-in defaults, an optional TOML file, `R2SESSION_*` environment
//! variables and command-line flags. Every field is optional so that each
//! layer may leave it untouched; the accessor methods fill the gaps from
//! [`defaults`].

pub mod defaults;
mod logging;

use std::path::{Path, PathBuf};

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ENGINE_ARGS, DEFAULT_ENGINE_BINARY, DEFAULT_LOG_FILTER, DEFAULT_SETTINGS_PREFIX,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered configuration for a session client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "R2SESSION")]
pub struct Config {
    /// Engine executable to launch for process-backed channels.
    pub engine_binary: Option<PathBuf>,
    /// Whitespace-separated arguments placed before the target path.
    pub engine_args: Option<String>,
    /// `tracing` filter expression, e.g. `r2session=debug`.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Settings prefix captured by snapshot helpers.
    pub settings_prefix: Option<String>,
}

impl Config {
    /// Engine executable, falling back to [`DEFAULT_ENGINE_BINARY`].
    #[must_use]
    pub fn engine_binary(&self) -> &Path {
        self.engine_binary
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_ENGINE_BINARY))
    }

    /// Engine arguments split on whitespace.
    #[must_use]
    pub fn engine_args(&self) -> Vec<String> {
        self.engine_args
            .as_deref()
            .unwrap_or(DEFAULT_ENGINE_ARGS)
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Settings prefix used when capturing snapshots.
    #[must_use]
    pub fn settings_prefix(&self) -> &str {
        self.settings_prefix
            .as_deref()
            .unwrap_or(DEFAULT_SETTINGS_PREFIX)
    }
}
