//! Errors raised by command channel implementations.

use std::io;
use std::string::FromUtf8Error;
use std::sync::Arc;

use thiserror::Error;

/// Failures delivering a command to the engine or reading its reply.
///
/// I/O errors are wrapped in `Arc` so the enum stays `Clone` and can be
/// carried inside aggregated batch outcomes.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The engine binary could not be located.
    #[error("engine binary not found: {command}")]
    BinaryNotFound {
        /// Command that was looked up.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The engine process could not be spawned.
    #[error("failed to spawn engine process: {message}")]
    SpawnFailed {
        /// Description of the spawn failure.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Reading from or writing to the engine failed.
    #[error("I/O error on command channel: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The engine closed its output before completing a reply.
    #[error("engine process exited before replying")]
    ProcessExited,

    /// The reply was not valid UTF-8.
    #[error("engine reply is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] FromUtf8Error),

    /// The command contains a line break and would desynchronise framing.
    #[error("command must fit on a single line: {command:?}")]
    MultilineCommand {
        /// Offending command.
        command: String,
    },

    /// A command was issued while the same thread already holds the channel,
    /// e.g. from a batch error callback.
    #[error("command issued while the channel is busy on this thread")]
    Reentrant,

    /// A previous caller panicked while holding the channel.
    #[error("command channel is poisoned by an earlier panic")]
    Poisoned,

    /// Failure reported by a custom channel implementation.
    #[error("command channel failed: {message}")]
    Other {
        /// Description supplied by the channel.
        message: String,
    },
}

impl ChannelError {
    /// Builds an [`ChannelError::Other`] from a message.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<io::Error> for ChannelError {
    fn from(error: io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}
