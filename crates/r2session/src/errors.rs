//! Error types surfaced by session operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::ChannelError;
use crate::flags::AddressParseError;

/// A reply could not be parsed under its declared encoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The reply is not well-formed JSON or does not match the expected type.
    #[error("reply to '{command}' is not valid JSON: {source}")]
    Json {
        /// Command whose reply failed to decode.
        command: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The reply parsed but a record is missing required data.
    #[error("reply to '{command}' has an unexpected shape: {message}")]
    Shape {
        /// Command whose reply failed to decode.
        command: String,
        /// Description of the mismatch.
        message: String,
    },
}

impl DecodeError {
    pub(crate) fn json(command: &str, source: serde_json::Error) -> Self {
        Self::Json {
            command: command.to_owned(),
            source,
        }
    }

    pub(crate) fn shape(command: &str, message: impl Into<String>) -> Self {
        Self::Shape {
            command: command.to_owned(),
            message: message.into(),
        }
    }
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine process for a target could not be started.
    #[error("failed to open session on '{}': {source}", .target.display())]
    Open {
        /// Binary or path the engine was asked to open.
        target: PathBuf,
        /// Spawn or handshake failure.
        #[source]
        source: ChannelError,
    },

    /// The channel failed to deliver a command or its reply.
    #[error("command '{command}' failed: {source}")]
    Channel {
        /// Command being executed.
        command: String,
        /// Underlying transport failure.
        #[source]
        source: ChannelError,
    },

    /// A reply could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The plugin category has no registered format descriptor.
    #[error("plugin category '{category}' is not registered")]
    UnknownCategory {
        /// Category requested by the caller.
        category: String,
    },

    /// A batch stopped early because its error callback asked it to.
    #[error(
        "batch aborted at command {failed_index} ('{command}') after {} replies: {source}",
        .completed.len()
    )]
    BatchAborted {
        /// Index of the command whose failure stopped the batch.
        failed_index: usize,
        /// The failing command.
        command: String,
        /// Replies collected before the failure, in input order.
        completed: Vec<String>,
        /// Failure reported by the channel.
        #[source]
        source: ChannelError,
    },

    /// An address string could not be canonicalised.
    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),

    /// A settings snapshot is already held by the session.
    #[error("a settings snapshot is already held; restore it before storing another")]
    SnapshotPending,
}

impl SessionError {
    pub(crate) fn channel(command: &str, source: ChannelError) -> Self {
        Self::Channel {
            command: command.to_owned(),
            source,
        }
    }

    pub(crate) fn unknown_category(category: &str) -> Self {
        Self::UnknownCategory {
            category: category.to_owned(),
        }
    }
}
