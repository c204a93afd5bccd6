//! Command channels carrying textual commands to the engine.
//!
//! The session core only ever talks to a [`CommandChannel`]: one command in,
//! one reply out. [`ProcessChannel`] is the production implementation that
//! drives an engine child process over its stdio pipes; tests substitute
//! in-memory channels.

mod error;
mod process;
mod transport;

pub use error::ChannelError;
pub use process::ProcessChannel;
pub use transport::NulTransport;

/// Synchronous request/response link to the engine.
///
/// Implementations must deliver exactly one reply per command and must not
/// reorder replies. The executor serialises access, so implementations need
/// not be internally synchronised.
pub trait CommandChannel: Send {
    /// Sends `command` and blocks until its complete reply is available.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the command cannot be delivered or the
    /// reply cannot be read.
    fn send(&mut self, command: &str) -> Result<String, ChannelError>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for Box<C> {
    fn send(&mut self, command: &str) -> Result<String, ChannelError> {
        (**self).send(command)
    }
}
