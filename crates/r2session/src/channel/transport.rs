//! NUL-framed pipe transport.
//!
//! The engine's pipe mode uses a minimal framing protocol:
//! ```text
//! <command>\n          (client -> engine)
//! <reply bytes>\0      (engine -> client)
//! ```
//! A single `\0` is also emitted once the engine has finished loading.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use super::error::ChannelError;

const TERMINATOR: u8 = 0;

/// Writes newline-terminated commands and reads NUL-terminated replies.
pub struct NulTransport<R: Read, W: Write> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
}

impl<R: Read, W: Write> NulTransport<R, W> {
    /// Wraps the engine's output and input streams.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        }
    }

    /// Consumes the readiness marker the engine prints after loading.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ProcessExited`] if the stream ends first.
    pub fn await_ready(&mut self) -> Result<(), ChannelError> {
        self.receive().map(drop)
    }

    /// Sends one command.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::MultilineCommand`] for commands containing a
    /// line break, or [`ChannelError::Io`] if the write fails.
    pub fn send(&mut self, command: &str) -> Result<(), ChannelError> {
        if command.contains(['\n', '\r']) {
            return Err(ChannelError::MultilineCommand {
                command: command.to_owned(),
            });
        }
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Receives one reply (blocks until the terminator arrives).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ProcessExited`] if the stream ends before the
    /// terminator and [`ChannelError::InvalidUtf8`] for non-UTF-8 replies.
    pub fn receive(&mut self) -> Result<String, ChannelError> {
        let mut buffer = Vec::new();
        self.reader.read_until(TERMINATOR, &mut buffer)?;
        if buffer.pop() != Some(TERMINATOR) {
            return Err(ChannelError::ProcessExited);
        }
        String::from_utf8(buffer).map_err(ChannelError::InvalidUtf8)
    }

    /// Returns the writer, e.g. to inspect bytes written in tests.
    #[must_use]
    pub fn writer(&self) -> &W {
        self.writer.get_ref()
    }
}
