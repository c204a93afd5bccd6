//! Engine child process speaking the NUL-framed pipe protocol.

use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;

use tracing::debug;

use r2session_config::Config;

use super::error::ChannelError;
use super::transport::NulTransport;
use super::CommandChannel;

/// Log target for channel operations.
pub(crate) const CHANNEL_TARGET: &str = "r2session::channel";

/// Command that makes the engine exit without prompting.
const QUIT_COMMAND: &str = "q!";

/// Lifecycle of the engine process.
pub(crate) enum ProcessState {
    /// Process is running and ready for commands.
    Running {
        /// The child process handle.
        child: Child,
        /// Framed pipe transport.
        transport: NulTransport<ChildStdout, ChildStdin>,
    },
    /// Process has been shut down.
    Stopped,
}

/// Channel backed by a spawned engine process.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use r2session::channel::{CommandChannel, ProcessChannel};
/// use r2session_config::Config;
///
/// let mut channel = ProcessChannel::spawn(&Config::default(), Path::new("/bin/ls"))?;
/// let info = channel.send("ij")?;
/// channel.shutdown()?;
/// # Ok::<(), r2session::channel::ChannelError>(())
/// ```
pub struct ProcessChannel {
    program: PathBuf,
    state: ProcessState,
}

impl ProcessChannel {
    /// Spawns the configured engine against `target` and waits until it is
    /// ready to accept commands.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::BinaryNotFound`] when the engine binary is
    /// missing, [`ChannelError::SpawnFailed`] for other spawn failures, and
    /// [`ChannelError::ProcessExited`] if the engine quits while loading.
    pub fn spawn(config: &Config, target: &Path) -> Result<Self, ChannelError> {
        Self::spawn_with(config.engine_binary(), &config.engine_args(), target)
    }

    /// Spawns `program` with explicit arguments followed by `target`.
    ///
    /// # Errors
    ///
    /// See [`ProcessChannel::spawn`].
    pub fn spawn_with(
        program: &Path,
        args: &[String],
        target: &Path,
    ) -> Result<Self, ChannelError> {
        debug!(
            target: CHANNEL_TARGET,
            program = %program.display(),
            ?args,
            target_path = %target.display(),
            "spawning engine process"
        );

        let mut child = Command::new(program)
            .args(args)
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                if error.kind() == std::io::ErrorKind::NotFound {
                    ChannelError::BinaryNotFound {
                        command: program.display().to_string(),
                        source: Arc::new(error),
                    }
                } else {
                    ChannelError::SpawnFailed {
                        message: format!("failed to start {}", program.display()),
                        source: Arc::new(error),
                    }
                }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ChannelError::SpawnFailed {
            message: String::from("failed to capture stdin"),
            source: Arc::new(std::io::Error::other("no stdin")),
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChannelError::SpawnFailed {
                message: String::from("failed to capture stdout"),
                source: Arc::new(std::io::Error::other("no stdout")),
            })?;

        let mut transport = NulTransport::new(stdout, stdin);
        if let Err(error) = transport.await_ready() {
            drop(child.kill());
            drop(child.wait());
            return Err(error);
        }

        debug!(
            target: CHANNEL_TARGET,
            pid = child.id(),
            "engine process ready"
        );

        Ok(Self {
            program: program.to_path_buf(),
            state: ProcessState::Running { child, transport },
        })
    }

    /// Returns the engine executable this channel was spawned from.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    /// Returns `true` while the engine process is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running { .. })
    }

    /// Asks the engine to quit and waits for the process to exit.
    ///
    /// Calling this on a stopped channel is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Io`] if waiting on the child fails.
    pub fn shutdown(&mut self) -> Result<(), ChannelError> {
        let ProcessState::Running {
            mut child,
            mut transport,
        } = std::mem::replace(&mut self.state, ProcessState::Stopped)
        else {
            return Ok(());
        };

        if let Err(error) = transport.send(QUIT_COMMAND) {
            debug!(
                target: CHANNEL_TARGET,
                error = %error,
                "quit command failed, killing engine"
            );
            drop(child.kill());
        }
        drop(transport);

        let status = child.wait()?;
        debug!(target: CHANNEL_TARGET, ?status, "engine process exited");
        Ok(())
    }
}

impl CommandChannel for ProcessChannel {
    fn send(&mut self, command: &str) -> Result<String, ChannelError> {
        let ProcessState::Running { transport, .. } = &mut self.state else {
            return Err(ChannelError::ProcessExited);
        };
        transport.send(command)?;
        transport.receive()
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        if let ProcessState::Running { child, .. } = &mut self.state {
            debug!(
                target: CHANNEL_TARGET,
                pid = child.id(),
                "engine channel dropped while running, killing process"
            );
            drop(child.kill());
            drop(child.wait());
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn reports_missing_binary() {
        let result = ProcessChannel::spawn_with(
            Path::new("/nonexistent/path/to/r2"),
            &[String::from("-q0")],
            Path::new("/bin/true"),
        );
        assert!(matches!(
            result,
            Err(ChannelError::BinaryNotFound { .. })
        ));
    }

    /// Shell stand-in for the engine: prints the ready marker, then answers
    /// every line with `ok` until stdin closes.
    #[cfg(unix)]
    fn fake_engine() -> ProcessChannel {
        let args = [
            String::from("-c"),
            String::from(r"printf '\000'; while read -r line; do printf 'ok\000'; done"),
        ];
        ProcessChannel::spawn_with(Path::new("sh"), &args, Path::new("r2session-engine"))
            .expect("fake engine should start")
    }

    #[cfg(unix)]
    #[rstest]
    fn round_trips_commands_until_shutdown() {
        let mut channel = fake_engine();
        assert!(channel.is_running());
        assert_eq!(channel.program(), Path::new("sh"));

        assert_eq!(channel.send("ij").expect("reply"), "ok");
        assert_eq!(channel.send("s").expect("reply"), "ok");

        channel.shutdown().expect("shutdown");
        assert!(!channel.is_running());
        assert!(matches!(channel.send("s"), Err(ChannelError::ProcessExited)));
        channel.shutdown().expect("second shutdown is a no-op");
    }

    #[cfg(unix)]
    #[rstest]
    fn reports_engine_exiting_before_ready() {
        let result = ProcessChannel::spawn_with(Path::new("true"), &[], Path::new("ignored"));
        assert!(matches!(result, Err(ChannelError::ProcessExited)));
    }
}
