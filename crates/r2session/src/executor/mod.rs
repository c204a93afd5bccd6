//! Sequential command execution.
//!
//! [`CommandExecutor`] owns the session's [`CommandChannel`] behind a mutex,
//! so at most one command is in flight at a time and every reply is read
//! before the next command is written. Batches hold the channel for their
//! whole run, which keeps a batch contiguous even when other threads share
//! the executor. Issuing a command from inside a batch error callback is
//! rejected with [`ChannelError::Reentrant`] instead of blocking.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::channel::{ChannelError, CommandChannel};
use crate::errors::{DecodeError, SessionError};

/// Log target for executor operations.
const EXECUTOR_TARGET: &str = "r2session::executor";

/// Decision returned by a batch error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchControl {
    /// Record an empty reply for the failed command and carry on.
    Continue,
    /// Stop issuing commands and return the replies collected so far.
    Abort,
}

/// Details passed to a batch error callback.
#[derive(Debug, Clone, Copy)]
pub struct CommandFailure<'a> {
    /// Position of the failed command in the batch.
    pub index: usize,
    /// The failed command.
    pub command: &'a str,
    /// Failure reported by the channel.
    pub error: &'a ChannelError,
}

/// Serialises commands over a single channel.
///
/// # Example
///
/// ```
/// use r2session::channel::{ChannelError, CommandChannel};
/// use r2session::executor::CommandExecutor;
///
/// struct Echo;
///
/// impl CommandChannel for Echo {
///     fn send(&mut self, command: &str) -> Result<String, ChannelError> {
///         Ok(format!("{command}\n"))
///     }
/// }
///
/// let executor = CommandExecutor::new(Echo);
/// let replies = executor.execute_all(["s", "px 4"]).unwrap();
/// assert_eq!(replies, vec!["s", "px 4"]);
/// ```
pub struct CommandExecutor {
    channel: Mutex<Box<dyn CommandChannel>>,
    holder: Mutex<Option<ThreadId>>,
}

impl CommandExecutor {
    /// Wraps a channel.
    #[must_use]
    pub fn new(channel: impl CommandChannel + 'static) -> Self {
        Self::from_boxed(Box::new(channel))
    }

    /// Wraps an already boxed channel.
    #[must_use]
    pub fn from_boxed(channel: Box<dyn CommandChannel>) -> Self {
        Self {
            channel: Mutex::new(channel),
            holder: Mutex::new(None),
        }
    }

    /// Sends one command and returns its raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the channel fails or the call is
    /// made from within a batch error callback on the same executor.
    pub fn execute(&self, command: &str) -> Result<String, SessionError> {
        let mut channel = self
            .lock()
            .map_err(|source| SessionError::channel(command, source))?;
        send_logged(&mut **channel, command)
            .map_err(|source| SessionError::channel(command, source))
    }

    /// Sends commands strictly in input order.
    ///
    /// Each reply has one trailing newline removed and lands at the index of
    /// its command. When a command fails, `on_error` decides whether the
    /// batch continues (the slot receives an empty reply) or stops. A
    /// stopped batch issues no further commands; commands already answered
    /// are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BatchAborted`] carrying the failing index and
    /// the replies collected before it when `on_error` returns
    /// [`BatchControl::Abort`], or [`SessionError::Channel`] if the channel
    /// lock is poisoned or the batch is started from within another batch's
    /// error callback.
    pub fn execute_batch<I, S, F>(
        &self,
        commands: I,
        mut on_error: F,
    ) -> Result<Vec<String>, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(CommandFailure<'_>) -> BatchControl,
    {
        let mut channel = self
            .lock()
            .map_err(|source| SessionError::channel("<batch>", source))?;
        let mut replies = Vec::new();

        for (index, item) in commands.into_iter().enumerate() {
            let command = item.as_ref();
            match send_logged(&mut **channel, command) {
                Ok(reply) => replies.push(strip_trailing_newline(reply)),
                Err(error) => {
                    let failure = CommandFailure {
                        index,
                        command,
                        error: &error,
                    };
                    match on_error(failure) {
                        BatchControl::Continue => {
                            warn!(
                                target: EXECUTOR_TARGET,
                                index,
                                command,
                                error = %error,
                                "batch command failed, continuing"
                            );
                            replies.push(String::new());
                        }
                        BatchControl::Abort => {
                            warn!(
                                target: EXECUTOR_TARGET,
                                index,
                                command,
                                error = %error,
                                completed = replies.len(),
                                "batch aborted"
                            );
                            return Err(SessionError::BatchAborted {
                                failed_index: index,
                                command: command.to_owned(),
                                completed: replies,
                                source: error,
                            });
                        }
                    }
                }
            }
        }

        Ok(replies)
    }

    /// Runs a batch that aborts on the first failure.
    ///
    /// # Errors
    ///
    /// See [`CommandExecutor::execute_batch`].
    pub fn execute_all<I, S>(&self, commands: I) -> Result<Vec<String>, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.execute_batch(commands, |_| BatchControl::Abort)
    }

    /// Sends one command and decodes its reply as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the channel fails and
    /// [`SessionError::Decode`] if the reply is not valid JSON for `T`.
    pub fn execute_json<T: DeserializeOwned>(&self, command: &str) -> Result<T, SessionError> {
        let reply = self.execute(command)?;
        serde_json::from_str(&reply)
            .map_err(|source| SessionError::Decode(DecodeError::json(command, source)))
    }

    fn lock(&self) -> Result<ChannelLease<'_>, ChannelError> {
        let current = thread::current().id();
        if *self.holder() == Some(current) {
            return Err(ChannelError::Reentrant);
        }
        let channel = self.channel.lock().map_err(|_| ChannelError::Poisoned)?;
        *self.holder() = Some(current);
        Ok(ChannelLease {
            channel,
            holder: &self.holder,
        })
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Locked channel that remembers which thread holds it.
struct ChannelLease<'a> {
    channel: MutexGuard<'a, Box<dyn CommandChannel>>,
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Deref for ChannelLease<'_> {
    type Target = Box<dyn CommandChannel>;

    fn deref(&self) -> &Self::Target {
        &self.channel
    }
}

impl DerefMut for ChannelLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.channel
    }
}

impl Drop for ChannelLease<'_> {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("CommandExecutor").finish_non_exhaustive()
    }
}

fn send_logged(channel: &mut dyn CommandChannel, command: &str) -> Result<String, ChannelError> {
    debug!(target: EXECUTOR_TARGET, command, "sending command");
    let reply = channel.send(command)?;
    debug!(
        target: EXECUTOR_TARGET,
        command,
        reply_bytes = reply.len(),
        "received reply"
    );
    Ok(reply)
}

fn strip_trailing_newline(mut reply: String) -> String {
    if reply.ends_with('\n') {
        reply.pop();
    }
    reply
}
