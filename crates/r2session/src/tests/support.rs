//! Scripted command channel shared by unit and behaviour tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::channel::{ChannelError, CommandChannel};

#[derive(Default)]
struct ScriptState {
    replies: HashMap<String, Result<String, ChannelError>>,
    sent: Vec<String>,
}

/// Channel double answering from a command→reply script.
///
/// Unscripted commands receive an empty reply, mirroring the engine's
/// behaviour for assignments. Clones share the same script and log, so a
/// test can keep one clone as a handle after moving another into a session.
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    shared: Arc<Mutex<ScriptState>>,
}

impl ScriptedChannel {
    /// Creates a channel with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful reply.
    pub fn reply(self, command: &str, reply: &str) -> Self {
        self.state()
            .replies
            .insert(command.to_owned(), Ok(reply.to_owned()));
        self
    }

    /// Scripts a failure.
    pub fn fail(self, command: &str) -> Self {
        self.state().replies.insert(
            command.to_owned(),
            Err(ChannelError::other(format!("scripted failure for {command}"))),
        );
        self
    }

    /// Commands received so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.shared
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl CommandChannel for ScriptedChannel {
    fn send(&mut self, command: &str) -> Result<String, ChannelError> {
        let mut state = self.state();
        state.sent.push(command.to_owned());
        state
            .replies
            .get(command)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
