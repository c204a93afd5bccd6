//! Capture and restore of engine settings.
//!
//! A [`SettingsSnapshot`] records every setting under a key prefix from the
//! engine's bulk dump and can later reissue them as assignments. Restoring
//! consumes the snapshot, so each capture is replayed at most once.

mod display;

use tracing::debug;

use crate::errors::SessionError;
use crate::executor::CommandExecutor;

pub use display::{DISPLAY_SETTING_KEYS, DisplaySettings};

/// Log target for settings operations.
const SETTINGS_TARGET: &str = "r2session::settings";

/// Dumps every setting as `key = value` lines.
pub const SETTINGS_DUMP_COMMAND: &str = "e";

/// Key/value settings captured under a prefix, in dump order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot {
    prefix: String,
    entries: Vec<(String, String)>,
}

impl SettingsSnapshot {
    /// Dumps the engine's settings and keeps those whose key starts with
    /// `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the dump command fails.
    pub fn capture(executor: &CommandExecutor, prefix: &str) -> Result<Self, SessionError> {
        let dump = executor.execute(SETTINGS_DUMP_COMMAND)?;
        let snapshot = Self::parse(&dump, prefix);
        debug!(
            target: SETTINGS_TARGET,
            prefix,
            settings = snapshot.len(),
            "settings captured"
        );
        Ok(snapshot)
    }

    /// Parses a settings dump.
    ///
    /// Only lines made of exactly three space-separated fields with `=` in
    /// the middle are considered. Later duplicates of a key replace the
    /// earlier value in place.
    #[must_use]
    pub fn parse(dump: &str, prefix: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for line in dump.lines() {
            let fields: Vec<&str> = line.trim_end_matches('\r').split(' ').collect();
            let [raw_key, "=", raw_value] = fields.as_slice() else {
                continue;
            };
            let key = raw_key.trim();
            if !key.starts_with(prefix) {
                continue;
            }
            let value = raw_value.trim().to_owned();
            match entries.iter_mut().find(|(existing, _)| existing == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key.to_owned(), value)),
            }
        }
        Self {
            prefix: prefix.to_owned(),
            entries,
        }
    }

    /// Reissues every captured setting as one batch, in captured order.
    ///
    /// An empty snapshot sends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BatchAborted`] identifying the first
    /// assignment that failed.
    pub fn restore(self, executor: &CommandExecutor) -> Result<(), SessionError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let commands = self.restore_commands();
        executor.execute_all(&commands)?;
        debug!(
            target: SETTINGS_TARGET,
            prefix = self.prefix.as_str(),
            settings = commands.len(),
            "settings restored"
        );
        Ok(())
    }

    /// Assignment commands [`SettingsSnapshot::restore`] would send.
    #[must_use]
    pub fn restore_commands(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(key, value)| format!("e {key}={value}"))
            .collect()
    }

    /// Prefix the snapshot was captured with.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Captured value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates captured settings in dump order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of captured settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing matched the prefix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests;
