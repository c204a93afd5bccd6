//! High-level session over one engine.
//!
//! [`Session`] pairs a [`CommandExecutor`] with the caches derived from its
//! replies: the plugin catalog, the flag index and the section table. It
//! also holds at most one pending settings snapshot and wraps the engine
//! commands clients use most.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use r2session_config::{Config, DEFAULT_SETTINGS_PREFIX};

use crate::catalog::PluginCatalog;
use crate::channel::{CommandChannel, ProcessChannel};
use crate::errors::SessionError;
use crate::executor::CommandExecutor;
use crate::flags::{CanonicalAddress, FLAG_SPACE_LISTING_COMMAND, FlagIndex, FlagRecord};
use crate::format::{PluginRecord, decode_json_list};
use crate::sections::{AddressKind, Section, SectionClassifier};
use crate::settings::{DisplaySettings, SettingsSnapshot};

/// Log target for session operations.
const SESSION_TARGET: &str = "r2session::session";

/// One engine session and the state derived from it.
#[derive(Debug)]
pub struct Session {
    executor: CommandExecutor,
    catalog: PluginCatalog,
    flags: FlagIndex,
    sections: SectionClassifier,
    pending_settings: Option<SettingsSnapshot>,
    settings_prefix: String,
}

impl Session {
    /// Launches the configured engine on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Open`] when the engine cannot be started or
    /// exits before it is ready.
    pub fn open(config: &Config, target: &Path) -> Result<Self, SessionError> {
        let channel =
            ProcessChannel::spawn(config, target).map_err(|source| SessionError::Open {
                target: target.to_path_buf(),
                source,
            })?;
        debug!(
            target: SESSION_TARGET,
            program = %channel.program().display(),
            target_path = %target.display(),
            "session opened"
        );
        Ok(Self::with_channel(channel).with_settings_prefix(config.settings_prefix()))
    }

    /// Builds a session over an existing channel.
    #[must_use]
    pub fn with_channel(channel: impl CommandChannel + 'static) -> Self {
        Self {
            executor: CommandExecutor::new(channel),
            catalog: PluginCatalog::default(),
            flags: FlagIndex::default(),
            sections: SectionClassifier::default(),
            pending_settings: None,
            settings_prefix: DEFAULT_SETTINGS_PREFIX.to_owned(),
        }
    }

    /// Replaces the prefix used by [`Session::store_default_settings`].
    #[must_use]
    pub fn with_settings_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings_prefix = prefix.into();
        self
    }

    /// Replaces the plugin catalog, e.g. to use a custom registry.
    #[must_use]
    pub fn with_catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Executor shared by every operation on this session.
    #[must_use]
    pub const fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Sends a raw command.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the channel fails.
    pub fn execute(&self, command: &str) -> Result<String, SessionError> {
        self.executor.execute(command)
    }

    // Plugins

    /// Reloads one plugin category.
    ///
    /// # Errors
    ///
    /// See [`PluginCatalog::refresh`].
    pub fn refresh_plugins(&mut self, category: &str) -> Result<&[PluginRecord], SessionError> {
        self.catalog.refresh(&self.executor, category)
    }

    /// Cached plugins for a category.
    #[must_use]
    pub fn plugins(&self, category: &str) -> &[PluginRecord] {
        self.catalog.list_cached(category)
    }

    /// The plugin catalog.
    #[must_use]
    pub const fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    // Flags

    /// Rebuilds the flag index from every flag space.
    ///
    /// # Errors
    ///
    /// See [`FlagIndex::rebuild`].
    pub fn rebuild_flags(&mut self) -> Result<&FlagIndex, SessionError> {
        self.flags.rebuild(&self.executor)?;
        Ok(&self.flags)
    }

    /// The flag index as of the last rebuild.
    #[must_use]
    pub const fn flags(&self) -> &FlagIndex {
        &self.flags
    }

    /// Flag names at an address given as hexadecimal text.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidAddress`] if `address` is not
    /// hexadecimal.
    pub fn flag_names_at(&self, address: &str) -> Result<Vec<&str>, SessionError> {
        let canonical: CanonicalAddress = address.parse()?;
        Ok(self.flags.lookup_by_address(&canonical))
    }

    /// Address of the first flag called `name`.
    #[must_use]
    pub fn flag_address(&self, name: &str) -> Option<CanonicalAddress> {
        self.flags.lookup_address_by_name(name)
    }

    /// Selects the engine's active flag space.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn set_flag_space(&self, namespace: &str) -> Result<(), SessionError> {
        self.executor.execute(&format!("fs {namespace}"))?;
        Ok(())
    }

    /// Lists the flags of the active flag space without touching the index.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn list_flags(&self) -> Result<Vec<FlagRecord>, SessionError> {
        self.json_list(FLAG_SPACE_LISTING_COMMAND)
    }

    // Sections

    /// Reloads the section table.
    ///
    /// # Errors
    ///
    /// See [`SectionClassifier::reload`].
    pub fn reload_sections(&mut self) -> Result<&[Section], SessionError> {
        self.sections.reload(&self.executor)?;
        Ok(self.sections.sections())
    }

    /// Classifies an address against the loaded sections.
    #[must_use]
    pub fn classify(&self, address: u64) -> AddressKind {
        self.sections.classify(address)
    }

    /// The loaded section table.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        self.sections.sections()
    }

    // Settings

    /// Captures settings under `prefix` and holds them for
    /// [`Session::restore_settings`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SnapshotPending`] if a snapshot is already
    /// held, or [`SessionError::Channel`] if the dump fails.
    pub fn store_settings(&mut self, prefix: &str) -> Result<&SettingsSnapshot, SessionError> {
        if self.pending_settings.is_some() {
            return Err(SessionError::SnapshotPending);
        }
        let snapshot = SettingsSnapshot::capture(&self.executor, prefix)?;
        Ok(self.pending_settings.insert(snapshot))
    }

    /// Captures settings under the session's configured prefix.
    ///
    /// # Errors
    ///
    /// See [`Session::store_settings`].
    pub fn store_default_settings(&mut self) -> Result<&SettingsSnapshot, SessionError> {
        let prefix = self.settings_prefix.clone();
        self.store_settings(&prefix)
    }

    /// Reapplies and releases the held snapshot; does nothing if none is held.
    ///
    /// The snapshot is released even when an assignment fails.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BatchAborted`] naming the failed assignment.
    pub fn restore_settings(&mut self) -> Result<(), SessionError> {
        match self.pending_settings.take() {
            Some(snapshot) => snapshot.restore(&self.executor),
            None => Ok(()),
        }
    }

    /// Returns `true` while a snapshot is held.
    #[must_use]
    pub const fn has_pending_settings(&self) -> bool {
        self.pending_settings.is_some()
    }

    /// Prefix used by [`Session::store_default_settings`].
    #[must_use]
    pub fn settings_prefix(&self) -> &str {
        &self.settings_prefix
    }

    /// Reads the disassembly display settings.
    ///
    /// # Errors
    ///
    /// See [`DisplaySettings::load`].
    pub fn display_settings(&self) -> Result<DisplaySettings, SessionError> {
        DisplaySettings::load(&self.executor)
    }

    /// Reads one setting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn config_get(&self, key: &str) -> Result<String, SessionError> {
        let reply = self.executor.execute(&format!("e {key}"))?;
        Ok(reply.trim().to_owned())
    }

    /// Assigns one setting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn config_set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.executor.execute(&format!("e {key}={value}"))?;
        Ok(())
    }

    /// Turns off UTF-8 box drawing in textual output.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn disable_utf8(&self) -> Result<(), SessionError> {
        self.config_set("scr.utf8", "false")
    }

    // Engine commands

    /// Returns `true` when the engine answers a block-size query.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn alive(&self) -> Result<bool, SessionError> {
        let reply = self.executor.execute("b")?;
        Ok(!reply.trim().is_empty())
    }

    /// Runs the engine's basic analysis pass.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn analyze_all(&self) -> Result<(), SessionError> {
        self.executor.execute("aa")?;
        Ok(())
    }

    /// Analyses the instruction at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn analyze_op(&self, address: u64) -> Result<Option<Value>, SessionError> {
        let ops: Vec<Value> = self.json_list(&format!("aoj 1 @ {address:#x}"))?;
        Ok(ops.into_iter().next())
    }

    /// Assembles one instruction, returning its bytes as hex text.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn assemble(&self, opcode: &str, offset: Option<u64>) -> Result<String, SessionError> {
        let command = format!("\"pa {opcode}\"{}", at(offset));
        let reply = self.executor.execute(&command)?;
        Ok(reply.trim().to_owned())
    }

    /// Disassembles hex-encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn disassemble_bytes(
        &self,
        hex: &str,
        offset: Option<u64>,
    ) -> Result<String, SessionError> {
        let reply = self.executor.execute(&format!("pad {hex}{}", at(offset)))?;
        Ok(reply.trim_end().to_owned())
    }

    /// Hex dump of `length` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn hexdump(&self, offset: u64, length: u64) -> Result<String, SessionError> {
        self.executor.execute(&format!("px {length}@{offset:#x}"))
    }

    /// Textual disassembly of `length` instructions at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] if the command fails.
    pub fn disassembly_text(&self, offset: u64, length: u64) -> Result<String, SessionError> {
        self.executor.execute(&format!("pD {length}@{offset:#x}"))
    }

    /// Decoded instructions covering `count` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn opcodes(&self, offset: u64, count: u64) -> Result<Vec<Value>, SessionError> {
        self.json_list(&format!("pdj @{offset:#x}!{count}"))
    }

    /// Instructions before and after `offset`, in address order.
    ///
    /// Both listings are fetched in one batch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BatchAborted`] if either listing fails, or
    /// [`SessionError::Decode`] if a reply is malformed.
    pub fn disassembly_around(
        &self,
        offset: u64,
        before: u64,
        after: u64,
    ) -> Result<Vec<Value>, SessionError> {
        let commands = [
            format!("pdj -{before}@{offset:#x}"),
            format!("pdj {after}@{offset:#x}"),
        ];
        let replies = self.executor.execute_all(&commands)?;

        let mut instructions = Vec::new();
        for (command, reply) in commands.iter().zip(&replies) {
            instructions.extend(decode_json_list::<Value>(reply, command)?);
        }
        Ok(instructions)
    }

    /// Raw bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bytes(&self, offset: u64, count: u64) -> Result<Vec<u8>, SessionError> {
        self.json_list(&format!("pcj @{offset:#x}!{count}"))
    }

    /// Binary information (`ij`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bin_info(&self) -> Result<Value, SessionError> {
        self.executor.execute_json("ij")
    }

    /// Relocations.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bin_relocs(&self) -> Result<Vec<Value>, SessionError> {
        self.json_list("irj")
    }

    /// Imports.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bin_imports(&self) -> Result<Vec<Value>, SessionError> {
        self.json_list("iij")
    }

    /// Symbols.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bin_symbols(&self) -> Result<Vec<Value>, SessionError> {
        self.json_list("isj")
    }

    /// Sections as reported by the engine, without updating the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn bin_sections(&self) -> Result<Vec<Value>, SessionError> {
        self.json_list("iSj")
    }

    fn json_list<T: serde::de::DeserializeOwned>(
        &self,
        command: &str,
    ) -> Result<Vec<T>, SessionError> {
        let reply = self.executor.execute(command)?;
        Ok(decode_json_list(&reply, command)?)
    }
}

fn at(offset: Option<u64>) -> String {
    offset.map_or_else(String::new, |value| format!("@{value:#x}"))
}

#[cfg(test)]
mod tests;
