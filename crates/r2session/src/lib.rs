//! Command dispatch and reply normalisation for radare2 sessions.
//!
//! `r2session` drives a reverse-engineering engine over a textual
//! command/reply channel and turns its replies into typed, queryable state.
//!
//! # Architecture
//!
//! Every command goes through one [`CommandExecutor`], which owns the
//! [`CommandChannel`] behind a lock so a session never has two commands in
//! flight. Replies are decoded by the table-driven [`format`] module and
//! cached by the derived indexes:
//!
//! - [`PluginCatalog`]: plugin listings per category, described by a
//!   [`CategoryRegistry`] of [`FormatDescriptor`] values.
//! - [`FlagIndex`]: flags keyed by [`CanonicalAddress`].
//! - [`SectionClassifier`]: first-match classification of addresses.
//! - [`SettingsSnapshot`]: capture and replay of prefixed settings.
//!
//! Each cache is rebuilt wholesale on refresh and left untouched when the
//! refresh fails. [`Session`] bundles all of them over one channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use r2session::Session;
//! use r2session_config::Config;
//!
//! # fn main() -> Result<(), r2session::SessionError> {
//! let mut session = Session::open(&Config::default(), Path::new("/bin/ls"))?;
//! session.rebuild_flags()?;
//! session.reload_sections()?;
//! if let Some(entry) = session.flag_address("entry0") {
//!     println!("entry0 is {}", session.classify(entry.value()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod channel;
pub mod errors;
pub mod executor;
pub mod flags;
pub mod format;
pub mod sections;
pub mod session;
pub mod settings;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::catalog::{CategoryRegistry, PluginCatalog, PluginCategory};
pub use self::channel::{ChannelError, CommandChannel, ProcessChannel};
pub use self::errors::{DecodeError, SessionError};
pub use self::executor::{BatchControl, CommandExecutor, CommandFailure};
pub use self::flags::{CanonicalAddress, FlagEntry, FlagIndex, canonicalize};
pub use self::format::{Encoding, FieldValue, FormatDescriptor, PluginRecord, decode};
pub use self::sections::{AddressKind, Section, SectionClassifier};
pub use self::session::Session;
pub use self::settings::{DisplaySettings, SettingsSnapshot};
