//! Address-keyed index of named flags.
//!
//! Flags are grouped under their [`CanonicalAddress`]. Several flags may
//! share an address; they are kept in arrival order. The index is rebuilt
//! wholesale from the engine's flag listing and never patched in place.

mod address;

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::errors::SessionError;
use crate::executor::CommandExecutor;
use crate::format::decode_json_list;

pub use address::{AddressParseError, CanonicalAddress, canonicalize};

/// Log target for flag index operations.
const FLAGS_TARGET: &str = "r2session::flags";

/// Selects every flag space, then lists flags as JSON.
pub const FLAG_LISTING_COMMAND: &str = "fs *;fj";

/// Lists flags in the current flag space as JSON.
pub const FLAG_SPACE_LISTING_COMMAND: &str = "fj";

/// One flag as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlagRecord {
    /// Flag name.
    pub name: String,
    /// Numeric offset of the flag.
    #[serde(alias = "addr")]
    pub offset: u64,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// A flag stored under its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagEntry {
    /// Flag name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Multimap from canonical address to the flags bound there.
#[derive(Debug, Clone, Default)]
pub struct FlagIndex {
    entries: BTreeMap<CanonicalAddress, Vec<FlagEntry>>,
}

impl FlagIndex {
    /// Builds an index from flag records, preserving their order per address.
    #[must_use]
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FlagRecord>,
    {
        let mut entries: BTreeMap<CanonicalAddress, Vec<FlagEntry>> = BTreeMap::new();
        for record in records {
            entries
                .entry(CanonicalAddress::new(record.offset))
                .or_default()
                .push(FlagEntry {
                    name: record.name,
                    size: record.size,
                });
        }
        Self { entries }
    }

    /// Re-reads every flag from the engine and replaces the index.
    ///
    /// The previous index is kept if the listing cannot be fetched or
    /// decoded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`].
    pub fn rebuild(&mut self, executor: &CommandExecutor) -> Result<(), SessionError> {
        let reply = executor.execute(FLAG_LISTING_COMMAND)?;
        let records: Vec<FlagRecord> = decode_json_list(&reply, FLAG_LISTING_COMMAND)?;
        let rebuilt = Self::from_records(records);

        debug!(
            target: FLAGS_TARGET,
            addresses = rebuilt.len(),
            flags = rebuilt.flag_count(),
            "flag index rebuilt"
        );

        *self = rebuilt;
        Ok(())
    }

    /// Names of the flags at `address`, in arrival order.
    #[must_use]
    pub fn lookup_by_address(&self, address: &CanonicalAddress) -> Vec<&str> {
        self.entries_at(address)
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Flag entries at `address`; empty if there are none.
    #[must_use]
    pub fn entries_at(&self, address: &CanonicalAddress) -> &[FlagEntry] {
        self.entries
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First address, in ascending order, holding a flag called `name`.
    #[must_use]
    pub fn lookup_address_by_name(&self, name: &str) -> Option<CanonicalAddress> {
        self.entries
            .iter()
            .find(|(_, flags)| flags.iter().any(|entry| entry.name == name))
            .map(|(address, _)| *address)
    }

    /// Iterates addresses in ascending order with their flags.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalAddress, &[FlagEntry])> {
        self.entries
            .iter()
            .map(|(address, flags)| (*address, flags.as_slice()))
    }

    /// Number of distinct addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of flags across all addresses.
    #[must_use]
    pub fn flag_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns `true` when no flags are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
