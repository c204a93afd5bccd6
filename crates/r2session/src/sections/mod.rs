//! Address classification against the loaded section table.

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{DecodeError, SessionError};
use crate::executor::CommandExecutor;

/// Log target for section operations.
const SECTIONS_TARGET: &str = "r2session::sections";

/// Lists sections as JSON.
pub const SECTION_LISTING_COMMAND: &str = "iSj";

/// One loaded section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// First address covered by the section.
    pub start: u64,
    /// Length in bytes.
    pub size: u64,
    /// Permission string such as `r-x`.
    pub permissions: String,
    /// Section name, when the engine reports one.
    pub name: Option<String>,
}

impl Section {
    /// Returns `true` when `address` lies in `[start, start + size)`.
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.size
    }

    /// Returns `true` when the permissions include execute.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.permissions.contains('x')
    }
}

/// Classification of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Inside an executable section.
    Instruction,
    /// Inside a non-executable section.
    Memory,
    /// Outside every known section.
    Unknown,
}

impl AddressKind {
    /// Lowercase label: `instruction`, `memory` or `unknown`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instruction => "instruction",
            Self::Memory => "memory",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Ordered section table with first-match classification.
#[derive(Debug, Clone, Default)]
pub struct SectionClassifier {
    sections: Vec<Section>,
}

impl SectionClassifier {
    /// Builds a classifier over sections in listing order.
    #[must_use]
    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Re-reads the section table and replaces it wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] or [`SessionError::Decode`]; the
    /// previous table is kept in both cases.
    pub fn reload(&mut self, executor: &CommandExecutor) -> Result<(), SessionError> {
        let reply = executor.execute(SECTION_LISTING_COMMAND)?;
        let sections = parse_sections(&reply)?;
        debug!(
            target: SECTIONS_TARGET,
            sections = sections.len(),
            "section table reloaded"
        );
        self.sections = sections;
        Ok(())
    }

    /// Classifies `address` by the first section containing it.
    ///
    /// Overlapping sections are not merged: the earliest listed section wins.
    #[must_use]
    pub fn classify(&self, address: u64) -> AddressKind {
        match self.sections.iter().find(|section| section.contains(address)) {
            Some(section) if section.is_executable() => AddressKind::Instruction,
            Some(_) => AddressKind::Memory,
            None => AddressKind::Unknown,
        }
    }

    /// Sections in listing order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectionListing {
    Flat(Vec<RawSection>),
    Wrapped { sections: Vec<RawSection> },
}

#[derive(Debug, Deserialize)]
struct RawSection {
    vaddr: Option<u64>,
    addr: Option<u64>,
    vsize: Option<u64>,
    size: Option<u64>,
    perm: Option<String>,
    flags: Option<String>,
    name: Option<String>,
}

/// Parses a section listing, accepting either a bare array or an object
/// with a `sections` array. A blank reply is an empty table.
pub(crate) fn parse_sections(reply: &str) -> Result<Vec<Section>, DecodeError> {
    if reply.trim().is_empty() {
        return Ok(Vec::new());
    }

    let listing: SectionListing = serde_json::from_str(reply)
        .map_err(|source| DecodeError::json(SECTION_LISTING_COMMAND, source))?;
    let raw = match listing {
        SectionListing::Flat(sections) | SectionListing::Wrapped { sections } => sections,
    };

    raw.into_iter()
        .enumerate()
        .map(|(position, section)| {
            let start = section.vaddr.or(section.addr).ok_or_else(|| {
                DecodeError::shape(
                    SECTION_LISTING_COMMAND,
                    format!("section {position} has no start address"),
                )
            })?;
            Ok(Section {
                start,
                size: section.vsize.or(section.size).unwrap_or(0),
                permissions: section.perm.or(section.flags).unwrap_or_default(),
                name: section.name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests;
