//! Plugin catalog keyed by plugin category.
//!
//! The [`CategoryRegistry`] is the declarative table mapping each category
//! label to the [`FormatDescriptor`] of its listing command. It is built
//! once and never mutated; [`CategoryRegistry::builtin`] returns the shared
//! table of categories the engine ships with. The [`PluginCatalog`] caches
//! the decoded listing per category and replaces a category's entry only
//! after a refresh has fully succeeded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::SessionError;
use crate::executor::CommandExecutor;
use crate::format::{FormatDescriptor, PluginRecord, decode};

/// Log target for catalog operations.
const CATALOG_TARGET: &str = "r2session::catalog";

#[expect(
    clippy::expect_used,
    reason = "the literal pattern is exercised by the catalog tests"
)]
static COLUMN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\s+").expect("column separator pattern is valid"));

static BUILTIN: Lazy<Arc<CategoryRegistry>> = Lazy::new(|| Arc::new(builtin_registry()));

/// Plugin categories the engine can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCategory {
    /// Analysis plugins (`La`).
    Analysis,
    /// Core plugins (`Lcj`).
    Core,
    /// Debugger backends (`Ldj`).
    Debug,
    /// Supported decompilers (`LD`).
    Decompiler,
    /// ESIL plugins (`Le`).
    Esil,
    /// Shellcode encoders (`Lg`).
    Egg,
    /// Hash algorithms (`Lh`).
    Hash,
    /// Binary format loaders (`Li`).
    Bin,
    /// Colour themes (`Lt`).
    Color,
    /// Scripting language bridges (`Ll`).
    Language,
    /// Filesystem plugins (`Lm`).
    FileSystem,
    /// I/O backends (`Lo`).
    Io,
    /// Pseudo-code parsers (`Lp`).
    Parser,
}

impl PluginCategory {
    /// Every built-in category, in listing order.
    pub const ALL: [Self; 13] = [
        Self::Analysis,
        Self::Core,
        Self::Debug,
        Self::Decompiler,
        Self::Esil,
        Self::Egg,
        Self::Hash,
        Self::Bin,
        Self::Color,
        Self::Language,
        Self::FileSystem,
        Self::Io,
        Self::Parser,
    ];

    /// Registry label for the category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Analysis => "anal",
            Self::Core => "core",
            Self::Debug => "debug",
            Self::Decompiler => "dec",
            Self::Esil => "esil",
            Self::Egg => "egg",
            Self::Hash => "hash",
            Self::Bin => "bin",
            Self::Color => "color",
            Self::Language => "language",
            Self::FileSystem => "fd",
            Self::Io => "io",
            Self::Parser => "parser",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

impl AsRef<str> for PluginCategory {
    fn as_ref(&self) -> &str {
        self.label()
    }
}

/// Immutable category → descriptor table.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    descriptors: HashMap<String, FormatDescriptor>,
}

impl CategoryRegistry {
    /// Starts an empty registry builder.
    #[must_use]
    pub fn builder() -> CategoryRegistryBuilder {
        CategoryRegistryBuilder::default()
    }

    /// Shared table of the engine's built-in categories.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Looks up the descriptor for a category label.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<&FormatDescriptor> {
        self.descriptors.get(category)
    }

    /// Registered labels, sorted.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Number of registered categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Assembles a [`CategoryRegistry`].
#[derive(Debug, Default)]
pub struct CategoryRegistryBuilder {
    descriptors: HashMap<String, FormatDescriptor>,
}

impl CategoryRegistryBuilder {
    /// Adds or replaces a category.
    #[must_use]
    pub fn register(mut self, category: impl Into<String>, descriptor: FormatDescriptor) -> Self {
        self.descriptors.insert(category.into(), descriptor);
        self
    }

    /// Adds a category whose columns are separated by runs of two or more
    /// whitespace characters.
    #[must_use]
    pub fn register_columns(
        self,
        category: impl Into<String>,
        command: &str,
        fields: &[&str],
    ) -> Self {
        let descriptor = FormatDescriptor::delimited(command, COLUMN_SEPARATOR.clone(), fields);
        self.register(category, descriptor)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> CategoryRegistry {
        CategoryRegistry {
            descriptors: self.descriptors,
        }
    }
}

fn builtin_registry() -> CategoryRegistry {
    use PluginCategory as C;

    CategoryRegistry::builder()
        .register_columns(
            C::Analysis.label(),
            "La",
            &["status", "addrSizes", "name", "licence", "descr"],
        )
        .register(C::Core.label(), FormatDescriptor::json("Lcj"))
        .register(C::Debug.label(), FormatDescriptor::json("Ldj"))
        .register(C::Decompiler.label(), FormatDescriptor::positional("LD", "descr"))
        .register(C::Esil.label(), FormatDescriptor::positional("Le", "descr"))
        .register_columns(C::Egg.label(), "Lg", &["name", "descr"])
        .register(C::Hash.label(), FormatDescriptor::positional("Lh", "name"))
        .register_columns(
            C::Bin.label(),
            "Li",
            &["kind", "name", "descr", "licence", "author"],
        )
        .register_columns(C::Color.label(), "Lt", &["selected", "name"])
        .register_columns(C::Language.label(), "Ll", &["name", "licence", "descr"])
        .register_columns(C::FileSystem.label(), "Lm", &["name", "descr"])
        .register_columns(C::Io.label(), "Lo", &["perm", "name", "licence", "descr"])
        .register(C::Parser.label(), FormatDescriptor::positional("Lp", "name"))
        .build()
}

/// Per-category cache of decoded plugin listings.
#[derive(Debug, Clone)]
pub struct PluginCatalog {
    registry: Arc<CategoryRegistry>,
    plugins: HashMap<String, Vec<PluginRecord>>,
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new(CategoryRegistry::builtin())
    }
}

impl PluginCatalog {
    /// Creates an empty catalog over `registry`.
    #[must_use]
    pub fn new(registry: Arc<CategoryRegistry>) -> Self {
        Self {
            registry,
            plugins: HashMap::new(),
        }
    }

    /// Registry consulted by [`PluginCatalog::refresh`].
    #[must_use]
    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Issues the category's listing command and replaces its cached records.
    ///
    /// The cache entry is only replaced once the reply has been decoded, so a
    /// failed refresh leaves the previous records in place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownCategory`] before sending anything when
    /// the category is not registered, [`SessionError::Channel`] if the
    /// command fails, or [`SessionError::Decode`] if the reply is malformed.
    pub fn refresh(
        &mut self,
        executor: &CommandExecutor,
        category: &str,
    ) -> Result<&[PluginRecord], SessionError> {
        let descriptor = self
            .registry
            .get(category)
            .ok_or_else(|| SessionError::unknown_category(category))?;

        let reply = executor.execute(descriptor.command())?;
        let records = decode(&reply, descriptor)?;

        debug!(
            target: CATALOG_TARGET,
            category,
            command = descriptor.command(),
            records = records.len(),
            "plugin listing refreshed"
        );

        let slot = self.plugins.entry(category.to_owned()).or_default();
        *slot = records;
        Ok(slot.as_slice())
    }

    /// Cached records for a category; empty if it was never refreshed.
    #[must_use]
    pub fn list_cached(&self, category: &str) -> &[PluginRecord] {
        self.plugins
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` once the category has been refreshed successfully.
    #[must_use]
    pub fn is_loaded(&self, category: &str) -> bool {
        self.plugins.contains_key(category)
    }
}
