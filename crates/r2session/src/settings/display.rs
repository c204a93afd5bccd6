//! Typed view of the disassembly display settings.

use crate::errors::SessionError;
use crate::executor::CommandExecutor;

/// Settings read by [`DisplaySettings::load`], in query order.
pub const DISPLAY_SETTING_KEYS: [&str; 9] = [
    "asm.arch",
    "asm.bits",
    "asm.bytes",
    "asm.flags",
    "asm.offset",
    "asm.lines",
    "asm.xrefs",
    "asm.cmtright",
    "asm.pseudo",
];

/// Disassembly display settings.
///
/// Boolean settings are `None` when the engine reported anything other than
/// `true` or `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Target architecture (`asm.arch`).
    pub arch: Option<String>,
    /// Register width (`asm.bits`).
    pub bits: Option<u32>,
    /// Show instruction bytes (`asm.bytes`).
    pub bytes: Option<bool>,
    /// Show flags (`asm.flags`).
    pub flags: Option<bool>,
    /// Show offsets (`asm.offset`).
    pub offset: Option<bool>,
    /// Show flow lines (`asm.lines`).
    pub lines: Option<bool>,
    /// Show cross references (`asm.xrefs`).
    pub xrefs: Option<bool>,
    /// Right-align comments (`asm.cmtright`).
    pub comments_right: Option<bool>,
    /// Show pseudo-code (`asm.pseudo`).
    pub pseudo: Option<bool>,
}

impl DisplaySettings {
    /// Queries every display setting in one batch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BatchAborted`] if any query fails.
    pub fn load(executor: &CommandExecutor) -> Result<Self, SessionError> {
        let commands = DISPLAY_SETTING_KEYS.map(|key| format!("e {key}"));
        let replies = executor.execute_all(&commands)?;
        Ok(Self::from_replies(&replies))
    }

    /// Builds the view from replies aligned with [`DISPLAY_SETTING_KEYS`].
    #[must_use]
    pub fn from_replies<S: AsRef<str>>(replies: &[S]) -> Self {
        let reply = |index: usize| replies.get(index).map(|value| value.as_ref().trim());
        let flag = |index: usize| reply(index).and_then(parse_bool);

        Self {
            arch: reply(0)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
            bits: reply(1).and_then(|value| value.parse().ok()),
            bytes: flag(2),
            flags: flag(3),
            offset: flag(4),
            lines: flag(5),
            xrefs: flag(6),
            comments_right: flag(7),
            pseudo: flag(8),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
