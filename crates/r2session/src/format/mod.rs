//! Declarative reply decoding.
//!
//! Each listing command is described by a [`FormatDescriptor`] naming the
//! command and how its reply is laid out. [`decode`] turns a raw reply into
//! an ordered list of [`PluginRecord`] values using only the descriptor, so
//! the same reply and descriptor always yield the same records.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::DecodeError;

/// Reply layout declared for a command.
#[derive(Debug, Clone)]
pub enum Encoding {
    /// A JSON array of objects.
    Json,
    /// One record per line, columns split by `delimiter` and zipped
    /// positionally against `fields`.
    DelimitedText {
        /// Column separator pattern.
        delimiter: Regex,
        /// Column names, in column order.
        fields: Vec<String>,
    },
    /// One record per line; the whole line is the value of `field`.
    PositionalText {
        /// Name receiving each line.
        field: String,
    },
}

/// How to obtain and decode one kind of listing.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    command: String,
    encoding: Encoding,
}

impl FormatDescriptor {
    /// Describes a command replying with a JSON array of objects.
    #[must_use]
    pub fn json(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            encoding: Encoding::Json,
        }
    }

    /// Describes a command replying with delimiter-separated columns.
    #[must_use]
    pub fn delimited(command: impl Into<String>, delimiter: Regex, fields: &[&str]) -> Self {
        Self {
            command: command.into(),
            encoding: Encoding::DelimitedText {
                delimiter,
                fields: fields.iter().map(|field| (*field).to_owned()).collect(),
            },
        }
    }

    /// Describes a command replying with one value per line.
    #[must_use]
    pub fn positional(command: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            encoding: Encoding::PositionalText {
                field: field.into(),
            },
        }
    }

    /// Listing command issued to the engine.
    #[must_use]
    pub fn command(&self) -> &str {
        self.command.as_str()
    }

    /// Declared reply encoding.
    #[must_use]
    pub const fn encoding(&self) -> &Encoding {
        &self.encoding
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text column or JSON string.
    Text(String),
    /// JSON boolean.
    Bool(bool),
    /// Any other JSON value (numbers, arrays, objects), kept verbatim.
    Json(Value),
}

impl FieldValue {
    /// Returns the text when this is a [`FieldValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Bool(_) | Self::Json(_) => None,
        }
    }

    /// Returns the flag when this is a [`FieldValue::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            Self::Text(_) | Self::Json(_) => None,
        }
    }
}

/// Ordered name/value record decoded from one listing entry.
///
/// Fields that were absent from the reply are simply not present; there is
/// no placeholder value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginRecord {
    fields: Vec<(String, FieldValue)>,
}

impl PluginRecord {
    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Looks up a text field by name.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Iterates fields in decode order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields that were set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }
}

impl FromIterator<(String, FieldValue)> for PluginRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Self::default();
        for (name, value) in iter {
            record.set(&name, value);
        }
        record
    }
}

/// Decodes `reply` according to `descriptor`.
///
/// Blank replies decode to an empty list under every encoding.
///
/// # Errors
///
/// Returns [`DecodeError`] when a JSON reply is malformed or is not an array
/// of objects. Text encodings never fail.
pub fn decode(
    reply: &str,
    descriptor: &FormatDescriptor,
) -> Result<Vec<PluginRecord>, DecodeError> {
    if reply.trim().is_empty() {
        return Ok(Vec::new());
    }

    match descriptor.encoding() {
        Encoding::Json => decode_json(reply, descriptor.command()),
        Encoding::DelimitedText { delimiter, fields } => Ok(reply_lines(reply)
            .map(|line| {
                fields
                    .iter()
                    .zip(delimiter.split(line))
                    .map(|(field, token)| (field.clone(), FieldValue::Text(token.to_owned())))
                    .collect::<PluginRecord>()
            })
            .collect()),
        Encoding::PositionalText { field } => Ok(reply_lines(reply)
            .map(|line| {
                std::iter::once((field.clone(), FieldValue::Text(line.to_owned())))
                    .collect::<PluginRecord>()
            })
            .collect()),
    }
}

/// Decodes a JSON array reply into typed values.
///
/// A blank reply is treated as an empty array.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] when the reply is not a JSON array of `T`.
pub fn decode_json_list<T: DeserializeOwned>(
    reply: &str,
    command: &str,
) -> Result<Vec<T>, DecodeError> {
    if reply.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(reply).map_err(|source| DecodeError::json(command, source))
}

fn decode_json(reply: &str, command: &str) -> Result<Vec<PluginRecord>, DecodeError> {
    let objects: Vec<Map<String, Value>> = decode_json_list(reply, command)?;
    Ok(objects.into_iter().map(record_from_object).collect())
}

fn record_from_object(object: Map<String, Value>) -> PluginRecord {
    object
        .into_iter()
        .filter_map(|(name, value)| {
            let field = match value {
                Value::Null => return None,
                Value::String(text) => FieldValue::Text(text),
                Value::Bool(flag) => FieldValue::Bool(flag),
                other => FieldValue::Json(other),
            };
            Some((name, field))
        })
        .collect()
}

/// Splits a reply into lines, dropping the empty line a terminating newline
/// would otherwise produce.
fn reply_lines(reply: &str) -> impl Iterator<Item = &str> {
    let body = reply.strip_suffix('\n').unwrap_or(reply);
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}
