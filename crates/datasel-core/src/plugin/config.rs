//! Helpers for pipe-delimited plugin configuration strings.

use crate::plugin::PluginId;
use thiserror::Error as ThisError;

const SEPARATOR: char = '|';

///
/// ConfigFormatError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid configuration for plugin '{plugin}': {reason}")]
pub struct ConfigFormatError {
    pub plugin: PluginId,
    pub reason: ConfigFormatReason,
}

impl ConfigFormatError {
    #[must_use]
    pub const fn new(plugin: PluginId, reason: ConfigFormatReason) -> Self {
        Self { plugin, reason }
    }
}

///
/// ConfigFormatReason
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigFormatReason {
    #[error("expected at most {max} fields, found {found}")]
    TooManyFields { found: usize, max: usize },

    #[error("field {index} is out of range: {value}")]
    OutOfRange { index: usize, value: String },
}

/// Split a configuration string into at most `max` trimmed fields.
///
/// The empty string yields a single empty field.
pub fn split_fields(
    plugin: PluginId,
    raw: &str,
    max: usize,
) -> Result<Vec<&str>, ConfigFormatError> {
    let fields: Vec<&str> = raw.split(SEPARATOR).map(str::trim).collect();
    if fields.len() > max {
        return Err(ConfigFormatError::new(
            plugin,
            ConfigFormatReason::TooManyFields {
                found: fields.len(),
                max,
            },
        ));
    }

    Ok(fields)
}

/// Integer at `index`; missing, empty, or non-numeric fields read as `None`.
#[must_use]
pub fn optional_int(fields: &[&str], index: usize) -> Option<i64> {
    fields.get(index).and_then(|field| field.parse().ok())
}

/// Non-negative count at `index`.
///
/// Missing, empty, or non-numeric fields read as `default`; only a parsed
/// negative count is rejected.
pub fn count_or_default(
    plugin: PluginId,
    fields: &[&str],
    index: usize,
    default: u32,
) -> Result<u32, ConfigFormatError> {
    let Some(value) = optional_int(fields, index) else {
        return Ok(default);
    };

    u32::try_from(value).map_err(|_| {
        ConfigFormatError::new(
            plugin,
            ConfigFormatReason::OutOfRange {
                index,
                value: value.to_string(),
            },
        )
    })
}

/// Join serialized fields with the configuration separator.
#[must_use]
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(field.as_ref());
    }

    out
}
