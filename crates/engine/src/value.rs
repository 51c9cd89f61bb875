//! Bound runtime values and the scopes that hold them.
//!
//! A [`Value`] pairs a raw JSON datum with a sensitivity flag. The flag never changes the data
//! itself; it tells logging and persistence layers to redact the datum whenever it surfaces.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Marker printed in place of a sensitive datum.
pub const REDACTED: &str = "********";

/// Shared null used to pre-seed scope entries that have no binding yet.
pub(crate) static NULL_PLACEHOLDER: Value = Value {
    raw: JsonValue::Null,
    sensitive: false,
};

/// Ordered variable scope mapping names to bound values.
pub type Context = IndexMap<String, Value>;

/// A bound runtime datum plus its sensitivity flag.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    raw: JsonValue,
    #[serde(default)]
    sensitive: bool,
}

impl Value {
    /// Wraps an ordinary (non-secret) datum.
    pub fn new(raw: impl Into<JsonValue>) -> Self {
        Self {
            raw: raw.into(),
            sensitive: false,
        }
    }

    /// Wraps a secret datum.
    pub fn sensitive(raw: impl Into<JsonValue>) -> Self {
        Self {
            raw: raw.into(),
            sensitive: true,
        }
    }

    pub fn with_sensitivity(raw: impl Into<JsonValue>, sensitive: bool) -> Self {
        Self {
            raw: raw.into(),
            sensitive,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> &JsonValue {
        &self.raw
    }

    pub fn into_raw(self) -> JsonValue {
        self.raw
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// JSON form safe to log: the raw datum, or [`REDACTED`] for secrets.
    pub fn redacted(&self) -> JsonValue {
        if self.sensitive {
            JsonValue::String(REDACTED.to_string())
        } else {
            self.raw.clone()
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            return formatter.write_str(REDACTED);
        }
        match &self.raw {
            JsonValue::String(text) => formatter.write_str(text),
            JsonValue::Null => formatter.write_str("null"),
            other => write!(formatter, "{other}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Value")
            .field("raw", &self.redacted())
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

impl From<JsonValue> for Value {
    fn from(raw: JsonValue) -> Self {
        Self::new(raw)
    }
}
