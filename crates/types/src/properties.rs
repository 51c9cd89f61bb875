//! System properties: namespaced constants available to expressions during a run.
//!
//! Properties are loaded once by an external collaborator and stay read-only for the whole
//! execution. Names are dot-namespaced (`io.example.db.host`); the namespace and key are kept
//! apart so loaders can report where a property came from.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Separator between namespace segments and the key.
pub const NAMESPACE_SEPARATOR: char = '.';

static QUALIFIED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)*$").expect("valid qualified name pattern"));

/// Error surfaced when a property declaration is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("invalid system property name '{name}'")]
    InvalidName { name: String },
}

/// A single namespaced property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemProperty {
    /// Dot-separated namespace; empty for top-level properties.
    #[serde(default)]
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Raw property value.
    #[serde(default)]
    pub value: JsonValue,
    /// Secret properties are redacted wherever they surface.
    #[serde(default)]
    pub sensitive: bool,
}

impl SystemProperty {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    /// Builds a property from a fully qualified name, splitting on the last separator.
    pub fn from_qualified(qualified_name: &str, value: impl Into<JsonValue>) -> Result<Self, PropertyError> {
        validate_qualified_name(qualified_name)?;
        let (namespace, key) = match qualified_name.rsplit_once(NAMESPACE_SEPARATOR) {
            Some((namespace, key)) => (namespace, key),
            None => ("", qualified_name),
        };
        Ok(Self::new(namespace, key, value))
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// `namespace.key`, or just `key` when the namespace is empty.
    pub fn fully_qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.key.clone()
        } else {
            format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.key)
        }
    }

    /// Checks that the fully qualified name is well formed.
    pub fn validate(&self) -> Result<(), PropertyError> {
        validate_qualified_name(&self.fully_qualified_name())
    }
}

/// Validates a dot-namespaced property name.
pub fn validate_qualified_name(name: &str) -> Result<(), PropertyError> {
    if QUALIFIED_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PropertyError::InvalidName { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn qualified_name_joins_namespace_and_key() {
        let property = SystemProperty::new("io.example.db", "host", "db.local");
        assert_eq!(property.fully_qualified_name(), "io.example.db.host");

        let top_level = SystemProperty::new("", "region", "us");
        assert_eq!(top_level.fully_qualified_name(), "region");
    }

    #[test]
    fn from_qualified_splits_on_last_separator() {
        let property = SystemProperty::from_qualified("io.example.db.port", 5432).expect("valid name");
        assert_eq!(property.namespace, "io.example.db");
        assert_eq!(property.key, "port");
        assert_eq!(property.value, json!(5432));
    }

    #[test]
    fn malformed_names_are_rejected() {
        for name in ["", ".host", "io..host", "io.host.", "1io.host", "io host"] {
            assert_eq!(
                validate_qualified_name(name),
                Err(PropertyError::InvalidName { name: name.to_string() }),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_qualified_name("io.example-1.db_host").is_ok());
        assert!(SystemProperty::new("io", "", 1).validate().is_err());
    }
}
