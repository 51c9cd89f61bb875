//! Read-only lookup over the system properties loaded for a run.

use indexmap::IndexMap;
use strata_types::{PropertyError, SystemProperty};
use tracing::warn;

use crate::value::Value;

/// Immutable map from fully qualified property name to value.
///
/// Expressions reach these entries only through the explicit `get_sp(...)` lookup, never as bare
/// identifiers, so property names cannot shadow or be shadowed by user variables.
#[derive(Debug, Clone, Default)]
pub struct SystemPropertyStore {
    entries: IndexMap<String, Value>,
}

impl SystemPropertyStore {
    /// Builds the store, rejecting malformed names. Later duplicates replace earlier ones.
    pub fn new(properties: &[SystemProperty]) -> Result<Self, PropertyError> {
        let mut entries = IndexMap::with_capacity(properties.len());
        for property in properties {
            property.validate()?;
            let name = property.fully_qualified_name();
            let value = Value::with_sensitivity(property.value.clone(), property.sensitive);
            if entries.insert(name.clone(), value).is_some() {
                warn!(property = %name, "duplicate system property; keeping the last definition");
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Value> {
        self.entries.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.entries.contains_key(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}
