//! Model state dictionary.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single model error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelError {
    /// Error message
    pub error_message: String,
}

/// Validation state of one model key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelStateEntry {
    /// Raw value bound to the key, when known
    pub attempted_value: Option<String>,
    /// Errors recorded for the key
    pub errors: Vec<ModelError>,
}

/// Model binding and validation state of an action invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelStateDictionary {
    entries: BTreeMap<String, ModelStateEntry>,
}

impl ModelStateDictionary {
    /// Empty, valid model state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a key
    pub fn add_model_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.entries
            .entry(key.into())
            .or_default()
            .errors
            .push(ModelError {
                error_message: message.into(),
            });
    }

    /// Record the raw value bound to a key
    pub fn set_attempted_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().attempted_value = Some(value.into());
    }

    /// Whether no key has errors
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(|entry| entry.errors.is_empty())
    }

    /// Total number of errors across keys
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.entries.values().map(|entry| entry.errors.len()).sum()
    }

    /// Entry for a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ModelStateEntry> {
        self.entries.get(key)
    }

    /// Error messages recorded for a key
    #[must_use]
    pub fn errors(&self, key: &str) -> Vec<&str> {
        self.entries
            .get(key)
            .map(|entry| entry.errors.iter().map(|error| error.error_message.as_str()).collect())
            .unwrap_or_default()
    }

    /// Whether the key exists
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys that have at least one error
    pub fn invalid_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.errors.is_empty())
            .map(|(key, _)| key.as_str())
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<ModelStateEntry> {
        self.entries.remove(key)
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy entries from another dictionary; errors are appended
    pub fn merge(&mut self, other: &Self) {
        for (key, entry) in &other.entries {
            let target = self.entries.entry(key.clone()).or_default();
            if entry.attempted_value.is_some() {
                target.attempted_value.clone_from(&entry.attempted_value);
            }
            target.errors.extend(entry.errors.iter().cloned());
        }
    }

    /// Error messages keyed by model key, the body of a validation problem
    #[must_use]
    pub fn to_error_map(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.errors.is_empty())
            .map(|(key, entry)| {
                let messages = entry.errors.iter().map(|error| error.error_message.clone()).collect();
                (key.clone(), messages)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_valid() {
        let state = ModelStateDictionary::new();
        assert!(state.is_valid());
        assert!(state.is_empty());
    }

    #[test]
    fn test_add_model_error() {
        let mut state = ModelStateDictionary::new();
        state.add_model_error("Name", "The Name field is required.");
        state.add_model_error("Name", "Too short.");
        assert!(!state.is_valid());
        assert_eq!(state.error_count(), 2);
        assert_eq!(state.errors("Name"), ["The Name field is required.", "Too short."]);
        assert_eq!(state.invalid_keys().collect::<Vec<_>>(), ["Name"]);
    }

    #[test]
    fn test_attempted_value_alone_is_valid() {
        let mut state = ModelStateDictionary::new();
        state.set_attempted_value("Age", "12");
        assert!(state.is_valid());
        assert_eq!(state.get("Age").unwrap().attempted_value.as_deref(), Some("12"));
    }

    #[test]
    fn test_merge_and_error_map() {
        let mut left = ModelStateDictionary::new();
        left.add_model_error("A", "one");
        let mut right = ModelStateDictionary::new();
        right.add_model_error("A", "two");
        right.set_attempted_value("B", "x");
        left.merge(&right);
        assert_eq!(left.errors("A"), ["one", "two"]);
        let map = left.to_error_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["A"], ["one", "two"]);
    }
}
