//! Session and temp data assertions.

use crate::context::FailureContext;
use crate::result::{MvcTestError, MvcTestResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

fn data_error(message: String) -> MvcTestError {
    MvcTestError::DataProviderAssertion { message }
}

/// Checks over a keyed store such as the session or temp data
#[derive(Debug, Clone)]
pub struct DataProviderTestBuilder {
    name: &'static str,
    entries: BTreeMap<String, Value>,
    failure: FailureContext,
}

impl DataProviderTestBuilder {
    pub(crate) const fn new(name: &'static str, entries: BTreeMap<String, Value>, failure: FailureContext) -> Self {
        Self { name, entries, failure }
    }

    fn error(&self, expected: &str, actual: &str) -> MvcTestError {
        data_error(self.failure.message(&format!("{} {expected}", self.name), actual))
    }

    /// Exactly `count` entries
    pub fn with_number_of_entries(self, count: usize) -> MvcTestResult<Self> {
        if self.entries.len() == count {
            return Ok(self);
        }
        Err(self.error(
            &format!("to have {count} entries"),
            &format!("in fact contained {}", self.entries.len()),
        ))
    }

    /// An entry under `key`
    pub fn containing_entry_with_key(self, key: &str) -> MvcTestResult<Self> {
        if self.entries.contains_key(key) {
            return Ok(self);
        }
        Err(self.error(&format!("to have entry with '{key}' key"), "such was not found"))
    }

    /// An entry under `key` serializing to the same JSON as `value`.
    ///
    /// # Errors
    ///
    /// `DataProviderAssertion` when missing or different; `Json` when
    /// `value` cannot be serialized.
    pub fn containing_entry<T: Serialize>(self, key: &str, value: &T) -> MvcTestResult<Self> {
        let expected = serde_json::to_value(value)?;
        match self.entries.get(key).cloned() {
            Some(actual) if actual == expected => Ok(self),
            Some(actual) => Err(self.error(
                &format!("to have entry with '{key}' key and '{expected}' value"),
                &format!("in fact it was '{actual}'"),
            )),
            None => Err(self.error(&format!("to have entry with '{key}' key"), "such was not found")),
        }
    }

    /// An entry under `key` that deserializes into `T`
    pub fn containing_entry_of_type<T: DeserializeOwned>(self, key: &str) -> MvcTestResult<Self> {
        let Some(actual) = self.entries.get(key) else {
            return Err(self.error(&format!("to have entry with '{key}' key"), "such was not found"));
        };
        if serde_json::from_value::<T>(actual.clone()).is_ok() {
            return Ok(self);
        }
        Err(self.error(
            &format!(
                "to have entry with '{key}' key of {} type",
                crate::reflection::prettify_type_name(std::any::type_name::<T>())
            ),
            "in fact it was different",
        ))
    }

    /// Exactly these entries; the count is checked first
    pub fn containing_entries<K, V>(self, entries: impl IntoIterator<Item = (K, V)>) -> MvcTestResult<Self>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let expected = entries
            .into_iter()
            .map(|(key, value)| Ok((key.as_ref().to_string(), serde_json::to_value(&value)?)))
            .collect::<MvcTestResult<Vec<_>>>()?;
        let mut builder = self.with_number_of_entries(expected.len())?;
        for (key, value) in &expected {
            builder = builder.containing_entry(key, value)?;
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> DataProviderTestBuilder {
        let mut entries = BTreeMap::new();
        entries.insert("cart".to_string(), json!(3));
        entries.insert("user".to_string(), json!({"name": "Ivo"}));
        DataProviderTestBuilder::new(
            "session",
            entries,
            FailureContext {
                controller: "CartController".to_string(),
                action: Some("add".to_string()),
            },
        )
    }

    #[derive(Debug, serde::Deserialize)]
    struct User {
        #[allow(dead_code)]
        name: String,
    }

    #[test]
    fn test_entries() {
        let result = session()
            .containing_entry_with_key("cart")
            .and_then(|builder| builder.containing_entry("cart", &3))
            .and_then(|builder| builder.containing_entry_of_type::<User>("user"))
            .and_then(|builder| builder.with_number_of_entries(2));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_key() {
        let error = session().containing_entry_with_key("token").unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling add action in CartController expected session to have entry with 'token' key, but such was not found."
        );
    }

    #[test]
    fn test_different_value() {
        let error = session().containing_entry("cart", &4).unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling add action in CartController expected session to have entry with 'cart' key and '4' value, but in fact it was '3'."
        );
    }

    #[test]
    fn test_entries_count_first() {
        let error = session().containing_entries([("cart", 3)]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "When calling add action in CartController expected session to have 1 entries, but in fact contained 2."
        );
    }
}
