//! Session and temp data stores.
//!
//! Both are cheap handles over shared state: the copy a test configures and
//! the copy the controller writes to are the same store.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::result::MvcTestResult;

#[derive(Debug, Default)]
struct Store {
    entries: BTreeMap<String, Value>,
}

macro_rules! keyed_store {
    ($name:ident) => {
        impl $name {
            /// Store a string
            pub fn set_string(&self, key: impl Into<String>, value: impl Into<String>) {
                self.store.lock().entries.insert(key.into(), Value::String(value.into()));
            }

            /// Read a string
            #[must_use]
            pub fn get_string(&self, key: &str) -> Option<String> {
                match self.store.lock().entries.get(key) {
                    Some(Value::String(value)) => Some(value.clone()),
                    _ => None,
                }
            }

            /// Store an integer
            pub fn set_i32(&self, key: impl Into<String>, value: i32) {
                self.store.lock().entries.insert(key.into(), Value::from(value));
            }

            /// Read an integer
            #[must_use]
            pub fn get_i32(&self, key: &str) -> Option<i32> {
                self.store
                    .lock()
                    .entries
                    .get(key)
                    .and_then(Value::as_i64)
                    .and_then(|value| i32::try_from(value).ok())
            }

            /// Store any serializable value
            pub fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) -> MvcTestResult<()> {
                let value = serde_json::to_value(value)?;
                self.store.lock().entries.insert(key.into(), value);
                Ok(())
            }

            /// Read a value back into a type
            #[must_use]
            pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
                let value = self.store.lock().entries.get(key).cloned()?;
                serde_json::from_value(value).ok()
            }

            /// Raw stored value
            #[must_use]
            pub fn get_value(&self, key: &str) -> Option<Value> {
                self.store.lock().entries.get(key).cloned()
            }

            /// Remove an entry
            pub fn remove(&self, key: &str) -> Option<Value> {
                self.store.lock().entries.remove(key)
            }

            /// Remove every entry
            pub fn clear(&self) {
                self.store.lock().entries.clear();
            }

            /// Whether the key exists
            #[must_use]
            pub fn contains_key(&self, key: &str) -> bool {
                self.store.lock().entries.contains_key(key)
            }

            /// Keys in order
            #[must_use]
            pub fn keys(&self) -> Vec<String> {
                self.store.lock().entries.keys().cloned().collect()
            }

            /// Snapshot of all entries
            #[must_use]
            pub fn entries(&self) -> BTreeMap<String, Value> {
                self.store.lock().entries.clone()
            }

            /// Number of entries
            #[must_use]
            pub fn len(&self) -> usize {
                self.store.lock().entries.len()
            }

            /// Whether there are no entries
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.store.lock().entries.is_empty()
            }

            /// Whether two handles share the same store
            #[must_use]
            pub fn same_store(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.store, &other.store)
            }
        }
    };
}

/// Per-user session store
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    store: Arc<Mutex<Store>>,
}

impl Session {
    /// Empty session with a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            store: Arc::default(),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

keyed_store!(Session);

/// Data kept for the next request
#[derive(Debug, Clone, Default)]
pub struct TempData {
    store: Arc<Mutex<Store>>,
}

impl TempData {
    /// Empty temp data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

keyed_store!(TempData);
