//! In-memory cache double.

use crate::reflection::{describe, Reflect};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Eviction priority of a cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, crate::Reflect)]
pub enum CacheItemPriority {
    /// Evicted first
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Evicted last
    High,
    /// Never evicted under memory pressure
    NeverRemove,
}

/// Expiration and eviction options of a cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq, crate::Reflect)]
pub struct CacheEntryOptions {
    /// Point in time the entry expires
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Lifetime relative to the time of insertion
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Expires after this long without access
    pub sliding_expiration: Option<Duration>,
    /// Eviction priority
    pub priority: CacheItemPriority,
    /// Size units the entry occupies
    pub size: Option<i64>,
}

impl CacheEntryOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire at a point in time
    #[must_use]
    pub fn with_absolute_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(expiration);
        self
    }

    /// Expire a fixed time after insertion
    #[must_use]
    pub fn with_absolute_expiration_relative_to_now(mut self, lifetime: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(lifetime);
        self
    }

    /// Expire after a period without access
    #[must_use]
    pub fn with_sliding_expiration(mut self, expiration: Duration) -> Self {
        self.sliding_expiration = Some(expiration);
        self
    }

    /// Set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: CacheItemPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the size
    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }
}

/// A cached value with its options
#[derive(Clone)]
pub struct CacheEntry {
    key: String,
    value: Arc<dyn Reflect + Send + Sync>,
    options: CacheEntryOptions,
    created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Entry value
    #[must_use]
    pub fn value(&self) -> &dyn Reflect {
        &*self.value
    }

    /// Entry value as a concrete type
    #[must_use]
    pub fn value_as<T: Reflect>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Entry options
    #[must_use]
    pub fn options(&self) -> &CacheEntryOptions {
        &self.options
    }

    /// Whether the entry expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let absolute = self.options.absolute_expiration.is_some_and(|at| at <= now);
        let relative = self
            .options
            .absolute_expiration_relative_to_now
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .is_some_and(|lifetime| self.created_at + lifetime <= now);
        absolute || relative
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &describe(self.value()))
            .field("options", &self.options)
            .finish()
    }
}

/// Shared in-memory cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<BTreeMap<String, CacheEntry>>>,
}

impl MemoryCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value with default options
    pub fn set<T: Reflect + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.set_with_options(key, value, CacheEntryOptions::default());
    }

    /// Store a value with options
    pub fn set_with_options<T: Reflect + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
        options: CacheEntryOptions,
    ) {
        let key = key.into();
        trace!(%key, "memory cache entry set");
        let entry = CacheEntry {
            key: key.clone(),
            value: Arc::new(value),
            options,
            created_at: Utc::now(),
        };
        self.entries.lock().insert(key, entry);
    }

    /// Live entry for a key; expired entries are removed
    #[must_use]
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        if entries.get(key)?.is_expired_at(Utc::now()) {
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }

    /// Clone of a live value as a concrete type
    #[must_use]
    pub fn get<T: Reflect + Clone>(&self, key: &str) -> Option<T> {
        self.get_entry(key)
            .and_then(|entry| entry.value_as::<T>().cloned())
    }

    /// Cached value or the result of `create`, which is then cached
    pub fn get_or_create<T, F>(&self, key: &str, create: F) -> T
    where
        T: Reflect + Send + Sync + Clone,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get::<T>(key) {
            return value;
        }
        let value = create();
        self.set(key, value.clone());
        value
    }

    /// Remove an entry
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Whether a live entry exists
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get_entry(key).is_some()
    }

    /// Snapshot of stored entries, ordered by key
    #[must_use]
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.lock().values().cloned().collect()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Whether two handles share the same store
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}
