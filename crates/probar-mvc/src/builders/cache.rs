//! Memory cache assertions.

use super::{difference, shown};
use crate::context::FailureContext;
use crate::mvc::cache::{CacheEntry, CacheItemPriority, MemoryCache};
use crate::reflection::{deep_equality, describe, format_time_span, friendly_name_of, friendly_type_name, Reflect};
use crate::result::{MvcTestError, MvcTestResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

fn cache_error(message: String) -> MvcTestError {
    MvcTestError::DataProviderAssertion { message }
}

/// Checks over the memory cache after the action ran
#[derive(Debug, Clone)]
pub struct MemoryCacheTestBuilder {
    cache: MemoryCache,
    failure: FailureContext,
}

impl MemoryCacheTestBuilder {
    pub(crate) const fn new(cache: MemoryCache, failure: FailureContext) -> Self {
        Self { cache, failure }
    }

    fn entry(&self, key: &str) -> MvcTestResult<CacheEntry> {
        self.cache.get_entry(key).ok_or_else(|| {
            cache_error(self.failure.message(
                &format!("memory cache to have entry with '{key}' key"),
                "such was not found",
            ))
        })
    }

    /// Exactly `count` entries
    pub fn with_number_of_entries(self, count: usize) -> MvcTestResult<Self> {
        let actual = self.cache.len();
        if actual == count {
            return Ok(self);
        }
        Err(cache_error(self.failure.message(
            &format!("memory cache to have {count} entries"),
            &format!("in fact contained {actual}"),
        )))
    }

    /// An entry under `key`
    pub fn containing_entry_with_key(self, key: &str) -> MvcTestResult<Self> {
        self.entry(key)?;
        Ok(self)
    }

    /// An entry under `key` deeply equal to `value`
    pub fn containing_entry_with_value(self, key: &str, value: impl Reflect) -> MvcTestResult<Self> {
        let entry = self.entry(key)?;
        let result = deep_equality(&value, entry.value());
        if result.are_equal() {
            return Ok(self);
        }
        Err(cache_error(self.failure.message(
            &format!("memory cache to have entry with '{key}' key and the given value"),
            &difference(&result),
        )))
    }

    /// An entry under `key` holding a `T`
    pub fn containing_entry_of_type<T: Reflect>(self, key: &str) -> MvcTestResult<Self> {
        let entry = self.entry(key)?;
        if entry.value().as_any().is::<T>() {
            return Ok(self);
        }
        Err(cache_error(self.failure.message(
            &format!(
                "memory cache to have entry with '{key}' key of {} type",
                friendly_type_name::<T>()
            ),
            &format!("in fact it was {}", friendly_name_of(entry.value())),
        )))
    }

    /// Detailed checks over the entry under `key`
    pub fn containing_entry(
        self,
        key: &str,
        check: impl FnOnce(MemoryCacheEntryTestBuilder) -> MvcTestResult<MemoryCacheEntryTestBuilder>,
    ) -> MvcTestResult<Self> {
        let entry = self.entry(key)?;
        check(MemoryCacheEntryTestBuilder::new(entry, self.failure.clone()))?;
        Ok(self)
    }

    /// Exactly these entries; the count is checked first
    pub fn containing_entries<K, V>(self, entries: impl IntoIterator<Item = (K, V)>) -> MvcTestResult<Self>
    where
        K: AsRef<str>,
        V: Reflect,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let mut builder = self.with_number_of_entries(entries.len())?;
        for (key, value) in entries {
            builder = builder.containing_entry_with_value(key.as_ref(), value)?;
        }
        Ok(builder)
    }
}

/// Checks over one cache entry and its options
#[derive(Debug, Clone)]
pub struct MemoryCacheEntryTestBuilder {
    entry: CacheEntry,
    failure: FailureContext,
}

impl MemoryCacheEntryTestBuilder {
    pub(crate) const fn new(entry: CacheEntry, failure: FailureContext) -> Self {
        Self { entry, failure }
    }

    fn check(self, setting: &str, expected: &str, actual: Option<String>) -> MvcTestResult<Self> {
        if actual.as_deref() == Some(expected) {
            return Ok(self);
        }
        Err(cache_error(self.failure.message(
            &format!(
                "memory cache entry with '{}' key to have {setting} of '{expected}'",
                self.entry.key()
            ),
            &format!("in fact it was '{}'", shown(actual.as_ref())),
        )))
    }

    /// Value deeply equal to `expected`
    pub fn with_value(self, expected: impl Reflect) -> MvcTestResult<Self> {
        let result = deep_equality(&expected, self.entry.value());
        if result.are_equal() {
            return Ok(self);
        }
        Err(cache_error(self.failure.message(
            &format!("memory cache entry with '{}' key to have the given value", self.entry.key()),
            &difference(&result),
        )))
    }

    /// Value of type `T`
    pub fn with_value_of_type<T: Reflect>(self) -> MvcTestResult<Self> {
        if self.entry.value().as_any().is::<T>() {
            return Ok(self);
        }
        let actual = friendly_name_of(self.entry.value());
        self.check("value type", &friendly_type_name::<T>(), Some(actual))
    }

    /// Absolute expiration at `expected`
    pub fn with_absolute_expiration(self, expected: DateTime<Utc>) -> MvcTestResult<Self> {
        let actual = self.entry.options().absolute_expiration.map(|at| at.to_string());
        self.check("absolute expiration", &expected.to_string(), actual)
    }

    /// Absolute expiration relative to insertion
    pub fn with_absolute_expiration_relative_to_now(self, expected: Duration) -> MvcTestResult<Self> {
        let actual = self
            .entry
            .options()
            .absolute_expiration_relative_to_now
            .map(format_time_span);
        self.check(
            "absolute expiration relative to now",
            &format_time_span(expected),
            actual,
        )
    }

    /// Sliding expiration
    pub fn with_sliding_expiration(self, expected: Duration) -> MvcTestResult<Self> {
        let actual = self.entry.options().sliding_expiration.map(format_time_span);
        self.check("sliding expiration", &format_time_span(expected), actual)
    }

    /// Eviction priority
    pub fn with_priority(self, expected: CacheItemPriority) -> MvcTestResult<Self> {
        let actual = describe(&self.entry.options().priority);
        self.check("priority", &describe(&expected), Some(actual))
    }

    /// Size units
    pub fn with_size(self, expected: i64) -> MvcTestResult<Self> {
        let actual = self.entry.options().size.map(|size| size.to_string());
        self.check("size", &expected.to_string(), actual)
    }
}
