//! Process-wide reflection caches.
//!
//! Every cached value is a pure function of its key (a type identity), so the
//! maps are insert-if-absent and never evicted. Memory grows with the number of
//! distinct controller and model types a test binary touches, which is bounded
//! by the program itself.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::trace;

/// Kind of per-type data held by [`get_or_insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Controller constructors
    Constructors,
    /// Action descriptors
    Actions,
    /// Controller-level attributes
    Attributes,
}

static FRIENDLY_NAMES: Lazy<DashMap<TypeId, String>> = Lazy::new(DashMap::new);

static TYPE_DATA: Lazy<DashMap<(CacheKind, TypeId), Arc<dyn Any + Send + Sync>>> =
    Lazy::new(DashMap::new);

/// Cached friendly name for a type identity.
pub(crate) fn friendly_name(type_id: TypeId, raw: &str) -> String {
    if let Some(name) = FRIENDLY_NAMES.get(&type_id) {
        return name.clone();
    }
    let name = super::prettify_type_name(raw);
    FRIENDLY_NAMES
        .entry(type_id)
        .or_insert(name)
        .value()
        .clone()
}

/// Look up per-type data, computing it on first use.
///
/// `init` runs outside the map lock, so it may itself consult the caches.
/// When two threads race, the first insert wins and both observe it.
pub fn get_or_insert<V, F>(kind: CacheKind, type_id: TypeId, init: F) -> Arc<V>
where
    V: Any + Send + Sync,
    F: FnOnce() -> V,
{
    let key = (kind, type_id);
    if let Some(cached) = TYPE_DATA.get(&key).map(|entry| Arc::clone(entry.value())) {
        if let Ok(value) = cached.downcast::<V>() {
            return value;
        }
    }

    let computed = Arc::new(init());
    let stored = Arc::clone(
        TYPE_DATA
            .entry(key)
            .or_insert_with(|| {
                trace!(?kind, "reflection cache populated");
                Arc::clone(&computed) as Arc<dyn Any + Send + Sync>
            })
            .value(),
    );
    stored.downcast::<V>().unwrap_or(computed)
}

/// Number of cached per-type entries of a kind
#[must_use]
pub fn entry_count(kind: CacheKind) -> usize {
    TYPE_DATA.iter().filter(|entry| entry.key().0 == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Marker;
    struct Other;

    #[test]
    fn test_get_or_insert_computes_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let init = || {
            CALLS.fetch_add(1, Ordering::SeqCst);
            vec!["a".to_string()]
        };
        let first = get_or_insert(CacheKind::Actions, TypeId::of::<Marker>(), init);
        let second = get_or_insert(CacheKind::Actions, TypeId::of::<Marker>(), init);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kinds_are_separate() {
        let actions = get_or_insert(CacheKind::Actions, TypeId::of::<Other>(), || 1_u32);
        let attributes = get_or_insert(CacheKind::Attributes, TypeId::of::<Other>(), || 2_u32);
        assert_eq!((*actions, *attributes), (1, 2));
        assert!(entry_count(CacheKind::Attributes) >= 1);
    }

    #[test]
    fn test_concurrent_population_agrees() {
        struct Raced;
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    *get_or_insert(CacheKind::Constructors, TypeId::of::<Raced>(), || i)
                })
            })
            .collect();
        let values: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_friendly_name_cached() {
        let raw = std::any::type_name::<Marker>();
        let first = friendly_name(TypeId::of::<Marker>(), raw);
        assert_eq!(first, "Marker");
        assert_eq!(friendly_name(TypeId::of::<Marker>(), "ignored"), "Marker");
    }
}
