//! In-process TTL cache.
//!
//! Memoizes trained-model performance records and historical category
//! averages so batch runs don't retrain or re-aggregate on every call.
//! This is a performance optimization, not a correctness requirement.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A string-keyed cache whose entries expire after a per-entry TTL.
///
/// Expired entries are dropped lazily on access.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live entry, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace an entry with the given TTL.
    pub fn put(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Whether a live entry exists for `key`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Fetch a live entry or compute, store, and return it.
    pub fn get_or_insert_with(&self, key: &str, ttl: Duration, f: impl FnOnce() -> T) -> T {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = f();
        self.put(key, value.clone(), ttl);
        value
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
