//! Search response caching
//!
//! In-memory LRU keyed by a SHA-256 over the normalized query, the canonical
//! context and the effective result options. Entries expire after a TTL and
//! are stamped with the index generation they were computed against, so a
//! response is never served once the index has changed.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::context::SearchContext;
use crate::config::CacheConfig;
use crate::error::{RankError, Result};

/// Cache key derived from a query, its context and result options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        query: &str,
        context: &SearchContext,
        max_results: usize,
        threshold: f32,
    ) -> Result<Self> {
        let context_json = context
            .canonical_json()
            .map_err(|err| RankError::Cache(format!("context serialization failed: {err}")))?;

        let mut hasher = Sha256::new();
        hasher.update(normalize_query(query).as_bytes());
        hasher.update([0u8]);
        hasher.update(context_json.as_bytes());
        hasher.update([0u8]);
        hasher.update(max_results.to_le_bytes());
        hasher.update(threshold.to_bits().to_le_bytes());
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// NFKC, lowercase, single spaces.
pub fn normalize_query(query: &str) -> String {
    let folded: String = query.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache<T> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<T>>>,
    ttl: Duration,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            enabled: config.enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fresh entry for `key` computed against `generation`, if any.
    ///
    /// Expired or stale entries are evicted on lookup.
    pub fn get(&self, key: &CacheKey, generation: u64) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| entry.generation == generation && entry.stored_at.elapsed() < self.ttl);
        let value = match fresh {
            Some(true) => entries.get(key).map(|entry| entry.value.clone()),
            Some(false) => {
                entries.pop(key);
                debug!(key = key.as_str(), "evicted stale cache entry");
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    pub fn put(&self, key: CacheKey, value: T, generation: u64) {
        if !self.enabled {
            return;
        }
        self.entries.lock().put(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                generation,
            },
        );
    }

    /// Drop every entry; called on each index write.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            capacity: 2,
            ttl: Duration::from_secs(60),
        }
    }

    fn key(query: &str) -> CacheKey {
        CacheKey::new(query, &SearchContext::default(), 10, 0.7).unwrap()
    }

    #[test]
    fn key_normalizes_query_text() {
        assert_eq!(key("Database   Optimization"), key("database optimization"));
        // NFKC folds the full-width letters
        assert_eq!(key("ＤＢ tuning"), key("db tuning"));
        assert_ne!(key("database"), key("databases"));
    }

    #[test]
    fn key_covers_context_and_options() {
        let ctx = SearchContext::new().domain("technical");
        let base = CacheKey::new("q", &SearchContext::default(), 10, 0.7).unwrap();
        assert_ne!(base, CacheKey::new("q", &ctx, 10, 0.7).unwrap());
        assert_ne!(base, CacheKey::new("q", &SearchContext::default(), 5, 0.7).unwrap());
        assert_ne!(base, CacheKey::new("q", &SearchContext::default(), 10, 0.5).unwrap());
        assert_eq!(base.as_str().len(), 64);
    }

    #[test]
    fn get_returns_fresh_entry_and_counts() {
        let cache = ResultCache::new(&config());
        cache.put(key("a"), 1u32, 7);
        assert_eq!(cache.get(&key("a"), 7), Some(1));
        assert_eq!(cache.get(&key("b"), 7), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn generation_change_invalidates() {
        let cache = ResultCache::new(&config());
        cache.put(key("a"), 1u32, 1);
        assert_eq!(cache.get(&key("a"), 2), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn ttl_expiry() {
        let cache = ResultCache::new(&CacheConfig {
            ttl: Duration::ZERO,
            ..config()
        });
        cache.put(key("a"), 1u32, 0);
        assert_eq!(cache.get(&key("a"), 0), None);
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let cache = ResultCache::new(&config());
        cache.put(key("a"), 1u32, 0);
        cache.put(key("b"), 2u32, 0);
        assert_eq!(cache.get(&key("a"), 0), Some(1));
        cache.put(key("c"), 3u32, 0);
        assert_eq!(cache.get(&key("b"), 0), None);
        assert_eq!(cache.get(&key("a"), 0), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn disabled_cache_is_noop() {
        let cache = ResultCache::new(&CacheConfig {
            enabled: false,
            ..config()
        });
        cache.put(key("a"), 1u32, 0);
        assert_eq!(cache.get(&key("a"), 0), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = ResultCache::new(&config());
        cache.put(key("a"), 1u32, 0);
        cache.clear();
        assert_eq!(cache.get(&key("a"), 0), None);
    }
}
