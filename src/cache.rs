// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Read-through cache over an injected key-value store.
//!
//! Caching is a performance optimization, never a correctness
//! dependency: an absent store, a failing store, or an entry that no
//! longer deserializes all fall back to computing the value directly.
//! Compute errors, by contrast, always propagate.
//!
//! Cache keys are deterministic functions of the query parameters (see
//! [`keys`]); every mutating handler invalidates the key families its
//! write could have made stale before its response is sent.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::Metrics;

/// Key-value store error.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store error: {0}")]
    Backend(String),
}

/// Shared key-value service backing the cache.
///
/// The contract mirrors Redis `GET`/`SETEX`/`DEL`/`KEYS`; values are
/// opaque strings (this crate stores JSON), and `keys` matches a glob
/// pattern where `*` spans any run of characters.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;
    async fn del(&self, key: &str) -> Result<(), KvError>;
    async fn del_many(&self, keys: &[String]) -> Result<(), KvError>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError>;
}

/// Read-through cache.
pub struct Cache {
    store: Option<Arc<dyn KeyValueStore>>,
    metrics: Option<Arc<Metrics>>,
}

impl Cache {
    /// Create a cache. Passing `None` for the store disables caching
    /// (every read computes directly).
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, metrics: Option<Arc<Metrics>>) -> Self {
        Self { store, metrics }
    }

    /// Return the cached value for `key`, or compute, store, and return it.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let Some(store) = &self.store else {
            return compute().await;
        };

        match store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    self.count("hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key, error = %e, "dropping undeserializable cache entry");
                    if let Err(e) = store.del(key).await {
                        warn!(key, error = %e, "failed to drop cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key, error = %e, "cache read failed, computing directly");
                return compute().await;
            }
        }

        debug!(key, "cache miss");
        self.count("miss");
        let value = compute().await?;
        self.try_store(store, key, &value, ttl).await;
        Ok(value)
    }

    /// Variant of [`Self::get_or_compute`] for optional lookups: a
    /// computed `None` is returned but never stored.
    pub async fn get_or_compute_opt<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> anyhow::Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let Some(store) = &self.store else {
            return compute().await;
        };

        match store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    self.count("hit");
                    return Ok(Some(value));
                }
                Err(e) => {
                    warn!(key, error = %e, "dropping undeserializable cache entry");
                    if let Err(e) = store.del(key).await {
                        warn!(key, error = %e, "failed to drop cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key, error = %e, "cache read failed, computing directly");
                return compute().await;
            }
        }

        debug!(key, "cache miss");
        self.count("miss");
        let value = compute().await?;
        if let Some(present) = &value {
            self.try_store(store, key, present, ttl).await;
        }
        Ok(value)
    }

    /// Drop a single cache entry. Failures are logged, never surfaced.
    pub async fn invalidate(&self, key: &str) {
        let Some(store) = &self.store else { return };
        match store.del(key).await {
            Ok(()) => debug!(key, "cache invalidated"),
            Err(e) => warn!(key, error = %e, "cache invalidation failed"),
        }
    }

    /// Drop every cache entry matching a glob pattern as one batch.
    /// An empty match set is a no-op.
    pub async fn invalidate_pattern(&self, pattern: &str) {
        let Some(store) = &self.store else { return };
        let keys = match store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern, error = %e, "cache pattern invalidation failed");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        match store.del_many(&keys).await {
            Ok(()) => debug!(pattern, count = keys.len(), "cache pattern invalidated"),
            Err(e) => warn!(pattern, error = %e, "cache pattern invalidation failed"),
        }
    }

    async fn try_store<T: Serialize>(
        &self,
        store: &Arc<dyn KeyValueStore>,
        key: &str,
        value: &T,
        ttl: Duration,
    ) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(e) = store.set(key, &raw, ttl).await {
                    warn!(key, error = %e, "cache store failed");
                }
            }
            Err(e) => warn!(key, error = %e, "cache serialization failed"),
        }
    }

    fn count(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.cache.with_label_values(&[result]).inc();
        }
    }
}

/// Deterministic cache key builders, shared by readers and invalidators.
pub mod keys {
    /// All comments of one `(siteId, pathId)` thread.
    pub fn thread(site_id: &str, path_id: &str) -> String {
        format!("comments:{site_id}:{path_id}")
    }

    /// An owner's comment list, optionally filtered to one site.
    pub fn comments_list(owner_id: &str, site: Option<&str>) -> String {
        format!("comments:list:{owner_id}:{}", site.unwrap_or("all"))
    }

    /// A single site record.
    pub fn site(site_id: &str) -> String {
        format!("site:{site_id}")
    }

    /// An owner's site list with comment counts.
    pub fn sites_list(owner_id: &str) -> String {
        format!("sites:list:{owner_id}")
    }

    /// An owner's aggregate stats.
    pub fn stats(owner_id: &str) -> String {
        format!("stats:{owner_id}")
    }
}

/// Match a Redis-style glob where `*` spans any run of characters.
pub fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();
    let (mut p, mut i) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while i < input.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, i));
            p += 1;
        } else if p < pattern.len() && pattern[p] == input[i] {
            p += 1;
            i += 1;
        } else if let Some((star_p, star_i)) = star {
            // Backtrack: let the last `*` absorb one more character.
            p = star_p + 1;
            i = star_i + 1;
            star = Some((star_p, star_i + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKeyValueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Cache, Arc<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        (Cache::new(Some(store.clone()), None), store)
    }

    #[tokio::test]
    async fn computes_once_until_invalidated() {
        let (cache, _store) = cache();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        for _ in 0..2 {
            let value: String = cache
                .get_or_compute("thread:a", ttl, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("hello".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "hello");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("thread:a").await;

        let _: String = cache
            .get_or_compute("thread:a", ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("hello".to_string())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pattern_invalidation_spares_other_owners() {
        let (cache, store) = cache();
        let ttl = Duration::from_secs(60);

        for key in ["comments:list:u1:all", "comments:list:u1:s1", "comments:list:u2:all"] {
            store.set(key, "[]", ttl).await.unwrap();
        }

        cache.invalidate_pattern("comments:list:u1:*").await;

        assert_eq!(store.get("comments:list:u1:all").await.unwrap(), None);
        assert_eq!(store.get("comments:list:u1:s1").await.unwrap(), None);
        assert!(store.get("comments:list:u2:all").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_pattern_match_is_a_noop() {
        let (cache, _store) = cache();
        cache.invalidate_pattern("comments:list:nobody:*").await;
    }

    #[tokio::test]
    async fn falls_back_when_the_stored_value_is_poisoned() {
        let (cache, store) = cache();
        let ttl = Duration::from_secs(60);
        store.set("stats:u1", "not json {", ttl).await.unwrap();

        let value: u64 = cache
            .get_or_compute("stats:u1", ttl, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        // The poisoned entry was replaced by the recomputed value.
        assert_eq!(store.get("stats:u1").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn none_results_are_not_stored() {
        let (cache, store) = cache();
        let ttl = Duration::from_secs(60);

        let value: Option<u64> = cache
            .get_or_compute_opt("site:missing", ttl, || async { Ok(None) })
            .await
            .unwrap();
        assert_eq!(value, None);
        assert_eq!(store.get("site:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn works_without_a_store() {
        let cache = Cache::new(None, None);
        let value: u64 = cache
            .get_or_compute("anything", Duration::from_secs(1), || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("comments:list:u1:*", "comments:list:u1:all"));
        assert!(glob_match("comments:s1:*", "comments:s1:/blog/post"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*b*c", "a-x-b-y-c"));
        assert!(!glob_match("comments:list:u1:*", "comments:list:u2:all"));
        assert!(!glob_match("comments:s1:*", "comments:s10")); // no separator
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exact-not"));
    }
}
