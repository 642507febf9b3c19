// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory backends for every injected seam.
//!
//! The default deployment runs on these, the way the sibling services
//! default to an embedded store; tests use them as fakes. Entries
//! expire lazily on read, with `cleanup()` swept periodically by the
//! server's background task.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::cache::{glob_match, KeyValueStore, KvError};
use crate::limiter::{CounterError, CounterStore};
use crate::models::{AuthUser, Comment, Site};
use crate::store::{CommentStore, IdentityProvider, SiteStore, StoreResult};

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory counter store for the rate limiter.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: RwLock<HashMap<String, Expiring<u64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired counters.
    pub async fn cleanup(&self) {
        self.counters.write().await.retain(|_, entry| entry.live());
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, CounterError> {
        let mut counters = self.counters.write().await;
        match counters.get_mut(key) {
            Some(entry) if entry.live() => {
                entry.value += 1;
                Ok(entry.value)
            }
            _ => {
                counters.insert(
                    key.to_string(),
                    Expiring {
                        value: 1,
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<u64, CounterError> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(key)
            .filter(|entry| entry.live())
            .map(|entry| entry.value)
            .unwrap_or(0))
    }
}

/// In-memory key-value store for the cache.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Expiring<String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries.
    pub async fn cleanup(&self) {
        self.entries.write().await.retain(|_, entry| entry.live());
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.live())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.write().await.insert(
            key.to_string(),
            Expiring {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn del_many(&self, keys: &[String]) -> Result<(), KvError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.live() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// In-memory site store.
#[derive(Default)]
pub struct MemorySiteStore {
    sites: RwLock<HashMap<String, Site>>,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn site(&self, id: &str) -> StoreResult<Option<Site>> {
        Ok(self.sites.read().await.get(id).cloned())
    }

    async fn sites_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Site>> {
        let sites = self.sites.read().await;
        let mut owned: Vec<Site> = sites
            .values()
            .filter(|site| site.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn create_site(&self, site: Site) -> StoreResult<()> {
        self.sites.write().await.insert(site.id.clone(), site);
        Ok(())
    }

    async fn update_domain(&self, id: &str, domain: &str) -> StoreResult<()> {
        if let Some(site) = self.sites.write().await.get_mut(id) {
            site.domain = Some(domain.to_string());
        }
        Ok(())
    }

    async fn delete_site(&self, id: &str) -> StoreResult<()> {
        self.sites.write().await.remove(id);
        Ok(())
    }
}

/// In-memory comment store.
#[derive(Default)]
pub struct MemoryCommentStore {
    comments: RwLock<HashMap<String, Comment>>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: Comment) -> StoreResult<()> {
        self.comments
            .write()
            .await
            .insert(comment.id.clone(), comment);
        Ok(())
    }

    async fn comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        Ok(self.comments.read().await.get(id).cloned())
    }

    async fn thread(&self, site_id: &str, path_id: &str) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut thread: Vec<Comment> = comments
            .values()
            .filter(|c| c.site_id == site_id && c.path_id == path_id)
            .cloned()
            .collect();
        thread.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(thread)
    }

    async fn comments_for_owner(
        &self,
        owner_id: &str,
        site_filter: Option<&str>,
    ) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut owned: Vec<Comment> = comments
            .values()
            .filter(|c| c.owner_id == owner_id)
            .filter(|c| site_filter.map_or(true, |site| c.site_id == site))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(owned)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.comments.write().await.remove(id);
        Ok(())
    }

    async fn count_for_site(&self, site_id: &str) -> StoreResult<u64> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|c| c.site_id == site_id).count() as u64)
    }

    async fn count_for_owner(&self, owner_id: &str) -> StoreResult<u64> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|c| c.owner_id == owner_id).count() as u64)
    }
}

/// In-memory identity provider mapping bearer tokens to users.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    tokens: RwLock<HashMap<String, AuthUser>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user id.
    pub async fn register(&self, token: &str, uid: &str) {
        self.tokens.write().await.insert(
            token.to_string(),
            AuthUser {
                uid: uid.to_string(),
            },
        );
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn resolve(&self, bearer_token: &str) -> StoreResult<Option<AuthUser>> {
        Ok(self.tokens.read().await.get(bearer_token).cloned())
    }
}
