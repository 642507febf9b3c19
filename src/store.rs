// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ports to the external collaborators: the relational site/comment
//! store and the identity provider behind the dashboard.
//!
//! The core never assumes in-process mutability of these records beyond
//! a single request; everything it needs for authorization and caching
//! travels on the returned values.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AuthUser, Comment, Site};

/// Store backend error. Handlers map this to a 500-class response; the
/// detail is for logs only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for registered sites.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn site(&self, id: &str) -> StoreResult<Option<Site>>;
    /// Owner's sites, newest first.
    async fn sites_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Site>>;
    async fn create_site(&self, site: Site) -> StoreResult<()>;
    async fn update_domain(&self, id: &str, domain: &str) -> StoreResult<()>;
    async fn delete_site(&self, id: &str) -> StoreResult<()>;
}

/// Persistence contract for comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, comment: Comment) -> StoreResult<()>;
    async fn comment(&self, id: &str) -> StoreResult<Option<Comment>>;
    /// All comments of one thread, oldest first.
    async fn thread(&self, site_id: &str, path_id: &str) -> StoreResult<Vec<Comment>>;
    /// Owner's comments across sites, newest first, optionally filtered
    /// to one site.
    async fn comments_for_owner(
        &self,
        owner_id: &str,
        site_filter: Option<&str>,
    ) -> StoreResult<Vec<Comment>>;
    async fn delete(&self, id: &str) -> StoreResult<()>;
    async fn count_for_site(&self, site_id: &str) -> StoreResult<u64>;
    async fn count_for_owner(&self, owner_id: &str) -> StoreResult<u64>;
}

/// Identity/session provider backing the dashboard's bearer tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user, `None` when the token is
    /// unknown or expired.
    async fn resolve(&self, bearer_token: &str) -> StoreResult<Option<AuthUser>>;
}
