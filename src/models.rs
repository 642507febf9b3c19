// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Domain records and wire payloads.
//!
//! `Site` and `Comment` are owned by the external store; this crate
//! holds them only for the duration of a request, for authorization and
//! caching decisions. Wire payloads use camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered website allowed to embed the widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Opaque site identifier; doubles as the public `siteName`.
    pub id: String,
    /// Registered origin domain, checked against the `Origin` header.
    #[serde(default)]
    pub domain: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Site {
    /// A site needs a domain or an owner to be usable for authorization.
    pub fn is_usable(&self) -> bool {
        self.domain.is_some() || !self.owner_id.is_empty()
    }
}

/// A single comment on a `(siteId, pathId)` thread.
///
/// Immutable once created, except for deletion by the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub site_id: String,
    /// Slugified page path the comment belongs to.
    pub path_id: String,
    pub message: String,
    pub author: String,
    /// Id of the parent comment on the same thread, if any.
    #[serde(default)]
    pub parent: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Copied from the site at insert time.
    pub owner_id: String,
}

/// Authenticated dashboard user, resolved from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
}

/// Untrusted comment submission body, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub site_name: Option<String>,
    pub path_name: Option<String>,
    pub message: Option<String>,
    pub author: Option<String>,
    pub parent: Option<String>,
    pub captcha_token: Option<String>,
}

/// Untrusted site creation/update body, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitePayload {
    pub domain: Option<String>,
}

/// Validated, normalized comment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    pub site_name: String,
    pub path_name: String,
    pub message: String,
    pub author: String,
    pub parent: Option<String>,
}

/// Validated, normalized site input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInput {
    pub domain: String,
}

/// A site plus its comment count, as listed on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteWithCount {
    #[serde(flatten)]
    pub site: Site,
    pub comment_count: u64,
}

/// Aggregate owner counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsCounts {
    pub sites: u64,
    pub comments: u64,
}

/// Owner-scoped dashboard stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub stats: StatsCounts,
    /// Five most recently registered sites.
    pub recent_sites: Vec<Site>,
}
