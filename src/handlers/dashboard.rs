// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Authenticated dashboard endpoints: owner-scoped comment and site
//! management plus aggregate stats.
//!
//! Ownership failures answer 404 with wording that does not reveal
//! whether the resource exists or is merely disallowed, so probing
//! cannot enumerate other owners' sites or comments.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{admit, error_response, with_headers, AppState};
use crate::cache::keys;
use crate::cors::{cors_headers, EndpointClass};
use crate::error::ApiError;
use crate::limiter::RateClass;
use crate::models::{
    AuthUser, Comment, Site, SitePayload, SiteWithCount, StatsCounts, StatsResponse,
};
use crate::origin::screen_origin_header;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    pub site_id: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

/// Preflight for the dashboard endpoints.
pub async fn preflight(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cors = dashboard_cors(&state, &headers);
    with_headers(StatusCode::NO_CONTENT.into_response(), &cors)
}

/// `GET /api/comments?siteId=&page=&perPage=`: owner's comments.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommentListQuery>,
    headers: HeaderMap,
) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let site_filter = query
            .site_id
            .as_deref()
            .filter(|site| !site.is_empty() && *site != "all")
            .map(str::to_string);

        let key = keys::comments_list(&user.uid, site_filter.as_deref());
        let comments: Vec<Comment> = state
            .cache
            .get_or_compute(&key, state.config.cache_ttl.comments(), || async {
                Ok(state
                    .comments
                    .comments_for_owner(&user.uid, site_filter.as_deref())
                    .await?)
            })
            .await
            .map_err(|e| ApiError::Internal(format!("comment list failed: {e}")))?;

        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let start = (page - 1).saturating_mul(per_page).min(comments.len());
        let end = start.saturating_add(per_page).min(comments.len());

        Ok(Json(&comments[start..end]).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `DELETE /api/comments/:id`: delete an owned comment.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let comment = state
            .comments
            .comment(&id)
            .await
            .map_err(|e| ApiError::Internal(format!("comment lookup failed: {e}")))?
            .filter(|comment| comment.owner_id == user.uid)
            .ok_or_else(|| {
                ApiError::NotFound("Comment not found or permission denied".to_string())
            })?;

        state
            .comments
            .delete(&id)
            .await
            .map_err(|e| ApiError::Internal(format!("comment delete failed: {e}")))?;

        debug!(comment = %id, owner = %user.uid, "comment deleted");

        // Counts changed everywhere this comment could appear.
        state
            .cache
            .invalidate(&keys::thread(&comment.site_id, &comment.path_id))
            .await;
        state
            .cache
            .invalidate_pattern(&format!("comments:list:{}:*", user.uid))
            .await;
        state.cache.invalidate(&keys::stats(&user.uid)).await;
        state.cache.invalidate(&keys::sites_list(&user.uid)).await;

        Ok(Json(serde_json::json!({ "success": true })).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `GET /api/sites`: owner's sites with comment counts.
pub async fn list_sites(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let key = keys::sites_list(&user.uid);
        let sites: Vec<SiteWithCount> = state
            .cache
            .get_or_compute(&key, state.config.cache_ttl.site(), || async {
                let sites = state.sites.sites_for_owner(&user.uid).await?;
                let mut listed = Vec::with_capacity(sites.len());
                for site in sites {
                    let comment_count = state.comments.count_for_site(&site.id).await?;
                    listed.push(SiteWithCount {
                        site,
                        comment_count,
                    });
                }
                Ok(listed)
            })
            .await
            .map_err(|e| ApiError::Internal(format!("site list failed: {e}")))?;

        Ok(Json(sites).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `POST /api/sites`: register a new site.
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SitePayload>, JsonRejection>,
) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let Json(body) = payload
            .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
        let input = state
            .validator
            .validate_site(&body)
            .map_err(ApiError::BadRequest)?;

        let site = Site {
            id: Uuid::new_v4().to_string(),
            domain: Some(input.domain),
            owner_id: user.uid.clone(),
            created_at: Utc::now(),
        };
        state
            .sites
            .create_site(site.clone())
            .await
            .map_err(|e| ApiError::Internal(format!("site create failed: {e}")))?;

        debug!(site = %site.id, owner = %user.uid, "site created");

        state.cache.invalidate(&keys::sites_list(&user.uid)).await;
        state.cache.invalidate(&keys::stats(&user.uid)).await;

        Ok(Json(site).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `PUT /api/sites/:id`: update an owned site's domain.
pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<SitePayload>, JsonRejection>,
) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let Json(body) = payload
            .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
        let input = state
            .validator
            .validate_site(&body)
            .map_err(ApiError::BadRequest)?;

        require_owned_site(&state, &id, &user).await?;

        state
            .sites
            .update_domain(&id, &input.domain)
            .await
            .map_err(|e| ApiError::Internal(format!("site update failed: {e}")))?;

        debug!(site = %id, owner = %user.uid, domain = %input.domain, "site domain updated");

        state.cache.invalidate(&keys::sites_list(&user.uid)).await;
        state.cache.invalidate(&keys::site(&id)).await;

        Ok(Json(serde_json::json!({ "success": true })).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `DELETE /api/sites/:id`: delete an owned site.
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        require_owned_site(&state, &id, &user).await?;

        state
            .sites
            .delete_site(&id)
            .await
            .map_err(|e| ApiError::Internal(format!("site delete failed: {e}")))?;

        debug!(site = %id, owner = %user.uid, "site deleted");

        // Every key family that could still name this site.
        state.cache.invalidate(&keys::sites_list(&user.uid)).await;
        state.cache.invalidate(&keys::stats(&user.uid)).await;
        state.cache.invalidate(&keys::site(&id)).await;
        state
            .cache
            .invalidate_pattern(&format!("comments:{id}:*"))
            .await;
        state
            .cache
            .invalidate_pattern(&format!("comments:list:{}:*", user.uid))
            .await;

        Ok(Json(serde_json::json!({ "success": true })).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// `GET /api/dashboard/stats`: owner's aggregate stats.
pub async fn stats(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cors = dashboard_cors(&state, &headers);
    let result = async {
        let user = authenticate(&state, &headers).await?;
        admit(&state, RateClass::Api, &user.uid).await?;

        let key = keys::stats(&user.uid);
        let stats: StatsResponse = state
            .cache
            .get_or_compute(&key, state.config.cache_ttl.stats(), || async {
                let sites = state.sites.sites_for_owner(&user.uid).await?;
                let comments = state.comments.count_for_owner(&user.uid).await?;
                let recent_sites = sites.iter().take(5).cloned().collect();
                Ok(StatsResponse {
                    stats: StatsCounts {
                        sites: sites.len() as u64,
                        comments,
                    },
                    recent_sites,
                })
            })
            .await
            .map_err(|e| ApiError::Internal(format!("stats failed: {e}")))?;

        Ok(Json(stats).into_response())
    }
    .await;

    finish(&state, result, &cors)
}

/// Resolve the bearer token, or fail with 401 before any store access.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    match state.identity.resolve(token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::Unauthorized),
        Err(e) => Err(ApiError::Internal(format!("identity lookup failed: {e}"))),
    }
}

async fn require_owned_site(state: &AppState, id: &str, user: &AuthUser) -> Result<Site, ApiError> {
    state
        .sites
        .site(id)
        .await
        .map_err(|e| ApiError::Internal(format!("site lookup failed: {e}")))?
        .filter(|site| site.owner_id == user.uid)
        .ok_or_else(|| ApiError::NotFound("Site not found or permission denied".to_string()))
}

fn finish(state: &AppState, result: Result<Response, ApiError>, cors: &HeaderMap) -> Response {
    match result {
        Ok(response) => with_headers(response, cors),
        Err(err) => error_response(state, &err, EndpointClass::Authenticated, cors),
    }
}

fn dashboard_cors(state: &AppState, headers: &HeaderMap) -> HeaderMap {
    let origin = screen_origin_header(headers, state.config.max_origin_header_len);
    cors_headers(
        origin.as_deref(),
        EndpointClass::Authenticated,
        &state.config.cors.dashboard_origins,
    )
}
