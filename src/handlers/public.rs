// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Public widget endpoints: thread fetch and comment submission.
//!
//! Both run the full admission pipeline; any stage may short-circuit to
//! an error response, and every response carries the Public-class CORS
//! headers for the caller's origin.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{admit, error_response, rate_limit_headers, with_headers, AppState};
use crate::cache::keys;
use crate::cors::{cors_headers, EndpointClass};
use crate::error::ApiError;
use crate::limiter::{client_identifier, RateClass};
use crate::models::{Comment, CommentPayload, Site};
use crate::origin::{origin_matches, screen_origin_header};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadQuery {
    pub site_name: Option<String>,
    pub path_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuery {
    pub site_name: Option<String>,
}

/// Preflight for the public endpoints: short-circuits before any other
/// component runs.
pub async fn preflight(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cors = public_cors(&state, &headers);
    with_headers(StatusCode::NO_CONTENT.into_response(), &cors)
}

/// `GET /api/thread?siteName=&pathName=`: fetch a comment thread.
pub async fn thread(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThreadQuery>,
    headers: HeaderMap,
) -> Response {
    let origin = screen_origin_header(&headers, state.config.max_origin_header_len);
    let cors = cors_headers(origin.as_deref(), EndpointClass::Public, &[]);

    match thread_inner(&state, origin.as_deref(), query, &headers).await {
        Ok(response) => with_headers(response, &cors),
        Err(err) => error_response(&state, &err, EndpointClass::Public, &cors),
    }
}

async fn thread_inner(
    state: &AppState,
    origin: Option<&str>,
    query: ThreadQuery,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let identifier = client_identifier(headers);
    let decision = admit(state, RateClass::Thread, &identifier).await?;

    let site_name = query
        .site_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("no siteName".to_string()))?;

    let site = lookup_valid_site(state, &site_name).await?;

    // Reads stay permissive on a missing origin; a present origin must
    // still belong to the registered domain.
    if let (Some(domain), Some(origin)) = (site.domain.as_deref(), origin) {
        if !origin_matches(origin, domain) {
            info!(origin, domain, site = %site.id, "rejecting mismatched origin");
            return Err(ApiError::BadRequest("invalid origin".to_string()));
        }
    }

    let path_name = query.path_name.unwrap_or_default();
    let key = keys::thread(&site.id, &path_name);
    let comments: Vec<Comment> = state
        .cache
        .get_or_compute(&key, state.config.cache_ttl.comments(), || async {
            Ok(state.comments.thread(&site.id, &path_name).await?)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("thread fetch failed: {e}")))?;

    let response = with_headers(Json(comments).into_response(), &rate_limit_headers(&decision));
    Ok(response)
}

/// `POST /api/add[?siteName=]`: submit a comment.
pub async fn add(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddQuery>,
    headers: HeaderMap,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Response {
    let origin = screen_origin_header(&headers, state.config.max_origin_header_len);
    let cors = cors_headers(origin.as_deref(), EndpointClass::Public, &[]);

    match add_inner(&state, origin.as_deref(), query, &headers, payload).await {
        Ok(response) => with_headers(response, &cors),
        Err(err) => error_response(&state, &err, EndpointClass::Public, &cors),
    }
}

async fn add_inner(
    state: &AppState,
    origin: Option<&str>,
    query: AddQuery,
    headers: &HeaderMap,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let identifier = client_identifier(headers);
    let decision = admit(state, RateClass::Comment, &identifier).await?;

    let Json(mut body) = payload
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;

    // An explicit query-string siteName must agree with the body before
    // anything else looks at the request.
    match (&query.site_name, &body.site_name) {
        (Some(from_query), Some(from_body)) if from_query != from_body => {
            return Err(ApiError::BadRequest(
                "query and body siteName is not the same".to_string(),
            ));
        }
        (Some(from_query), None) => body.site_name = Some(from_query.clone()),
        _ => {}
    }

    let input = state
        .validator
        .validate_comment(&body)
        .map_err(ApiError::BadRequest)?;

    // Captcha is only consulted when the caller presents a token; with
    // no secret configured the verifier passes everything.
    if let Some(token) = body.captcha_token.as_deref() {
        if !state.captcha.verify(token).await {
            return Err(ApiError::BadRequest(
                "captcha verification failed".to_string(),
            ));
        }
    }

    let site = lookup_valid_site(state, &input.site_name).await?;
    authorize_write_origin(state, origin, &site)?;

    if let Some(parent_id) = input.parent.as_deref() {
        let parent = state
            .comments
            .comment(parent_id)
            .await
            .map_err(|e| ApiError::Internal(format!("parent lookup failed: {e}")))?;
        let belongs_here = parent
            .map(|p| p.site_id == site.id && p.path_id == input.path_name)
            .unwrap_or(false);
        if !belongs_here {
            return Err(ApiError::BadRequest("parent comment not found".to_string()));
        }
    }

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        site_id: site.id.clone(),
        path_id: input.path_name.clone(),
        message: input.message,
        author: input.author,
        parent: input.parent,
        timestamp: Utc::now(),
        owner_id: site.owner_id.clone(),
    };

    debug!(site = %site.id, path = %comment.path_id, author = %comment.author, "inserting comment");
    state
        .comments
        .insert(comment)
        .await
        .map_err(|e| ApiError::Internal(format!("comment insert failed: {e}")))?;

    // Invalidate before responding so a read right after the write
    // cannot observe the stale thread.
    state
        .cache
        .invalidate(&keys::thread(&site.id, &input.path_name))
        .await;

    let response = with_headers(
        StatusCode::OK.into_response(),
        &rate_limit_headers(&decision),
    );
    Ok(response)
}

async fn lookup_valid_site(state: &AppState, site_name: &str) -> Result<Site, ApiError> {
    super::lookup_site(state, site_name)
        .await?
        .ok_or_else(|| ApiError::BadRequest("invalid site".to_string()))
}

/// Semantic origin authorization for writes.
fn authorize_write_origin(
    state: &AppState,
    origin: Option<&str>,
    site: &Site,
) -> Result<(), ApiError> {
    let Some(domain) = site.domain.as_deref() else {
        return Ok(());
    };

    match origin {
        Some(origin) => {
            if origin_matches(origin, domain) {
                Ok(())
            } else {
                info!(origin, domain, site = %site.id, "rejecting mismatched origin");
                Err(ApiError::BadRequest("invalid origin".to_string()))
            }
        }
        None => {
            // Widgets run in browsers; a write without an Origin header
            // only happens outside one. Development keeps it usable.
            if state.config.mode.is_production() {
                info!(site = %site.id, "rejecting write without origin header");
                Err(ApiError::BadRequest("missing origin header".to_string()))
            } else {
                debug!(site = %site.id, "accepting originless write in development");
                Ok(())
            }
        }
    }
}

fn public_cors(state: &AppState, headers: &HeaderMap) -> HeaderMap {
    let origin = screen_origin_header(headers, state.config.max_origin_header_len);
    cors_headers(origin.as_deref(), EndpointClass::Public, &[])
}
