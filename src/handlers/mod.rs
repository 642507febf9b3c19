// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface of the service: shared state, router assembly, and the
//! response plumbing both endpoint families use.
//!
//! Every failure mode answers with the CORS headers appropriate for the
//! caller's origin, so browser-side widgets can read error bodies
//! instead of getting an opaque network error.

pub mod dashboard;
pub mod public;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cache::{keys, Cache};
use crate::captcha::CaptchaVerifier;
use crate::config::Config;
use crate::cors::EndpointClass;
use crate::error::ApiError;
use crate::limiter::{RateClass, RateDecision, RateLimiter};
use crate::metrics::Metrics;
use crate::models::Site;
use crate::store::{CommentStore, IdentityProvider, SiteStore};
use crate::validator::Validator;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub cache: Cache,
    pub limiter: RateLimiter,
    pub captcha: CaptchaVerifier,
    pub validator: Validator,
    pub sites: Arc<dyn SiteStore>,
    pub comments: Arc<dyn CommentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub metrics: Arc<Metrics>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let metrics_path = state.config.metrics.path.clone();

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(&metrics_path, get(metrics))
        .route(
            "/api/thread",
            get(public::thread).options(public::preflight),
        )
        .route("/api/add", post(public::add).options(public::preflight))
        // Widget deployments on a bare API domain hit the public
        // endpoints without the /api prefix.
        .route("/thread", get(public::thread).options(public::preflight))
        .route("/add", post(public::add).options(public::preflight))
        .route(
            "/api/comments",
            get(dashboard::list_comments).options(dashboard::preflight),
        )
        .route(
            "/api/comments/:id",
            delete(dashboard::delete_comment).options(dashboard::preflight),
        )
        .route(
            "/api/sites",
            get(dashboard::list_sites)
                .post(dashboard::create_site)
                .options(dashboard::preflight),
        )
        .route(
            "/api/sites/:id",
            put(dashboard::update_site)
                .delete(dashboard::delete_site)
                .options(dashboard::preflight),
        )
        .route(
            "/api/dashboard/stats",
            get(dashboard::stats).options(dashboard::preflight),
        )
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "comment-widget-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.metrics.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        state.metrics.render(),
    )
        .into_response()
}

/// Count every response by endpoint and status. Uses the matched route
/// pattern so path parameters do not explode label cardinality.
async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let response = next.run(request).await;
    state
        .metrics
        .requests
        .with_label_values(&[&endpoint, response.status().as_str()])
        .inc();
    response
}

/// Append CORS (and other) headers to an assembled response.
pub fn with_headers(mut response: Response, headers: &HeaderMap) -> Response {
    response.headers_mut().extend(headers.clone());
    response
}

/// `X-RateLimit-*` headers for an admission decision; empty when the
/// limiter is failing open.
pub fn rate_limit_headers(decision: &RateDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let (limit, remaining, reset_at) = match decision {
        RateDecision::Allowed {
            limit,
            remaining,
            reset_at,
        } => (*limit, *remaining, *reset_at),
        RateDecision::Limited {
            limit, reset_at, ..
        } => (*limit, 0, *reset_at),
        RateDecision::Unenforced => return headers,
    };

    insert_number(&mut headers, "x-ratelimit-limit", limit as u64);
    insert_number(&mut headers, "x-ratelimit-remaining", remaining as u64);
    insert_number(&mut headers, "x-ratelimit-reset", reset_at.timestamp().max(0) as u64);

    if let RateDecision::Limited { retry_after, .. } = decision {
        insert_number(
            &mut headers,
            "retry-after",
            retry_after.as_secs().max(1),
        );
    }
    headers
}

fn insert_number(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}

/// Render a taxonomy error for the given endpoint class, with CORS.
///
/// Public endpoints answer with plain-text bodies; dashboard endpoints
/// with `{"error": ...}` JSON. `Internal` detail goes to the log and a
/// fixed body goes to the client.
pub fn error_response(state: &AppState, err: &ApiError, class: EndpointClass, cors: &HeaderMap) -> Response {
    let status = err.status();

    if let ApiError::Internal(detail) = err {
        error!(%status, detail = %detail, "request failed");
    }
    if let ApiError::RateLimited { .. } = err {
        let label = match class {
            EndpointClass::Public => "public",
            EndpointClass::Authenticated => "api",
        };
        state.metrics.rate_limited.with_label_values(&[label]).inc();
    }

    let message = match err {
        ApiError::Internal(_) => "internal server error".to_string(),
        ApiError::RateLimited { .. } => "too many requests".to_string(),
        other => other.to_string(),
    };

    let mut response = match class {
        EndpointClass::Public => (status, message).into_response(),
        EndpointClass::Authenticated => {
            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
    };

    if let ApiError::RateLimited {
        limit,
        reset_at,
        retry_after,
    } = err
    {
        let decision = RateDecision::Limited {
            limit: *limit,
            reset_at: *reset_at,
            retry_after: *retry_after,
        };
        response = with_headers(response, &rate_limit_headers(&decision));
    }

    with_headers(response, cors)
}

/// Turn a limiter decision into the pipeline's 429 error.
pub fn limited_error(decision: &RateDecision) -> Option<ApiError> {
    match decision {
        RateDecision::Limited {
            limit,
            reset_at,
            retry_after,
        } => Some(ApiError::RateLimited {
            limit: *limit,
            reset_at: *reset_at,
            retry_after: *retry_after,
        }),
        _ => None,
    }
}

/// Look up a site through the cache, filtering out records that cannot
/// authorize anything (no domain and no owner).
pub async fn lookup_site(state: &AppState, site_name: &str) -> Result<Option<Site>, ApiError> {
    let key = keys::site(site_name);
    let site = state
        .cache
        .get_or_compute_opt(&key, state.config.cache_ttl.site(), || async {
            Ok(state.sites.site(site_name).await?)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("site lookup failed: {e}")))?;
    Ok(site.filter(Site::is_usable))
}

/// Admit or reject a request against one rate-limit class.
pub async fn admit(
    state: &AppState,
    class: RateClass,
    identifier: &str,
) -> Result<RateDecision, ApiError> {
    let decision = state.limiter.admit(class, identifier).await;
    match limited_error(&decision) {
        Some(err) => Err(err),
        None => Ok(decision),
    }
}
