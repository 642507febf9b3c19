// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request-level error taxonomy.
//!
//! Internal detail never reaches a client: `Internal` carries context
//! for logging only, and the rendered body is a fixed string per
//! taxonomy entry.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// The error taxonomy every handler maps failures into.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed JSON, failed validation, ambiguous or unauthorized-origin
    /// request; the message is safe to return verbatim.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid bearer token on a dashboard route.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource missing or not owned by the caller; the wording
    /// deliberately does not reveal which.
    #[error("{0}")]
    NotFound(String),

    /// Sliding-window quota exhausted for the caller.
    #[error("too many requests")]
    RateLimited {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after: Duration,
    },

    /// Store or other upstream failure; the message is internal context
    /// for logging and is never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
