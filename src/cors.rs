// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CORS header derivation per endpoint class.
//!
//! Public widget endpoints reflect the caller's origin verbatim (never
//! `*`, which would enable uncontrolled cross-site credentialed reads);
//! whether that origin is actually acceptable for the target site is
//! the domain matcher's decision, made separately. Dashboard endpoints
//! only ever allow the configured application origins, with credentials.

use axum::http::{header, HeaderMap, HeaderValue};

/// How strictly an endpoint's CORS headers are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Widget endpoints called from arbitrary registered sites.
    Public,
    /// Dashboard endpoints called from the application's own front-end.
    Authenticated,
}

const PREFLIGHT_MAX_AGE: HeaderValue = HeaderValue::from_static("86400");

/// Response headers for the given origin and endpoint class.
pub fn cors_headers(
    origin: Option<&str>,
    class: EndpointClass,
    dashboard_origins: &[String],
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    match class {
        EndpointClass::Public => {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                reflectable(origin),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            );
        }
        EndpointClass::Authenticated => {
            let allowed = origin.filter(|o| dashboard_origins.iter().any(|a| a == o));
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                reflectable(allowed),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type, Authorization"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }

    headers.insert(header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE);
    headers
}

fn reflectable(origin: Option<&str>) -> HeaderValue {
    origin
        .and_then(|o| HeaderValue::from_str(o).ok())
        .unwrap_or_else(|| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_origin(headers: &HeaderMap) -> &str {
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("missing")
    }

    #[test]
    fn public_reflects_origin_and_never_wildcards() {
        let headers = cors_headers(Some("https://blog.example.com"), EndpointClass::Public, &[]);
        assert_eq!(allow_origin(&headers), "https://blog.example.com");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());

        let headers = cors_headers(None, EndpointClass::Public, &[]);
        assert_eq!(allow_origin(&headers), "");
    }

    #[test]
    fn authenticated_only_allows_the_configured_origins() {
        let allowed = vec!["https://app.example.net".to_string()];

        let headers = cors_headers(
            Some("https://app.example.net"),
            EndpointClass::Authenticated,
            &allowed,
        );
        assert_eq!(allow_origin(&headers), "https://app.example.net");
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );

        let headers = cors_headers(
            Some("https://evil.example.org"),
            EndpointClass::Authenticated,
            &allowed,
        );
        assert_eq!(allow_origin(&headers), "");
    }

    #[test]
    fn both_classes_set_a_preflight_max_age() {
        for class in [EndpointClass::Public, EndpointClass::Authenticated] {
            let headers = cors_headers(Some("https://x.example.com"), class, &[]);
            assert!(headers.get(header::ACCESS_CONTROL_MAX_AGE).is_some());
        }
    }
}
