// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Captcha verification oracle client (Turnstile-style siteverify).
//!
//! With no secret configured the check always passes, which keeps local
//! and development instances usable. Once a secret is set the check
//! fails closed: an unreachable or misbehaving oracle rejects the
//! request rather than opening a bypass during oracle downtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::CaptchaConfig;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct VerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
}

/// Boolean oracle for captcha tokens.
pub struct CaptchaVerifier {
    secret: Option<String>,
    verify_url: String,
    http: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            secret: config.secret,
            verify_url: config.verify_url,
            http,
        }
    }

    /// Whether a secret is configured and tokens will actually be checked.
    pub fn enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a captcha token against the oracle.
    pub async fn verify(&self, token: &str) -> bool {
        let Some(secret) = &self.secret else {
            return true;
        };

        if token.trim().is_empty() {
            return false;
        }

        let request = VerifyRequest {
            secret,
            response: token,
        };
        match self.http.post(&self.verify_url).json(&request).send().await {
            Ok(response) => match response.json::<VerifyResponse>().await {
                Ok(body) => body.success,
                Err(e) => {
                    warn!(error = %e, "captcha oracle returned an unreadable body, failing closed");
                    false
                }
            },
            Err(e) => {
                warn!(error = %e, "captcha oracle unreachable, failing closed");
                false
            }
        }
    }
}
