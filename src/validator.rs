// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Validation and normalization of untrusted widget payloads.
//!
//! Failures collect every field problem into one joined message; the
//! caller answers 400 with that message as the body, never a partial
//! result. Markup sanitization of the message is a rendering-time
//! contract of the consuming client; this layer guarantees length and
//! charset validity only.

use regex::Regex;

use crate::models::{CommentInput, CommentPayload, SiteInput, SitePayload};

const MAX_SITE_NAME_LEN: usize = 100;
const MAX_PATH_LEN: usize = 500;
const MAX_MESSAGE_LEN: usize = 10_000;
const MAX_AUTHOR_LEN: usize = 100;
const MIN_DOMAIN_LEN: usize = 4;
const MAX_DOMAIN_LEN: usize = 253;

/// Name shown when a commenter leaves the author field empty.
pub const DEFAULT_AUTHOR: &str = "Guest";

/// Payload validator for the public and dashboard write endpoints.
pub struct Validator {
    domain_pattern: Regex,
}

impl Validator {
    pub fn new() -> Self {
        // Dot-separated labels ending in an alphabetic TLD of length >= 2.
        let domain_pattern = Regex::new(r"(?i)^([a-z0-9]+(-[a-z0-9]+)*\.)+[a-z]{2,}$")
            .expect("domain pattern is valid");
        Self { domain_pattern }
    }

    /// Validate and normalize a comment submission.
    pub fn validate_comment(&self, raw: &CommentPayload) -> Result<CommentInput, String> {
        let mut errors = Vec::new();

        let site_name = raw.site_name.as_deref().unwrap_or("").trim().to_string();
        if site_name.is_empty() {
            errors.push("Site ID is required");
        } else if site_name.len() > MAX_SITE_NAME_LEN {
            errors.push("Site ID too long");
        } else if !site_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            errors.push("Invalid site ID format");
        }

        let path_name = raw.path_name.as_deref().unwrap_or("").trim().to_string();
        if path_name.is_empty() {
            errors.push("Path is required");
        } else if path_name.len() > MAX_PATH_LEN {
            errors.push("Path too long");
        } else if !path_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        {
            errors.push("Invalid path characters");
        }

        let message = raw.message.as_deref().unwrap_or("").trim().to_string();
        if message.is_empty() {
            errors.push("Message is required");
        } else if message.len() > MAX_MESSAGE_LEN {
            errors.push("Message too long (max 10000 characters)");
        }

        let author = match raw.author.as_deref().map(str::trim) {
            Some(author) if author.len() > MAX_AUTHOR_LEN => {
                errors.push("Author name too long");
                String::new()
            }
            Some(author) if !author.is_empty() => author.to_string(),
            _ => DEFAULT_AUTHOR.to_string(),
        };

        let parent = raw
            .parent
            .as_deref()
            .map(str::trim)
            .filter(|parent| !parent.is_empty())
            .map(str::to_string);

        if !errors.is_empty() {
            return Err(errors.join(", "));
        }

        Ok(CommentInput {
            site_name,
            path_name,
            message,
            author,
            parent,
        })
    }

    /// Validate and normalize a site registration or domain update.
    pub fn validate_site(&self, raw: &SitePayload) -> Result<SiteInput, String> {
        let mut errors = Vec::new();

        let domain = raw.domain.as_deref().unwrap_or("").trim().to_lowercase();
        if domain.len() < MIN_DOMAIN_LEN {
            errors.push("Domain too short");
        } else if domain.len() > MAX_DOMAIN_LEN {
            errors.push("Domain too long");
        } else if !self.domain_pattern.is_match(&domain) {
            errors.push("Invalid domain format");
        }

        if !errors.is_empty() {
            return Err(errors.join(", "));
        }

        Ok(SiteInput { domain })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
