//! # CMS Content
//!
//! Page content is an opaque JSON object per slug. The core only checks shape
//! and size and keeps a revision counter; rendering is the front end's job.

use crate::primitives::{MAX_CONTENT_BYTES, MAX_SLUG_LENGTH};
use crate::{ConfError, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A stored page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    pub slug: String,
    /// Compact JSON text of the page object.
    pub body: String,
    /// 1 on first write, incremented on every update.
    pub revision: u64,
    pub updated_by: UserId,
    pub updated_at: Timestamp,
}

impl ContentPage {
    /// Parse the stored body back into JSON.
    pub fn body_json(&self) -> Result<serde_json::Value, ConfError> {
        serde_json::from_str(&self.body).map_err(|e| ConfError::SerializationError(e.to_string()))
    }
}

/// Slug and revision of a page, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub slug: String,
    pub revision: u64,
    pub updated_at: Timestamp,
}

impl From<&ContentPage> for PageSummary {
    fn from(page: &ContentPage) -> Self {
        Self {
            slug: page.slug.clone(),
            revision: page.revision,
            updated_at: page.updated_at,
        }
    }
}

/// Check a slug: 1..=64 of `[a-z0-9-]`, no leading or trailing `-`.
pub fn validate_slug(slug: &str) -> Result<(), ConfError> {
    let invalid = |why: &str| ConfError::validation(format!("invalid slug '{slug}': {why}"));
    if slug.is_empty() {
        return Err(invalid("empty"));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(invalid("too long"));
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(invalid("must not start or end with '-'"));
    }
    Ok(())
}

/// Check that `body` is a JSON object within the size limit; return its compact text.
pub fn encode_body(body: &serde_json::Value) -> Result<String, ConfError> {
    if !body.is_object() {
        return Err(ConfError::validation("page body must be a JSON object"));
    }
    let text =
        serde_json::to_string(body).map_err(|e| ConfError::SerializationError(e.to_string()))?;
    if text.len() > MAX_CONTENT_BYTES {
        return Err(ConfError::validation(format!(
            "page body is {} bytes, limit is {}",
            text.len(),
            MAX_CONTENT_BYTES
        )));
    }
    Ok(text)
}
