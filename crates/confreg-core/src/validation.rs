//! Shared input checks.

use crate::ConfError;
use crate::primitives::MAX_EMAIL_LENGTH;

/// Trim `value` and check it is non-empty and at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ConfError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(ConfError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text` but an empty value maps to `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ConfError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

/// Normalize and check an email address (`local@domain.tld`).
///
/// Returns the lowercase form. This is a shape check only.
pub fn email(value: &str) -> Result<String, ConfError> {
    let trimmed = value.trim().to_ascii_lowercase();
    let invalid = || ConfError::validation(format!("invalid email address '{}'", value.trim()));

    if trimmed.is_empty() || trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(invalid());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(trimmed)
}
