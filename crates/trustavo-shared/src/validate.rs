//! Input bounds for nicknames, signal bodies and comments.

use crate::constants::{
    CONTENT_MAX_CHARS, CONTENT_MIN_CHARS, NICKNAME_MAX_CHARS, NICKNAME_MIN_CHARS,
};
use crate::error::ValidationError;

/// Trim a nickname and check its length. Returns the trimmed form, which is
/// what gets stored.
pub fn nickname(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(NICKNAME_MIN_CHARS..=NICKNAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::NicknameLength {
            len,
            min: NICKNAME_MIN_CHARS,
            max: NICKNAME_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// Check a signal or comment body. Content is stored as written; the bound
/// applies to the raw character count and whitespace-only bodies are refused.
pub fn content(raw: &str) -> Result<(), ValidationError> {
    let len = raw.chars().count();
    if !(CONTENT_MIN_CHARS..=CONTENT_MAX_CHARS).contains(&len) {
        return Err(ValidationError::ContentLength {
            len,
            min: CONTENT_MIN_CHARS,
            max: CONTENT_MAX_CHARS,
        });
    }
    if raw.trim().is_empty() {
        return Err(ValidationError::ContentBlank);
    }
    Ok(())
}
