use url::Url;

use crate::error::{AppError, AppResult};

/// Trimmed, non-empty, at least `min_chars` characters.
pub fn required_text(field: &str, value: &str, min_chars: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "is required"));
    }
    if trimmed.chars().count() < min_chars {
        return Err(AppError::validation(
            field,
            format!("must be at least {min_chars} characters long"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text is stored as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required_url(field: &str, value: &str) -> AppResult<String> {
    let value = required_text(field, value, 1)?;
    Url::parse(&value)
        .map_err(|e| AppError::validation(field, format!("is not a valid URL: {e}")))?;
    Ok(value)
}

pub fn optional_url(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    optional_text(value)
        .map(|v| required_url(field, &v))
        .transpose()
}

/// Counts arrive unsigned and are stored as SQLite integers.
pub fn count(field: &str, value: u64) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::validation(field, "is too large"))
}
