//! Text normalization and validation helpers.

use validator::ValidationError;

/// Returns true when the value is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Normalizes free-text search input: trimmed and lowercased.
pub fn normalize_search(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Trims an optional text value, mapping blank strings to `None`.
///
/// The store and the JSON boundary both use this so that "unset" has a
/// single representation.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Validates that a name field contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if is_blank(value) {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a name field length after trimming (1 to 100 characters).
pub fn validate_name(value: &str) -> Result<(), ValidationError> {
    validate_not_blank(value)?;
    if value.trim().chars().count() > 100 {
        let mut err = ValidationError::new("name_length");
        err.message = Some("Name must be at most 100 characters".into());
        return Err(err);
    }
    Ok(())
}
