//! Validation of user-edited Link attributes.

use crate::{NetworkError, NetworkResult};

/// Lowest speed limit (km/h) accepted by [`parse_speed_limit`].
pub const MIN_SPEED_LIMIT: f64 = 5.0;
/// Highest speed limit (km/h) accepted by [`parse_speed_limit`].
pub const MAX_SPEED_LIMIT: f64 = 200.0;

/// Check that `name` matches `[a-zA-Z_][a-zA-Z_0-9]*`.
pub fn validate_link_name(name: &str) -> NetworkResult<()> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(NetworkError::InvalidLinkName(name.to_owned()))
    }
}

/// Parse a speed limit typed by a user.
///
/// Digits and one decimal separator (`.` or `,`) are accepted; the value
/// must lie in `[5, 200]` km/h.
pub fn parse_speed_limit(text: &str) -> NetworkResult<f64> {
    let invalid = || NetworkError::InvalidSpeedLimit(text.to_owned());
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err(invalid());
    }
    let value: f64 = trimmed.replace(',', ".").parse().map_err(|_| invalid())?;
    if (MIN_SPEED_LIMIT..=MAX_SPEED_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(invalid())
    }
}
