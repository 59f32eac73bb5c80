//! Alias encoding and custom alias validation.
//!
//! Generated aliases are the base-62 form of a monotonically increasing
//! counter, so they are collision-free as long as the counter never repeats.
//! Custom aliases bypass the codec and are checked by
//! [`validate_custom_alias`] instead.

use crate::error::AppError;
use serde_json::json;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u64 = ALPHABET.len() as u64;

pub const MIN_CUSTOM_ALIAS_LEN: usize = 3;
pub const MAX_CUSTOM_ALIAS_LEN: usize = 64;

/// Aliases that collide with service routes.
const RESERVED_ALIASES: &[&str] = &["api", "health", "p", "admin", "static", "favicon.ico"];

/// Encodes `n` in base 62 over `0-9A-Za-z`, most significant symbol first.
///
/// `encode(0)` is the empty string; the counter starts at 1 so this value is
/// never issued as an alias.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(encode(61), "z");
/// assert_eq!(encode(62), "10");
/// ```
pub fn encode(mut n: u64) -> String {
    let mut symbols = Vec::new();
    while n > 0 {
        symbols.push(ALPHABET[(n % BASE) as usize]);
        n /= BASE;
    }
    symbols.reverse();

    symbols.into_iter().map(char::from).collect()
}

/// Whether `alias` names a service route (case-insensitive).
pub fn is_reserved(alias: &str) -> bool {
    RESERVED_ALIASES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(alias))
}

/// Validates a user-provided custom alias.
///
/// # Rules
///
/// - Length: 3-64 characters
/// - Allowed characters: ASCII letters, digits, `_` and `-`
/// - Cannot be a reserved route name (case-insensitive)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_custom_alias(alias: &str) -> Result<(), AppError> {
    if alias.len() < MIN_CUSTOM_ALIAS_LEN || alias.len() > MAX_CUSTOM_ALIAS_LEN {
        return Err(AppError::bad_request(
            "Custom alias must be 3-64 characters",
            json!({ "provided_length": alias.len() }),
        ));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "Custom alias can only contain letters, digits, hyphens and underscores",
            json!({ "alias": alias }),
        ));
    }

    if is_reserved(alias) {
        return Err(AppError::bad_request(
            "This alias is reserved",
            json!({ "alias": alias }),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_encode_zero_is_empty() {
        assert_eq!(encode(0), "");
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(1), "1");
        assert_eq!(encode(10), "A");
        assert_eq!(encode(36), "a");
        assert_eq!(encode(61), "z");
        assert_eq!(encode(62), "10");
        assert_eq!(encode(62 * 62), "100");
    }

    #[test]
    fn test_encode_is_injective() {
        let mut seen = HashSet::new();
        for n in 1..100_000u64 {
            assert!(seen.insert(encode(n)), "duplicate alias for {n}");
        }
    }

    #[test]
    fn test_encode_max() {
        let alias = encode(u64::MAX);
        assert_eq!(alias.len(), 11);
        assert!(alias.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_encode_is_valid_custom_alias_shape() {
        // generated aliases of three or more symbols pass the custom checks too
        assert!(validate_custom_alias(&encode(62 * 62 * 5)).is_ok());
    }

    #[test]
    fn test_validate_accepts_allowed_characters() {
        assert!(validate_custom_alias("abc").is_ok());
        assert!(validate_custom_alias("My_Link-2025").is_ok());
        assert!(validate_custom_alias(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_length() {
        let err = validate_custom_alias("ab").unwrap_err();
        assert!(err.to_string().contains("3-64"));
        assert!(validate_custom_alias(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_rejects_special_characters() {
        assert!(validate_custom_alias("my link").is_err());
        assert!(validate_custom_alias("a/b/c").is_err());
        assert!(validate_custom_alias("ünï").is_err());
    }

    #[test]
    fn test_some_encodings_are_reserved() {
        assert_eq!(encode(51), "p");
        assert!(is_reserved(&encode(51)));
        assert!(!is_reserved(&encode(52)));
    }

    #[test]
    fn test_validate_rejects_reserved() {
        assert!(validate_custom_alias("api").is_err());
        assert!(validate_custom_alias("HEALTH").is_err());
        assert!(matches!(
            validate_custom_alias("admin").unwrap_err(),
            AppError::Validation { .. }
        ));
    }
}
