//! The `ENCRYPTED(<base64>)` wrapped-ciphertext grammar.
//!
//! This is the sole at-rest representation of an encrypted secret. A value
//! that does not match the grammar is, by convention, legacy plaintext.

/// Prefix of a wrapped ciphertext.
pub const PREFIX: &str = "ENCRYPTED(";

/// Suffix of a wrapped ciphertext.
pub const SUFFIX: char = ')';

/// Returns true when `value` matches the wrapper grammar with a non-empty
/// payload.
#[must_use]
pub fn is_wrapped(value: &str) -> bool {
    value.len() > PREFIX.len() + SUFFIX.len_utf8()
        && value.starts_with(PREFIX)
        && value.ends_with(SUFFIX)
}

/// Wraps a base64 payload.
#[must_use]
pub fn wrap(base64: &str) -> String {
    format!("{PREFIX}{base64}{SUFFIX}")
}

/// Strips the wrapper, returning the inner base64 text, or `None` when the
/// value does not carry the wrapper (the legacy-plaintext case).
#[must_use]
pub fn unwrap(value: &str) -> Option<&str> {
    if is_wrapped(value) {
        Some(&value[PREFIX.len()..value.len() - SUFFIX.len_utf8()])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_round_trips() {
        let wrapped = wrap("AQIDBA==");
        assert_eq!(wrapped, "ENCRYPTED(AQIDBA==)");
        assert!(is_wrapped(&wrapped));
        assert_eq!(unwrap(&wrapped), Some("AQIDBA=="));
    }

    #[test]
    fn plaintext_is_not_wrapped() {
        assert!(!is_wrapped("sk_test_abc123"));
        assert_eq!(unwrap("sk_test_abc123"), None);
    }

    #[test]
    fn empty_payload_is_not_wrapped() {
        assert!(!is_wrapped("ENCRYPTED()"));
        assert_eq!(unwrap("ENCRYPTED()"), None);
    }

    #[test]
    fn partial_wrapper_is_not_wrapped() {
        assert!(!is_wrapped("ENCRYPTED(abc"));
        assert!(!is_wrapped("abc)"));
        assert!(!is_wrapped("ENCRYPTED("));
    }
}
