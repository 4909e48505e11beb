//! Utility functions and helpers.

pub mod http;

/// Whether a value is a non-empty run of ASCII digits.
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_id() {
        assert!(is_numeric_id("123456"));
        assert!(!is_numeric_id(""));
        assert!(!is_numeric_id("abc123"));
        assert!(!is_numeric_id("-12"));
        assert!(!is_numeric_id("１２３"));
    }
}
