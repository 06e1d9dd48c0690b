//! SKU syntax rules.
//!
//! SKUs and SKU prefixes end up in URLs and in generated variant SKUs, so they
//! are restricted to ASCII letters, digits, `-` and `_`.

use forgecart_core::{DomainError, DomainResult};

/// `true` when `s` is non-empty and only contains `[A-Za-z0-9_-]`.
pub fn is_restricted_string(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn validate_sku(sku: &str) -> DomainResult<()> {
    if is_restricted_string(sku) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "the sku received ({sku}) is invalid"
        )))
    }
}
