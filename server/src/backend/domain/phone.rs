//! Phone number normalization for notice delivery.
//!
//! Accepted numbers are Uzbek mobile numbers: country code 998 followed by
//! exactly nine digits. Spaces, dashes, parentheses and a leading `+` are
//! ignored; a bare nine-digit local number gets the country code prepended.

use super::errors::DomainError;

const COUNTRY_CODE: &str = "998";
const SUBSCRIBER_DIGITS: usize = 9;

/// Normalize `raw` to `+998XXXXXXXXX`, or reject it
pub fn normalize_phone(raw: &str) -> Result<String, DomainError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::InvalidPhone(raw.to_string()));
    }

    let full = if digits.len() == SUBSCRIBER_DIGITS {
        format!("{}{}", COUNTRY_CODE, digits)
    } else {
        digits.to_string()
    };

    if full.len() != COUNTRY_CODE.len() + SUBSCRIBER_DIGITS || !full.starts_with(COUNTRY_CODE) {
        return Err(DomainError::InvalidPhone(raw.to_string()));
    }

    Ok(format!("+{}", full))
}
