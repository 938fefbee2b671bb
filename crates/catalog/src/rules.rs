//! Stateless field rules shared by the request validators.
//!
//! Every rule takes the wire field name so the message points at what the
//! client actually sent.

use rust_decimal::Decimal;
use vitrine_core::{DomainError, DomainResult};

/// Text must be non-blank and at most `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Optional text: when present, only the length limit applies.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> DomainResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

pub fn non_negative_decimal(field: &str, value: Decimal) -> DomainResult<()> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} must be >= 0")));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} must be >= 0")));
    }
    Ok(())
}

/// ISO-4217 style code: exactly three ASCII letters.
pub fn currency(field: &str, value: &str) -> DomainResult<()> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation(format!(
            "{field} must be a 3-letter currency code"
        )));
    }
    Ok(())
}
