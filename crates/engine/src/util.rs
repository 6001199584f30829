//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use sea_orm::DbErr;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// A stored value the engine cannot decode. Reported as a database error,
/// never as bad input.
pub(crate) fn corrupt_value(message: String) -> EngineError {
    EngineError::Database(DbErr::Custom(message))
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| corrupt_value(format!("invalid {label} id: {value}")))
}

/// Trim and NFC-normalize a required free-text field.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.nfc().collect())
}

/// Same as [`normalize_required_text`] but `None`/blank collapses to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.nfc().collect())
}

/// Validate a strictly positive coin amount.
pub(crate) fn require_positive(amount: i64, label: &str) -> ResultEngine<()> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(
            normalize_required_text("  promo ", "reason").unwrap(),
            "promo".to_string()
        );
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(
            normalize_required_text(" \t", "reason").unwrap_err(),
            EngineError::InvalidAmount("reason must not be empty".to_string())
        );
    }

    #[test]
    fn optional_text_collapses_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" admin-1 ")),
            Some("admin-1".to_string())
        );
    }

    #[test]
    fn composed_and_decomposed_forms_match() {
        let composed = normalize_required_text("pūjā", "reason").unwrap();
        let decomposed = normalize_required_text("pu\u{304}ja\u{304}", "reason").unwrap();
        assert_eq!(composed, decomposed);
    }

    #[test]
    fn unreadable_stored_id_is_a_database_error() {
        let err = parse_uuid("not-a-uuid", "booking").unwrap_err();
        assert_eq!(
            err,
            EngineError::Database(DbErr::Custom(
                "invalid booking id: not-a-uuid".to_string()
            ))
        );
    }
}
