//! Step input validation
//!
//! Every free-text answer in a conversation goes through one of these
//! parsers before a session detail is recorded. A failure leaves the
//! session at the same topic and the bot asks again.

use lazy_regex::regex_is_match;
use thiserror::Error;

use crate::core::config::session::{MAX_BORROW_DAYS, MAX_NAME_LEN, MAX_TEXT_LEN, MIN_NAME_LEN};

/// Validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Not a positive whole number
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),

    /// Number outside the accepted range
    #[error("{value} is outside {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    /// Not a positive, finite decimal
    #[error("'{0}' is not a valid weight")]
    InvalidWeight(String),

    /// Answer shorter than allowed
    #[error("answer must be at least {min} characters")]
    TooShort { min: usize },

    /// Answer longer than allowed
    #[error("answer must be at most {max} characters")]
    TooLong { max: usize },

    /// Student number is not 5-20 digits
    #[error("'{0}' is not a valid student number")]
    InvalidNim(String),

    /// Neither a yes nor a no
    #[error("'{0}' is not a yes/no answer")]
    NotYesNo(String),

    /// Tool id does not exist or has no stock left
    #[error("tool {0} is not available")]
    UnknownTool(i64),

    /// Borrow id does not belong to the user or is not returnable
    #[error("borrow {0} cannot be returned")]
    UnknownBorrow(i64),

    /// Step waits for a photo
    #[error("a photo is expected")]
    ExpectedPhoto,

    /// Finishing a photo step without any photo
    #[error("at least one photo is required")]
    NoPhotos,

    /// Unrecognised tool field name in the edit flow
    #[error("'{0}' is not an editable field")]
    UnknownField(String),

    /// Step only accepts text
    #[error("a text answer is expected")]
    ExpectedText,
}

/// Parses a database id typed by the user (`12`, `#12`).
pub fn parse_id(text: &str) -> Result<i64, ValidationError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidNumber(trimmed.to_string())),
    }
}

/// Parses a borrow period in days (1..=MAX_BORROW_DAYS).
pub fn parse_duration_days(text: &str) -> Result<i64, ValidationError> {
    let trimmed = text.trim();
    let days = trimmed
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber(trimmed.to_string()))?;
    check_range(days, 1, MAX_BORROW_DAYS)?;
    Ok(days)
}

/// Parses a batch (angkatan) year within `min_year..=max_year`.
pub fn parse_batch_year(text: &str, min_year: i32, max_year: i32) -> Result<i32, ValidationError> {
    let trimmed = text.trim();
    let year = trimmed
        .parse::<i32>()
        .map_err(|_| ValidationError::InvalidNumber(trimmed.to_string()))?;
    check_range(i64::from(year), i64::from(min_year), i64::from(max_year))?;
    Ok(year)
}

/// Parses a stock count (zero allowed).
pub fn parse_stock(text: &str) -> Result<i64, ValidationError> {
    let trimmed = text.trim();
    let stock = trimmed
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber(trimmed.to_string()))?;
    check_range(stock, 0, 10_000)?;
    Ok(stock)
}

/// Parses a weight in kilograms. Accepts a decimal comma (`1,5`).
pub fn parse_weight(text: &str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    let normalized = trimmed.trim_end_matches("kg").trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight > 0.0 => Ok(weight),
        _ => Err(ValidationError::InvalidWeight(trimmed.to_string())),
    }
}

/// Validates a single-line name (person or tool attribute).
pub fn validate_name(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len < MIN_NAME_LEN {
        return Err(ValidationError::TooShort { min: MIN_NAME_LEN });
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { max: MAX_NAME_LEN });
    }
    Ok(trimmed.to_string())
}

/// Validates a free-text description. Must not be empty.
pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TooShort { min: 1 });
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong { max: MAX_TEXT_LEN });
    }
    Ok(trimmed.to_string())
}

/// Validates a student number (NIM): 5 to 20 digits.
pub fn validate_nim(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if regex_is_match!(r"^\d{5,20}$", trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidNim(trimmed.to_string()))
    }
}

/// Maps a confirmation answer to yes/no. Indonesian and English words are accepted.
pub fn parse_yes_no(text: &str) -> Result<bool, ValidationError> {
    let normalized = text.trim().to_lowercase();
    match normalized.as_str() {
        "ya" | "iya" | "y" | "yes" | "ok" | "oke" | "setuju" | "benar" => Ok(true),
        "tidak" | "tdk" | "gak" | "nggak" | "n" | "no" | "batal" | "salah" => Ok(false),
        _ => Err(ValidationError::NotYesNo(text.trim().to_string())),
    }
}

/// Whether the answer closes a repeatable step (photo uploads, field edits).
pub fn is_done_keyword(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "selesai" | "done" | "skip" | "lewati" | "cukup"
    )
}

fn check_range(value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { value, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12"), Ok(12));
        assert_eq!(parse_id(" #7 "), Ok(7));
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("bor").is_err());
    }

    #[test]
    fn test_parse_duration_days() {
        assert_eq!(parse_duration_days("30"), Ok(30));
        assert_eq!(
            parse_duration_days("0"),
            Err(ValidationError::OutOfRange {
                value: 0,
                min: 1,
                max: MAX_BORROW_DAYS
            })
        );
        assert!(parse_duration_days("thirty").is_err());
        assert!(parse_duration_days("1000").is_err());
    }

    #[test]
    fn test_parse_batch_year_range() {
        assert_eq!(parse_batch_year("2021", 2000, 2026), Ok(2021));
        assert!(matches!(
            parse_batch_year("1999", 2000, 2026),
            Err(ValidationError::OutOfRange { value: 1999, .. })
        ));
        assert!(parse_batch_year("2030", 2000, 2026).is_err());
        assert!(parse_batch_year("20x1", 2000, 2026).is_err());
    }

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("1.5"), Ok(1.5));
        assert_eq!(parse_weight("2,25"), Ok(2.25));
        assert_eq!(parse_weight("3 kg"), Ok(3.0));
        assert!(parse_weight("0").is_err());
        assert!(parse_weight("NaN").is_err());
        assert!(parse_weight("inf").is_err());
        assert!(parse_weight("heavy").is_err());
    }

    #[test]
    fn test_parse_stock() {
        assert_eq!(parse_stock("0"), Ok(0));
        assert_eq!(parse_stock("15"), Ok(15));
        assert!(parse_stock("-1").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Budi Santoso "), Ok("Budi Santoso".to_string()));
        assert_eq!(validate_name("Al"), Err(ValidationError::TooShort { min: MIN_NAME_LEN }));
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text(" Kalibrasi 2024 "), Ok("Kalibrasi 2024".to_string()));
        assert!(validate_text("   ").is_err());
    }

    #[test]
    fn test_validate_nim() {
        assert_eq!(validate_nim("5025211001"), Ok("5025211001".to_string()));
        assert!(validate_nim("1234").is_err());
        assert!(validate_nim("50252A1001").is_err());
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("yes"), Ok(true));
        assert_eq!(parse_yes_no(" Ya "), Ok(true));
        assert_eq!(parse_yes_no("tidak"), Ok(false));
        assert_eq!(parse_yes_no("no"), Ok(false));
        assert_eq!(parse_yes_no("maybe"), Err(ValidationError::NotYesNo("maybe".to_string())));
    }

    #[test]
    fn test_is_done_keyword() {
        assert!(is_done_keyword("Selesai"));
        assert!(is_done_keyword("done"));
        assert!(!is_done_keyword("not yet"));
    }
}
