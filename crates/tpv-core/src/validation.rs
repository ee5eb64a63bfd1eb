//! # Validation Module
//!
//! Input validation for ledger and ticket operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP controller, CLI)                                │
//! │  └── Parsing (Money::from_str)                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Sign / range / length rules, before any state is read             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Closure transitions (closure.rs)                             │
//! │  └── State rules: open/closed, running cash bound                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── CHECK constraints, single-open partial unique index               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a free-text comment (movements, close, ticket note).
pub const MAX_COMMENT_LEN: usize = 255;

/// Maximum length of an article code.
pub const MAX_ARTICLE_CODE_LEN: usize = 20;

/// Maximum discount in basis points (100%).
pub const MAX_DISCOUNT_BPS: u32 = 10_000;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a deposit or withdrawal amount.
///
/// ## Rules
/// - Must be strictly positive
///
/// ```rust
/// use tpv_core::money::Money;
/// use tpv_core::validation::validate_movement_amount;
///
/// assert!(validate_movement_amount(Money::from_cents(1)).is_ok());
/// assert!(validate_movement_amount(Money::zero()).is_err());
/// ```
pub fn validate_movement_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates an operator-declared count at close (final cash / final card).
///
/// Zero is a legitimate count; negative is not.
pub fn validate_declared_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates one part of a sale tender (cash, card or voucher).
pub fn validate_tender_part(field: &str, amount: Money) -> ValidationResult<()> {
    validate_declared_amount(field, amount)
}

/// Validates a line discount in basis points.
pub fn validate_discount_bps(discount_bps: u32) -> ValidationResult<()> {
    if discount_bps > MAX_DISCOUNT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: MAX_DISCOUNT_BPS as i64,
        });
    }
    Ok(())
}

/// Validates a line amount (units sold).
pub fn validate_line_amount(amount: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "line amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an optional comment and returns it trimmed.
///
/// Empty or whitespace-only comments normalize to `None`.
pub fn validate_comment(comment: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(ValidationError::TooLong {
            field: "comment".to_string(),
            max: MAX_COMMENT_LEN,
        });
    }

    Ok(Some(comment.to_string()))
}

/// Validates an article code.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Only ASCII letters, digits, `-` and `_`
pub fn validate_article_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "article code".to_string(),
        });
    }

    if code.len() > MAX_ARTICLE_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "article code".to_string(),
            max: MAX_ARTICLE_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "article code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
