//! # Error Types
//!
//! [`ValidationError`] covers malformed input and is checked first.
//! [`CoreError`] covers ledger rule violations against the current state.
//! Both are client errors; tpv-db wraps them in its `LedgerError` next to
//! persistence failures.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations of the cashier ledger.
///
/// Every variant is a client error: retrying the same request against the
/// same state fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Operation attempted against a closure in the wrong lifecycle state.
    ///
    /// ## When This Occurs
    /// - Opening while the latest closure is still open
    /// - Deposit / withdrawal / sale / close / read-state while none is open
    #[error("{expected} cashier was expected: {closure_id}")]
    InvalidState {
        expected: ExpectedState,
        closure_id: String,
    },

    /// Withdrawal exceeds the running cash of the open closure.
    #[error("Not enough cash, you can only withdraw {max_withdrawable}")]
    InsufficientFunds { max_withdrawable: Money },

    /// Entity cannot be found.
    ///
    /// ## When This Occurs
    /// - No cashier closure has ever been created
    /// - A ticket references an unknown article code
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// The lifecycle state an operation required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedState {
    Open,
    Closed,
}

impl std::fmt::Display for ExpectedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedState::Open => write!(f, "Open"),
            ExpectedState::Closed => write!(f, "Close"),
        }
    }
}

impl CoreError {
    /// The latest closure was closed but an open one was required.
    pub fn expected_open(closure_id: impl Into<String>) -> Self {
        CoreError::InvalidState {
            expected: ExpectedState::Open,
            closure_id: closure_id.into(),
        }
    }

    /// The latest closure was open but a closed one was required.
    pub fn expected_closed(closure_id: impl Into<String>) -> Self {
        CoreError::InvalidState {
            expected: ExpectedState::Closed,
            closure_id: closure_id.into(),
        }
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any ledger state is read, so a rejected request never
/// touches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., attaching the same family member twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Attaching `child` under `parent` would make the family tree cyclic.
    #[error("attaching '{child}' under '{parent}' would create a cycle")]
    WouldCreateCycle { parent: String, child: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_messages() {
        assert_eq!(
            CoreError::expected_open("c-1").to_string(),
            "Open cashier was expected: c-1"
        );
        assert_eq!(
            CoreError::expected_closed("c-2").to_string(),
            "Close cashier was expected: c-2"
        );
    }

    #[test]
    fn test_insufficient_funds_carries_maximum() {
        let err = CoreError::InsufficientFunds {
            max_withdrawable: Money::from_cents(7500),
        };
        assert_eq!(err.to_string(), "Not enough cash, you can only withdraw 75.00€");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: amount must be positive");
    }
}
