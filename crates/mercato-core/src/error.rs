//! # Error Types
//!
//! Domain-specific error types for mercato-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mercato-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  mercato-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  mercato-engine errors                                                  │
//! │  └── ServiceError     - What callers see (with a stable ErrorCode)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, sale, quantities)
//! 3. Errors are enum variants, never String
//! 4. A rejected operation never leaves a half-applied mutation behind

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The orchestration layer passes
/// them through to callers untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough available stock for a removal or reservation.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to sale (qty: 5)
    ///      │
    ///      ▼
    /// Reserve on Stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, requested: 5, available: 3 }
    /// ```
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// The entity is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Mutating a completed or cancelled sale
    /// - Releasing or confirming more than is reserved
    /// - Completing a sale without items or payment
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A product status change that the lifecycle does not allow.
    #[error("Cannot change product status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Referenced line or entity is absent from the aggregate.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor's role does not grant the permission.
    #[error("Role {role} is not allowed to {permission}")]
    PermissionDenied { role: String, permission: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidState`].
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        CoreError::InvalidState(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is touched.
#[derive(Debug, Error)]
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

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Payment does not cover the sale total.
    #[error("Payment of {paid} cents does not cover total of {total} cents")]
    InsufficientPayment { paid: i64, total: i64 },

    /// Discount larger than the subtotal it applies to.
    #[error("Discount of {discount} cents exceeds subtotal of {subtotal} cents")]
    DiscountExceedsSubtotal { discount: i64, subtotal: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: requested 5, available 3"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::InsufficientPayment {
            paid: 5000,
            total: 9900,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 5000 cents does not cover total of 9900 cents"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
