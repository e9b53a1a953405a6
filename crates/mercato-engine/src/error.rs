//! # Service Error Types
//!
//! What callers of the engine see.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Mapping                                   │
//! │                                                                         │
//! │  CoreError::Validation          → Validation        VALIDATION_ERROR    │
//! │  CoreError::InsufficientStock   → InsufficientStock INSUFFICIENT_STOCK  │
//! │  CoreError::InvalidState        → InvalidState      INVALID_STATE       │
//! │  CoreError::InvalidTransition   → InvalidState      INVALID_STATE       │
//! │  CoreError::NotFound            → NotFound          NOT_FOUND           │
//! │  CoreError::PermissionDenied    → PermissionDenied  PERMISSION_DENIED   │
//! │                                                                         │
//! │  DbError::NotFound              → NotFound          NOT_FOUND           │
//! │  DbError::UniqueViolation       ┐                                       │
//! │  DbError::StaleWrite            ├→ Conflict          CONFLICT           │
//! │  DbError::Busy                  ┘                                       │
//! │  anything else                  → Internal          INTERNAL (logged)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business-rule errors pass through with their detail. Store failures are
//! logged with full context and returned with a generic message.

use serde::Serialize;
use thiserror::Error;

use mercato_core::{CoreError, UsageKind, ValidationError};
use mercato_db::DbError;

/// Result type for engine operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Lost a write race or hit a uniqueness rule. Retrying may succeed.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Role {role} is not allowed to {permission}")]
    PermissionDenied { role: String, permission: String },

    #[error("Usage limit exceeded for {kind}: {reason}")]
    UsageLimitExceeded { kind: UsageKind, reason: String },

    /// Details are in the log, not in the message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    InvalidState,
    NotFound,
    Conflict,
    PermissionDenied,
    UsageLimitExceeded,
    Internal,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            ServiceError::InvalidState(_) => ErrorCode::InvalidState,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Conflict(_) => ErrorCode::Conflict,
            ServiceError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            ServiceError::UsageLimitExceeded { .. } => ErrorCode::UsageLimitExceeded,
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ServiceError::Validation(e),
            CoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ServiceError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            CoreError::InvalidState(reason) => ServiceError::InvalidState(reason),
            e @ CoreError::InvalidTransition { .. } => ServiceError::InvalidState(e.to_string()),
            CoreError::NotFound { entity, id } => ServiceError::not_found(entity, id),
            CoreError::PermissionDenied { role, permission } => {
                ServiceError::PermissionDenied { role, permission }
            }
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, .. } => {
                ServiceError::Conflict(format!("{} already exists", field))
            }
            e @ DbError::StaleWrite { .. } => {
                tracing::warn!(error = %e, "Write lost a race");
                ServiceError::Conflict(e.to_string())
            }
            DbError::Busy(msg) => {
                tracing::warn!(error = %msg, "Database busy");
                ServiceError::Conflict("database is busy, try again".to_string())
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ServiceError::Internal("database operation failed".to_string())
            }
        }
    }
}
