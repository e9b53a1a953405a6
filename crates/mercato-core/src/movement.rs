//! # Movement Module
//!
//! The append-only stock ledger entry. Every quantity change on a [`Stock`]
//! is paired with exactly one `StockMovement` written in the same
//! transaction. Movements are never updated or deleted; a correction is an
//! opposite movement.
//!
//! ## Type / Reason Pairs
//! ```text
//! in        ← purchase | return | adjustment
//! out       ← sale | damage | expiry | adjustment
//! reserved  ← reservation
//! released  ← release
//! ```
//!
//! [`Stock`]: crate::stock::Stock

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validation::{validate_positive_qty, validate_reference, ValidationResult};

// =============================================================================
// Movement Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Reserved,
    Released,
}

impl MovementType {
    pub const ALL: [MovementType; 4] = [
        MovementType::In,
        MovementType::Out,
        MovementType::Reserved,
        MovementType::Released,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Reserved => "reserved",
            MovementType::Released => "released",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "movement type".to_string(),
                allowed: MovementType::ALL.iter().map(|t| t.to_string()).collect(),
            })
    }
}

// =============================================================================
// Movement Reason
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementReason {
    Purchase,
    Sale,
    Return,
    Damage,
    Expiry,
    Adjustment,
    Reservation,
    Release,
}

impl MovementReason {
    pub const ALL: [MovementReason; 8] = [
        MovementReason::Purchase,
        MovementReason::Sale,
        MovementReason::Return,
        MovementReason::Damage,
        MovementReason::Expiry,
        MovementReason::Adjustment,
        MovementReason::Reservation,
        MovementReason::Release,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "purchase",
            MovementReason::Sale => "sale",
            MovementReason::Return => "return",
            MovementReason::Damage => "damage",
            MovementReason::Expiry => "expiry",
            MovementReason::Adjustment => "adjustment",
            MovementReason::Reservation => "reservation",
            MovementReason::Release => "release",
        }
    }

    /// Whether this reason may accompany the given movement type.
    pub fn fits(&self, movement_type: MovementType) -> bool {
        use MovementReason as R;
        use MovementType as T;

        matches!(
            (movement_type, self),
            (T::In, R::Purchase | R::Return | R::Adjustment)
                | (T::Out, R::Sale | R::Damage | R::Expiry | R::Adjustment)
                | (T::Reserved, R::Reservation)
                | (T::Released, R::Release)
        )
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "movement reason".to_string(),
                allowed: MovementReason::ALL.iter().map(|r| r.to_string()).collect(),
            })
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    /// Always > 0; the direction comes from `movement_type`.
    pub quantity: i64,
    /// Correlation id, e.g. the sale number.
    pub reference: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Builds a validated movement.
    ///
    /// ## Errors
    /// - `MustBePositive` for `quantity <= 0`
    /// - `NotAllowed` when `reason` does not fit `movement_type`
    /// - `Required` for a blank reference
    pub fn new(
        tenant_id: &str,
        product_id: &str,
        movement_type: MovementType,
        reason: MovementReason,
        quantity: i64,
        reference: &str,
        created_by: &str,
    ) -> ValidationResult<Self> {
        validate_positive_qty("quantity", quantity)?;
        validate_reference(reference)?;

        if !reason.fits(movement_type) {
            return Err(ValidationError::NotAllowed {
                field: format!("reason for '{}' movement", movement_type),
                allowed: MovementReason::ALL
                    .iter()
                    .filter(|r| r.fits(movement_type))
                    .map(|r| r.to_string())
                    .collect(),
            });
        }

        Ok(StockMovement {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            product_id: product_id.to_string(),
            movement_type,
            reason,
            quantity,
            reference: reference.trim().to_string(),
            notes: None,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Signed effect on total quantity.
    pub fn total_delta(&self) -> i64 {
        match self.movement_type {
            MovementType::In => self.quantity,
            MovementType::Out => -self.quantity,
            MovementType::Reserved | MovementType::Released => 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(
        t: MovementType,
        r: MovementReason,
        qty: i64,
    ) -> ValidationResult<StockMovement> {
        StockMovement::new("tenant-1", "product-1", t, r, qty, "S-000001", "user-1")
    }

    #[test]
    fn test_valid_movement() {
        let m = movement(MovementType::Reserved, MovementReason::Reservation, 4).unwrap();
        assert_eq!(m.quantity, 4);
        assert_eq!(m.reference, "S-000001");
        assert_eq!(m.total_delta(), 0);
        assert!(m.notes.is_none());
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(movement(MovementType::In, MovementReason::Purchase, 0).is_err());
        assert!(movement(MovementType::In, MovementReason::Purchase, -3).is_err());
    }

    #[test]
    fn test_incoherent_pair_rejected() {
        let err = movement(MovementType::In, MovementReason::Sale, 1).unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
        assert!(movement(MovementType::Reserved, MovementReason::Release, 1).is_err());
    }

    #[test]
    fn test_adjustment_fits_both_directions() {
        assert!(MovementReason::Adjustment.fits(MovementType::In));
        assert!(MovementReason::Adjustment.fits(MovementType::Out));
        assert!(!MovementReason::Adjustment.fits(MovementType::Reserved));
    }

    #[test]
    fn test_parse_closed_enumerations() {
        assert_eq!("released".parse::<MovementType>().unwrap(), MovementType::Released);
        assert_eq!("expiry".parse::<MovementReason>().unwrap(), MovementReason::Expiry);
        assert!("lost".parse::<MovementReason>().is_err());
        assert!("IN".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_total_delta_signs() {
        let out = movement(MovementType::Out, MovementReason::Damage, 2).unwrap();
        assert_eq!(out.total_delta(), -2);
        let inbound = movement(MovementType::In, MovementReason::Return, 2)
            .unwrap()
            .with_notes("customer return");
        assert_eq!(inbound.total_delta(), 2);
        assert_eq!(inbound.notes.as_deref(), Some("customer return"));
    }
}
