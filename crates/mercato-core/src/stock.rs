//! # Stock Module
//!
//! The quantity invariant for one product's inventory.
//!
//! ## Quantity Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stock Quantities                               │
//! │                                                                         │
//! │   total = available + reserved        (all >= 0, always)                │
//! │                                                                         │
//! │   add(q)      available += q                     total += q             │
//! │   remove(q)   available -= q                     total -= q             │
//! │   reserve(q)  available -= q, reserved += q      total unchanged        │
//! │   release(q)  reserved -= q,  available += q     total unchanged        │
//! │   confirm(q)  reserved -= q                      total -= q             │
//! │                                                                         │
//! │   A rejected operation leaves the value untouched.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here persists. mercato-db writes the new state together with a
//! `StockMovement` describing the change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_non_negative, validate_positive_qty};

// =============================================================================
// Stock
// =============================================================================

/// Materialized inventory summary for one product of one tenant.
///
/// Quantities are private: they only change through the operations below,
/// which keep `total == available + reserved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Stock {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    available_qty: i64,
    reserved_qty: i64,
    total_qty: i64,
    reorder_level: i64,
    /// Optimistic write guard, bumped by every persisted update.
    pub version: i64,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Creates the stock row for a new product.
    ///
    /// The initial quantity is all available; the caller records the
    /// matching inbound movement when it is non-zero.
    pub fn new(
        tenant_id: &str,
        product_id: &str,
        initial_qty: i64,
        reorder_level: i64,
    ) -> CoreResult<Self> {
        validate_non_negative("initial quantity", initial_qty)?;
        validate_non_negative("reorder level", reorder_level)?;

        let now = Utc::now();
        Ok(Stock {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            product_id: product_id.to_string(),
            available_qty: initial_qty,
            reserved_qty: 0,
            total_qty: initial_qty,
            reorder_level,
            version: 0,
            last_movement_at: (initial_qty > 0).then_some(now),
            created_at: now,
            updated_at: now,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn available_qty(&self) -> i64 {
        self.available_qty
    }

    #[inline]
    pub fn reserved_qty(&self) -> i64 {
        self.reserved_qty
    }

    #[inline]
    pub fn total_qty(&self) -> i64 {
        self.total_qty
    }

    #[inline]
    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// True when available stock is at or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.available_qty <= self.reorder_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.available_qty == 0
    }

    pub fn can_fulfill_order(&self, qty: i64) -> bool {
        self.available_qty >= qty
    }

    /// Checks the quantity invariant. Rows loaded from the database are
    /// also guarded by CHECK constraints.
    pub fn is_consistent(&self) -> bool {
        self.available_qty >= 0
            && self.reserved_qty >= 0
            && self.available_qty.checked_add(self.reserved_qty) == Some(self.total_qty)
    }

    // -------------------------------------------------------------------------
    // State Transitions
    // -------------------------------------------------------------------------

    /// Receives `qty` units into available stock.
    ///
    /// ## Errors
    /// `OutOfRange` if the new total would not fit in an `i64`.
    pub fn add(&mut self, qty: i64) -> CoreResult<()> {
        validate_positive_qty("quantity", qty)?;
        let available = checked_increase(self.available_qty, qty)?;
        let total = checked_increase(self.total_qty, qty)?;

        self.available_qty = available;
        self.total_qty = total;
        self.touch();
        Ok(())
    }

    /// Takes `qty` units out of available stock.
    ///
    /// ## Errors
    /// `InsufficientStock` if fewer than `qty` units are available.
    pub fn remove(&mut self, qty: i64) -> CoreResult<()> {
        validate_positive_qty("quantity", qty)?;
        self.ensure_available(qty)?;

        self.available_qty -= qty;
        self.total_qty -= qty;
        self.touch();
        Ok(())
    }

    /// Moves `qty` units from available to reserved.
    pub fn reserve(&mut self, qty: i64) -> CoreResult<()> {
        validate_positive_qty("quantity", qty)?;
        self.ensure_available(qty)?;
        let reserved = checked_increase(self.reserved_qty, qty)?;

        self.available_qty -= qty;
        self.reserved_qty = reserved;
        self.touch();
        Ok(())
    }

    /// Moves `qty` units from reserved back to available.
    ///
    /// ## Errors
    /// `InvalidState` if fewer than `qty` units are reserved.
    pub fn release(&mut self, qty: i64) -> CoreResult<()> {
        validate_positive_qty("quantity", qty)?;
        self.ensure_reserved(qty, "release")?;
        let available = checked_increase(self.available_qty, qty)?;

        self.reserved_qty -= qty;
        self.available_qty = available;
        self.touch();
        Ok(())
    }

    /// Consumes `qty` reserved units (the goods leave the store).
    pub fn confirm(&mut self, qty: i64) -> CoreResult<()> {
        validate_positive_qty("quantity", qty)?;
        self.ensure_reserved(qty, "confirm")?;

        self.reserved_qty -= qty;
        self.total_qty -= qty;
        self.touch();
        Ok(())
    }

    /// Changes the reorder threshold. Not a quantity change, so
    /// `last_movement_at` is left alone.
    pub fn set_reorder_level(&mut self, level: i64) -> CoreResult<()> {
        validate_non_negative("reorder level", level)?;

        self.reorder_level = level;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_available(&self, qty: i64) -> CoreResult<()> {
        if self.available_qty < qty {
            return Err(CoreError::InsufficientStock {
                product_id: self.product_id.clone(),
                requested: qty,
                available: self.available_qty,
            });
        }
        Ok(())
    }

    fn ensure_reserved(&self, qty: i64, op: &str) -> CoreResult<()> {
        if self.reserved_qty < qty {
            return Err(CoreError::invalid_state(format!(
                "cannot {} {} units of product {}: only {} reserved",
                op, qty, self.product_id, self.reserved_qty
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        let now = Utc::now();
        self.last_movement_at = Some(now);
        self.updated_at = now;
    }
}

/// Adds `qty` to a stored quantity, rejecting results past `i64::MAX`.
fn checked_increase(current: i64, qty: i64) -> Result<i64, ValidationError> {
    current
        .checked_add(qty)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::MAX.saturating_sub(current),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stock(available: i64) -> Stock {
        Stock::new("tenant-1", "product-1", available, 2).unwrap()
    }

    #[test]
    fn test_new_stock_is_all_available() {
        let s = stock(10);
        assert_eq!(s.available_qty(), 10);
        assert_eq!(s.reserved_qty(), 0);
        assert_eq!(s.total_qty(), 10);
        assert!(s.last_movement_at.is_some());

        assert!(stock(0).last_movement_at.is_none());
        assert!(Stock::new("t", "p", -1, 0).is_err());
    }

    #[test]
    fn test_reserve_then_confirm() {
        let mut s = stock(10);

        s.reserve(4).unwrap();
        assert_eq!((s.available_qty(), s.reserved_qty()), (6, 4));
        assert_eq!(s.total_qty(), 10);

        s.confirm(4).unwrap();
        assert_eq!((s.available_qty(), s.reserved_qty()), (6, 0));
        assert_eq!(s.total_qty(), 6);
    }

    #[test]
    fn test_reserve_then_release_restores() {
        let mut s = stock(10);
        s.reserve(7).unwrap();
        s.release(7).unwrap();
        assert_eq!((s.available_qty(), s.reserved_qty()), (10, 0));
        assert_eq!(s.total_qty(), 10);
    }

    #[test]
    fn test_remove_more_than_available_is_rejected_unchanged() {
        let mut s = stock(3);
        let before = s.clone();

        let err = s.remove(5).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(s, before);
    }

    #[test]
    fn test_release_more_than_reserved_is_invalid_state() {
        let mut s = stock(10);
        s.reserve(2).unwrap();
        let before = s.clone();

        assert!(matches!(s.release(3), Err(CoreError::InvalidState(_))));
        assert!(matches!(s.confirm(3), Err(CoreError::InvalidState(_))));
        assert_eq!(s, before);
    }

    #[test]
    fn test_non_positive_quantities_rejected() {
        let mut s = stock(10);
        for qty in [0, -1] {
            assert!(matches!(
                s.add(qty),
                Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
            ));
            assert!(s.remove(qty).is_err());
            assert!(s.reserve(qty).is_err());
            assert!(s.release(qty).is_err());
            assert!(s.confirm(qty).is_err());
        }
        assert_eq!(s.available_qty(), 10);
    }

    #[test]
    fn test_add_past_i64_max_is_rejected_unchanged() {
        let mut s = stock(1);
        s.reserve(1).unwrap();
        let before = s.clone();

        assert!(matches!(
            s.add(i64::MAX),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(s, before);

        // The largest addition that still fits is accepted.
        s.add(i64::MAX - 1).unwrap();
        assert_eq!(s.total_qty(), i64::MAX);
        assert!(s.is_consistent());
    }

    #[test]
    fn test_queries() {
        let mut s = stock(3);
        assert!(!s.is_low_stock());
        assert!(s.can_fulfill_order(3));
        assert!(!s.can_fulfill_order(4));

        s.remove(1).unwrap();
        assert!(s.is_low_stock());

        s.remove(2).unwrap();
        assert!(s.is_out_of_stock());
    }

    #[test]
    fn test_set_reorder_level() {
        let mut s = stock(3);
        let stamped = s.last_movement_at;

        s.set_reorder_level(5).unwrap();
        assert_eq!(s.reorder_level(), 5);
        assert_eq!(s.last_movement_at, stamped);
        assert!(s.set_reorder_level(-1).is_err());
    }

    // -------------------------------------------------------------------------
    // Property Tests
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Add(i64),
        Remove(i64),
        Reserve(i64),
        Release(i64),
        Confirm(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-2i64..50).prop_map(Op::Add),
            (-2i64..50).prop_map(Op::Remove),
            (-2i64..50).prop_map(Op::Reserve),
            (-2i64..50).prop_map(Op::Release),
            (-2i64..50).prop_map(Op::Confirm),
        ]
    }

    fn apply(s: &mut Stock, op: &Op) -> CoreResult<()> {
        match *op {
            Op::Add(q) => s.add(q),
            Op::Remove(q) => s.remove(q),
            Op::Reserve(q) => s.reserve(q),
            Op::Release(q) => s.release(q),
            Op::Confirm(q) => s.confirm(q),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn prop_quantities_stay_consistent(
            initial in 0i64..100,
            ops in prop::collection::vec(op_strategy(), 0..40),
        ) {
            let mut s = stock(initial);

            for op in &ops {
                let before = s.clone();
                if apply(&mut s, op).is_err() {
                    prop_assert_eq!(&s, &before);
                }
                prop_assert!(s.is_consistent());
            }
        }

        #[test]
        fn prop_huge_quantities_never_overflow(
            initial in 0i64..1_000,
            ops in prop::collection::vec(
                prop_oneof![
                    (i64::MAX - 1_000..=i64::MAX).prop_map(Op::Add),
                    (1i64..1_000).prop_map(Op::Add),
                    (i64::MAX - 1_000..=i64::MAX).prop_map(Op::Reserve),
                    (i64::MAX - 1_000..=i64::MAX).prop_map(Op::Release),
                    (1i64..1_000).prop_map(Op::Reserve),
                    (1i64..1_000).prop_map(Op::Release),
                ],
                0..20,
            ),
        ) {
            let mut s = stock(initial);

            for op in &ops {
                let before = s.clone();
                if apply(&mut s, op).is_err() {
                    prop_assert_eq!(&s, &before);
                }
                prop_assert!(s.is_consistent());
            }
        }

        #[test]
        fn prop_reserve_release_round_trip(initial in 0i64..100, n in 1i64..100) {
            let mut s = stock(initial);
            prop_assume!(n <= initial);

            s.reserve(n).unwrap();
            s.release(n).unwrap();
            prop_assert_eq!(s.available_qty(), initial);
            prop_assert_eq!(s.reserved_qty(), 0);
        }
    }
}
