//! # Stock Service
//!
//! Every quantity change is a pair written in one unit of work:
//!
//! ```text
//! StockMovement::new(..)          validates qty > 0, reason fits type
//! uow.stock().require(..)         read under the write lock
//! stock.reserve(qty)?             core rule, e.g. InsufficientStock
//! uow.stock().update(&mut stock)  version guard
//! uow.movements().insert(..)      ledger entry
//! ```
//!
//! | Operation  | Stock call  | Movement              |
//! |------------|-------------|-----------------------|
//! | add        | `add`       | in / purchase, return, adjustment |
//! | remove     | `remove`    | out / damage, expiry, adjustment |
//! | reserve    | `reserve`   | reserved / reservation |
//! | release    | `release`   | released / release     |
//! | confirm    | `confirm`   | out / sale             |

use serde::{Deserialize, Serialize};
use tracing::info;

use mercato_core::{
    Actor, AuditEvent, MovementReason, MovementType, Permission, Stock, StockMovement,
    ValidationError,
};
use mercato_db::{Page, RepositoryAccess, UnitOfWork};

use crate::error::ServiceResult;
use crate::Engine;

// =============================================================================
// Stock Changes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StockOp {
    Add,
    Remove,
    Reserve,
    Release,
    Confirm,
}

impl StockOp {
    fn movement_type(self) -> MovementType {
        match self {
            StockOp::Add => MovementType::In,
            StockOp::Remove | StockOp::Confirm => MovementType::Out,
            StockOp::Reserve => MovementType::Reserved,
            StockOp::Release => MovementType::Released,
        }
    }

    fn apply(self, stock: &mut Stock, qty: i64) -> mercato_core::CoreResult<()> {
        match self {
            StockOp::Add => stock.add(qty),
            StockOp::Remove => stock.remove(qty),
            StockOp::Reserve => stock.reserve(qty),
            StockOp::Release => stock.release(qty),
            StockOp::Confirm => stock.confirm(qty),
        }
    }
}

pub(crate) struct StockChange<'a> {
    pub product_id: &'a str,
    pub op: StockOp,
    pub reason: MovementReason,
    pub quantity: i64,
    pub reference: &'a str,
    pub notes: Option<&'a str>,
}

/// Applies one change and its ledger entry inside `uow`. Returns the stock
/// before and after.
pub(crate) async fn apply_stock_change(
    uow: &mut UnitOfWork,
    actor: &Actor,
    change: StockChange<'_>,
) -> ServiceResult<(Stock, Stock)> {
    let mut movement = StockMovement::new(
        &actor.tenant_id,
        change.product_id,
        change.op.movement_type(),
        change.reason,
        change.quantity,
        change.reference,
        &actor.user_id,
    )?;
    if let Some(notes) = change.notes {
        movement = movement.with_notes(notes);
    }

    let mut stock = uow.stock().require(&actor.tenant_id, change.product_id).await?;
    let before = stock.clone();

    change.op.apply(&mut stock, change.quantity)?;

    uow.stock().update(&mut stock).await?;
    uow.movements().insert(&movement).await?;

    Ok((before, stock))
}

// =============================================================================
// Stock Service
// =============================================================================

/// A manual adjustment. Positive deltas are inbound, negative outbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub delta: i64,
    pub reason: MovementReason,
    pub reference: String,
    pub notes: Option<String>,
}

pub struct StockService<'e> {
    engine: &'e Engine,
}

impl<'e> StockService<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        StockService { engine }
    }

    /// Adds or removes on-hand stock with a ledger entry.
    ///
    /// ## Errors
    /// - `Validation` for a zero delta, a reason that does not fit the
    ///   direction, or an addition that would push the total past `i64::MAX`
    /// - `InsufficientStock` when removing more than is available
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        adjustment: &StockAdjustment,
    ) -> ServiceResult<Stock> {
        actor.authorize(Permission::AdjustStock)?;

        if adjustment.delta == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }

        let op = if adjustment.delta > 0 {
            StockOp::Add
        } else {
            StockOp::Remove
        };

        let mut uow = self.engine.database().begin().await?;
        let (before, after) = apply_stock_change(
            &mut uow,
            actor,
            StockChange {
                product_id: &adjustment.product_id,
                op,
                reason: adjustment.reason,
                quantity: adjustment.delta.saturating_abs(),
                reference: &adjustment.reference,
                notes: adjustment.notes.as_deref(),
            },
        )
        .await?;
        uow.commit().await?;

        info!(
            product_id = %adjustment.product_id,
            delta = adjustment.delta,
            reason = %adjustment.reason,
            available = after.available_qty(),
            "Stock adjusted"
        );
        self.audit(actor, "stock.adjusted", &before, &after).await;

        Ok(after)
    }

    /// Holds units for a reference outside any sale, such as a layaway or
    /// a transfer. Sales reserve through their own line operations.
    ///
    /// Reservations are pooled per product, not per reference: the direct
    /// release and confirm calls below can consume units a pending sale
    /// holds, after which that sale cannot complete.
    pub async fn reserve_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        reference: &str,
    ) -> ServiceResult<Stock> {
        self.reservation(
            actor,
            product_id,
            StockOp::Reserve,
            MovementReason::Reservation,
            quantity,
            reference,
        )
        .await
    }

    /// Returns units held by [`reserve_stock`](Self::reserve_stock).
    pub async fn release_reserved_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        reference: &str,
    ) -> ServiceResult<Stock> {
        self.reservation(
            actor,
            product_id,
            StockOp::Release,
            MovementReason::Release,
            quantity,
            reference,
        )
        .await
    }

    /// Turns units held by [`reserve_stock`](Self::reserve_stock) into an
    /// outbound sale movement.
    pub async fn confirm_reserved_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        reference: &str,
    ) -> ServiceResult<Stock> {
        self.reservation(
            actor,
            product_id,
            StockOp::Confirm,
            MovementReason::Sale,
            quantity,
            reference,
        )
        .await
    }

    async fn reservation(
        &self,
        actor: &Actor,
        product_id: &str,
        op: StockOp,
        reason: MovementReason,
        quantity: i64,
        reference: &str,
    ) -> ServiceResult<Stock> {
        actor.authorize(Permission::ManageReservations)?;

        let mut uow = self.engine.database().begin().await?;
        let (before, after) = apply_stock_change(
            &mut uow,
            actor,
            StockChange {
                product_id,
                op,
                reason,
                quantity,
                reference,
                notes: None,
            },
        )
        .await?;
        uow.commit().await?;

        info!(
            product_id = %product_id,
            op = ?op,
            quantity,
            reference = %reference,
            available = after.available_qty(),
            reserved = after.reserved_qty(),
            "Reservation updated"
        );
        let action = match op {
            StockOp::Reserve => "stock.reserved",
            StockOp::Release => "stock.released",
            _ => "stock.confirmed",
        };
        self.audit(actor, action, &before, &after).await;

        Ok(after)
    }

    /// Sets the low-stock threshold. Records no movement.
    pub async fn set_reorder_level(
        &self,
        actor: &Actor,
        product_id: &str,
        level: i64,
    ) -> ServiceResult<Stock> {
        actor.authorize(Permission::AdjustStock)?;

        let mut uow = self.engine.database().begin().await?;
        let mut stock = uow.stock().require(&actor.tenant_id, product_id).await?;
        let before = stock.clone();

        stock.set_reorder_level(level)?;
        uow.stock().update(&mut stock).await?;
        uow.commit().await?;

        self.audit(actor, "stock.reorder_level_set", &before, &stock)
            .await;
        Ok(stock)
    }

    pub async fn get_stock(&self, actor: &Actor, product_id: &str) -> ServiceResult<Stock> {
        actor.authorize(Permission::ViewStock)?;

        let mut session = self.engine.database().session().await?;
        Ok(session.stock().require(&actor.tenant_id, product_id).await?)
    }

    pub async fn list_low_stock(&self, actor: &Actor, page: Page) -> ServiceResult<Vec<Stock>> {
        actor.authorize(Permission::ViewStock)?;

        let mut session = self.engine.database().session().await?;
        Ok(session.stock().list_low_stock(&actor.tenant_id, page).await?)
    }

    /// A product's ledger, newest first.
    pub async fn list_movements(
        &self,
        actor: &Actor,
        product_id: &str,
        page: Page,
    ) -> ServiceResult<Vec<StockMovement>> {
        actor.authorize(Permission::ViewStock)?;

        let mut session = self.engine.database().session().await?;
        Ok(session
            .movements()
            .list_for_product(&actor.tenant_id, product_id, page)
            .await?)
    }

    async fn audit(&self, actor: &Actor, action: &str, before: &Stock, after: &Stock) {
        let event = AuditEvent::new(actor, "stock", &after.product_id, action)
            .with_change(Some(before), Some(after));
        self.engine.record_audit(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_movement_types() {
        assert_eq!(StockOp::Add.movement_type(), MovementType::In);
        assert_eq!(StockOp::Confirm.movement_type(), MovementType::Out);
        assert_eq!(StockOp::Release.movement_type(), MovementType::Released);
    }

    #[test]
    fn test_rejected_op_leaves_stock_untouched() {
        let mut stock = Stock::new("t", "p", 3, 0).unwrap();
        let before = stock.clone();
        assert!(StockOp::Remove.apply(&mut stock, 5).is_err());
        assert!(StockOp::Confirm.apply(&mut stock, 1).is_err());
        assert_eq!(stock, before);
    }
}
