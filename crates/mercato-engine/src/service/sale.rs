//! # Sale Service
//!
//! ## Stock Reservations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Sale line ↔ Stock reservation                           │
//! │                                                                         │
//! │  add_sale_item(qty)        reserve qty         reserved / reservation   │
//! │  update_sale_item(new)     reserve or release  by the delta             │
//! │  remove_sale_item          release qty         released / release       │
//! │                                                                         │
//! │  complete_sale             re-check the plan,  ┐                        │
//! │                            confirm each line   │                        │
//! │                            in line order,      │ one transaction        │
//! │                            bump sales counter, │                        │
//! │                            status → completed  ┘                        │
//! │                                                                         │
//! │  cancel_sale               release each line   released / release      │
//! │                            status → cancelled  (one transaction)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Through these operations a pending sale holds its line quantities in
//! reserve, and two sales competing for the last units are decided when the
//! second one tries to reserve. Releasing the same units directly through
//! `StockService` breaks that pairing, and the sale's completion then fails
//! on the short line. Every movement carries the sale number as its
//! reference.
//!
//! `create_sale` only gates on the counter as it stands. Pending sales do
//! not count, so `complete_sale` checks the limit again inside its
//! transaction, under the write lock, before bumping the counter.

use tracing::{debug, info};

use mercato_core::{
    Actor, AuditEvent, Money, MovementReason, PaymentMethod, Permission, Sale, SaleStatus,
    TaxRate, UsageKind,
};
use mercato_db::{Page, RepositoryAccess, UnitOfWork};

use crate::error::{ServiceError, ServiceResult};
use crate::service::stock::{apply_stock_change, StockChange, StockOp};
use crate::Engine;

pub struct SaleService<'e> {
    engine: &'e Engine,
}

impl<'e> SaleService<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        SaleService { engine }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a pending sale with the tenant's next sale number.
    pub async fn create_sale(&self, actor: &Actor) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;
        self.engine.gate().can_process_sale(&actor.tenant_id).await?;

        let mut uow = self.engine.database().begin().await?;
        let number = uow
            .sales()
            .next_sale_number(&actor.tenant_id, self.engine.sale_prefix())
            .await?;
        let sale = Sale::new(&actor.tenant_id, &number, &actor.user_id);
        uow.sales().insert(&sale).await?;
        uow.commit().await?;

        info!(sale_id = %sale.id, sale_number = %sale.sale_number, "Sale created");
        self.audit(actor, "sale.created", None, &sale).await;

        Ok(sale)
    }

    /// Confirms every reservation and finalizes the sale.
    ///
    /// Lines are confirmed in line order. If any line fails, or the plan's
    /// monthly sales are used up, nothing is written: the sale stays
    /// pending and every stock row keeps its reservation.
    pub async fn complete_sale(&self, actor: &Actor, sale_id: &str) -> ServiceResult<Sale> {
        actor.authorize(Permission::CompleteSales)?;

        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        sale.complete()?;

        let subscription = uow
            .subscriptions()
            .get(&actor.tenant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subscription", &actor.tenant_id))?;
        self.engine
            .gate()
            .enforce(&subscription, UsageKind::SalesThisMonth)?;

        let mut lines: Vec<_> = sale.items.iter().collect();
        lines.sort_by_key(|item| item.line_no);
        for item in lines {
            apply_stock_change(
                &mut uow,
                actor,
                StockChange {
                    product_id: &item.product_id,
                    op: StockOp::Confirm,
                    reason: MovementReason::Sale,
                    quantity: item.quantity,
                    reference: &sale.sale_number,
                    notes: None,
                },
            )
            .await?;
            debug!(sale_number = %sale.sale_number, line_no = item.line_no, "Line confirmed");
        }

        uow.subscriptions()
            .increment(&actor.tenant_id, UsageKind::SalesThisMonth, 1)
            .await?;
        uow.sales().update(&sale).await?;
        uow.commit().await?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            total = %sale.total(),
            items = sale.items.len(),
            "Sale completed"
        );
        self.audit(actor, "sale.completed", Some(&before), &sale).await;

        Ok(sale)
    }

    /// Abandons a pending sale and releases its reservations.
    pub async fn cancel_sale(&self, actor: &Actor, sale_id: &str) -> ServiceResult<Sale> {
        actor.authorize(Permission::CancelSales)?;

        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        sale.cancel()?;

        for item in &sale.items {
            apply_stock_change(
                &mut uow,
                actor,
                StockChange {
                    product_id: &item.product_id,
                    op: StockOp::Release,
                    reason: MovementReason::Release,
                    quantity: item.quantity,
                    reference: &sale.sale_number,
                    notes: Some("sale cancelled"),
                },
            )
            .await?;
        }

        uow.sales().update(&sale).await?;
        uow.commit().await?;

        info!(sale_id = %sale.id, sale_number = %sale.sale_number, "Sale cancelled");
        self.audit(actor, "sale.cancelled", Some(&before), &sale).await;

        Ok(sale)
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Adds `quantity` of a product and reserves it.
    pub async fn add_sale_item(
        &self,
        actor: &Actor,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;

        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        let product = uow
            .products()
            .get(&actor.tenant_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let item = sale.add_item(&product, quantity)?;
        apply_stock_change(
            &mut uow,
            actor,
            StockChange {
                product_id,
                op: StockOp::Reserve,
                reason: MovementReason::Reservation,
                quantity,
                reference: &sale.sale_number,
                notes: None,
            },
        )
        .await?;

        uow.sale_items().save(&item).await?;
        uow.sales().update(&sale).await?;
        uow.commit().await?;

        info!(
            sale_number = %sale.sale_number,
            sku = %product.sku,
            quantity,
            line_quantity = item.quantity,
            "Sale item added"
        );
        self.audit(actor, "sale.item_added", Some(&before), &sale).await;

        Ok(sale)
    }

    /// Sets the quantity of the line for `product_id`, reserving or
    /// releasing the difference.
    pub async fn update_sale_item(
        &self,
        actor: &Actor,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;

        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        let change = sale.update_item_quantity(product_id, quantity)?;
        let delta = change.delta();

        if delta != 0 {
            let (op, reason) = if delta > 0 {
                (StockOp::Reserve, MovementReason::Reservation)
            } else {
                (StockOp::Release, MovementReason::Release)
            };
            apply_stock_change(
                &mut uow,
                actor,
                StockChange {
                    product_id,
                    op,
                    reason,
                    quantity: delta.abs(),
                    reference: &sale.sale_number,
                    notes: None,
                },
            )
            .await?;
        }

        uow.sale_items().save(&change.item).await?;
        uow.sales().update(&sale).await?;
        uow.commit().await?;

        info!(
            sale_number = %sale.sale_number,
            sku = %change.item.product_sku,
            previous = change.previous,
            quantity,
            "Sale item updated"
        );
        self.audit(actor, "sale.item_updated", Some(&before), &sale).await;

        Ok(sale)
    }

    /// Removes the line for `product_id` and releases its reservation.
    pub async fn remove_sale_item(
        &self,
        actor: &Actor,
        sale_id: &str,
        product_id: &str,
    ) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;

        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        let removed = sale.remove_item(product_id)?;
        apply_stock_change(
            &mut uow,
            actor,
            StockChange {
                product_id,
                op: StockOp::Release,
                reason: MovementReason::Release,
                quantity: removed.quantity,
                reference: &sale.sale_number,
                notes: None,
            },
        )
        .await?;

        uow.sale_items().delete(&actor.tenant_id, &removed.id).await?;
        uow.sales().update(&sale).await?;
        uow.commit().await?;

        info!(sale_number = %sale.sale_number, sku = %removed.product_sku, "Sale item removed");
        self.audit(actor, "sale.item_removed", Some(&before), &sale).await;

        Ok(sale)
    }

    // =========================================================================
    // Pricing & Payment
    // =========================================================================

    pub async fn apply_discount(
        &self,
        actor: &Actor,
        sale_id: &str,
        amount: Money,
    ) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;
        self.update_header(actor, sale_id, "sale.discount_applied", |sale| {
            Ok(sale.apply_discount(amount)?)
        })
        .await
    }

    pub async fn apply_tax(&self, actor: &Actor, sale_id: &str, rate: TaxRate) -> ServiceResult<Sale> {
        actor.authorize(Permission::EditSales)?;
        self.update_header(actor, sale_id, "sale.tax_applied", |sale| {
            Ok(sale.apply_tax(rate)?)
        })
        .await
    }

    /// Records the tendered amount. Fails if it does not cover the total.
    pub async fn process_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        paid: Money,
        method: PaymentMethod,
    ) -> ServiceResult<Sale> {
        actor.authorize(Permission::CompleteSales)?;
        self.update_header(actor, sale_id, "sale.payment_processed", |sale| {
            Ok(sale.process_payment(paid, method)?)
        })
        .await
    }

    /// Header-only change: no lines, no stock.
    async fn update_header<F>(
        &self,
        actor: &Actor,
        sale_id: &str,
        action: &str,
        change: F,
    ) -> ServiceResult<Sale>
    where
        F: FnOnce(&mut Sale) -> ServiceResult<()>,
    {
        let mut uow = self.engine.database().begin().await?;
        let mut sale = load_sale(&mut uow, actor, sale_id).await?;
        let before = sale.clone();

        change(&mut sale)?;

        uow.sales().update(&sale).await?;
        uow.commit().await?;

        debug!(sale_number = %sale.sale_number, action = %action, total = %sale.total(), "Sale updated");
        self.audit(actor, action, Some(&before), &sale).await;

        Ok(sale)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_sale(&self, actor: &Actor, sale_id: &str) -> ServiceResult<Sale> {
        actor.authorize(Permission::ViewSales)?;

        let mut session = self.engine.database().session().await?;
        Ok(session.sales().require(&actor.tenant_id, sale_id).await?)
    }

    /// Sale headers, newest first. Lines are not loaded.
    pub async fn list_sales(
        &self,
        actor: &Actor,
        status: Option<SaleStatus>,
        page: Page,
    ) -> ServiceResult<Vec<Sale>> {
        actor.authorize(Permission::ViewSales)?;

        let mut session = self.engine.database().session().await?;
        Ok(session.sales().list(&actor.tenant_id, status, page).await?)
    }

    async fn audit(&self, actor: &Actor, action: &str, before: Option<&Sale>, after: &Sale) {
        let event =
            AuditEvent::new(actor, "sale", &after.id, action).with_change(before, Some(after));
        self.engine.record_audit(event).await;
    }
}

async fn load_sale(uow: &mut UnitOfWork, actor: &Actor, sale_id: &str) -> ServiceResult<Sale> {
    Ok(uow.sales().require(&actor.tenant_id, sale_id).await?)
}
