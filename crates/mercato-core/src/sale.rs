//! # Sale Module
//!
//! The sale aggregate: line items, computed totals and the status machine.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              ┌──────────── complete() ────────────► COMPLETED           │
//! │              │   (items ≥ 1, payment covers total)                      │
//! │   PENDING ───┤                                                          │
//! │              │                                                          │
//! │              └──────────── cancel() ──────────────► CANCELLED           │
//! │                                                                         │
//! │   add/update/remove items, discount, tax, payment: PENDING only         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! subtotal = Σ line totals
//! tax      = round_half_up((subtotal - discount) × rate)
//! total    = subtotal - discount + tax
//! ```
//! Totals are recomputed from the lines after every change, so they can
//! never drift. A change to the lines or the pricing clears any recorded
//! payment; completion always checks a payment against the current total.
//!
//! The aggregate never touches stock. The engine reserves, releases and
//! confirms stock alongside these calls, inside one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::product::Product;
use crate::validation::{
    validate_discount, validate_non_negative, validate_quantity, validate_sale_size,
    validate_tax_rate_bps,
};

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Items and pricing may still change.
    #[default]
    Pending,
    /// Paid and final; stock has left the store.
    Completed,
    /// Abandoned; reservations returned to available stock.
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SaleStatus::Pending)
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    BankTransfer,
    /// Store credit / on account.
    Credit,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line on a sale.
///
/// SKU, name and unit price are snapshots taken when the product was first
/// added; later catalog edits do not change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub total_price_cents: i64,
    /// Insertion order within the sale, starting at 1.
    pub line_no: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    fn set_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        self.total_price_cents = line_total(self.unit_price(), quantity)?.cents();
        self.quantity = quantity;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// `price × quantity`, rejected when it does not fit in an `i64`.
fn line_total(price: Money, quantity: i64) -> CoreResult<Money> {
    price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "line total".to_string(),
                reason: format!("{} × {} overflows", price.cents(), quantity),
            }
            .into()
        })
}

/// Result of a quantity change on an existing line.
#[derive(Debug, Clone)]
pub struct QuantityChange {
    pub item: SaleItem,
    pub previous: i64,
}

impl QuantityChange {
    /// Positive when the line grew.
    pub fn delta(&self) -> i64 {
        self.item.quantity - self.previous
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    /// Human-facing number, unique per tenant. Used as the movement reference.
    pub sale_number: String,
    pub status: SaleStatus,

    /// Lines in insertion order. Loaded separately from the header row.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<SaleItem>,

    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_rate_bps: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub payment_method: Option<PaymentMethod>,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Creates an empty pending sale.
    pub fn new(tenant_id: &str, sale_number: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sale_number: sale_number.to_string(),
            status: SaleStatus::Pending,
            items: Vec::new(),
            subtotal_cents: 0,
            discount_cents: 0,
            tax_rate_bps: 0,
            tax_cents: 0,
            total_cents: 0,
            paid_cents: 0,
            change_cents: 0,
            payment_method: None,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }

    /// A payment has been recorded against the current total.
    pub fn is_paid(&self) -> bool {
        self.payment_method.is_some() && self.paid_cents >= self.total_cents
    }

    /// The line for `product_id`. Adding a product twice merges, so there is
    /// at most one.
    pub fn item_for_product(&self, product_id: &str) -> Option<&SaleItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Fails with `InvalidState` unless the sale is pending.
    pub fn ensure_pending(&self) -> CoreResult<()> {
        if self.status != SaleStatus::Pending {
            return Err(CoreError::invalid_state(format!(
                "sale {} is {}",
                self.sale_number, self.status
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Line Items
    // -------------------------------------------------------------------------

    /// Adds `quantity` of `product`, merging into an existing line for the
    /// same product. Returns the line as it now stands.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<SaleItem> {
        self.ensure_pending()?;
        validate_quantity(quantity)?;

        if !product.is_sellable() {
            return Err(CoreError::invalid_state(format!(
                "product {} is {}",
                product.sku, product.status
            )));
        }

        if let Some(pos) = self.items.iter().position(|i| i.product_id == product.id) {
            let merged = self.items[pos].quantity + quantity;
            validate_quantity(merged)?;

            self.items[pos].set_quantity(merged)?;
            let item = self.items[pos].clone();
            self.recalculate();
            return Ok(item);
        }

        validate_sale_size(self.items.len())?;

        let now = Utc::now();
        let price = product.price();
        let total = line_total(price, quantity)?;
        let line_no = self.items.iter().map(|i| i.line_no).max().unwrap_or(0) + 1;
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            product_id: product.id.clone(),
            product_sku: product.sku.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price_cents: price.cents(),
            total_price_cents: total.cents(),
            line_no,
            created_at: now,
            updated_at: now,
        };

        self.items.push(item.clone());
        self.recalculate();
        Ok(item)
    }

    /// Sets the quantity of the line for `product_id`. Zero is rejected;
    /// remove the line instead.
    pub fn update_item_quantity(
        &mut self,
        product_id: &str,
        quantity: i64,
    ) -> CoreResult<QuantityChange> {
        self.ensure_pending()?;
        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Sale item",
                id: product_id.to_string(),
            })?;

        let previous = item.quantity;
        item.set_quantity(quantity)?;
        let item = item.clone();

        self.recalculate();
        Ok(QuantityChange { item, previous })
    }

    /// Removes the line for `product_id` and returns it.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<SaleItem> {
        self.ensure_pending()?;

        let pos = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Sale item",
                id: product_id.to_string(),
            })?;

        let removed = self.items.remove(pos);
        self.recalculate();
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Pricing
    // -------------------------------------------------------------------------

    /// Sets the sale-level discount. Must not exceed the subtotal.
    pub fn apply_discount(&mut self, amount: Money) -> CoreResult<()> {
        self.ensure_pending()?;
        validate_discount(amount.cents(), self.subtotal_cents)?;

        self.discount_cents = amount.cents();
        self.recalculate();
        Ok(())
    }

    /// Sets the tax rate, applied to `subtotal - discount`.
    pub fn apply_tax(&mut self, rate: TaxRate) -> CoreResult<()> {
        self.ensure_pending()?;
        validate_tax_rate_bps(rate.bps())?;

        self.tax_rate_bps = rate.bps();
        self.recalculate();
        Ok(())
    }

    /// Records the tendered amount and computes change.
    ///
    /// ## Errors
    /// `InsufficientPayment` when `paid < total`.
    pub fn process_payment(&mut self, paid: Money, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_pending()?;
        validate_non_negative("payment amount", paid.cents())?;

        if paid < self.total() {
            return Err(ValidationError::InsufficientPayment {
                paid: paid.cents(),
                total: self.total_cents,
            }
            .into());
        }

        self.paid_cents = paid.cents();
        self.change_cents = (paid - self.total()).cents();
        self.payment_method = Some(method);
        self.updated_at = Utc::now();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Finalizes the sale. Irreversible.
    pub fn complete(&mut self) -> CoreResult<()> {
        self.ensure_pending()?;

        if self.items.is_empty() {
            return Err(CoreError::invalid_state(format!(
                "sale {} has no items",
                self.sale_number
            )));
        }

        if !self.is_paid() {
            return Err(CoreError::invalid_state(format!(
                "sale {} has no payment covering {}",
                self.sale_number,
                self.total()
            )));
        }

        let now = Utc::now();
        self.status = SaleStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Abandons the sale. Only legal while pending.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_pending()?;

        let now = Utc::now();
        self.status = SaleStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Recomputes every total from the lines.
    ///
    /// A discount larger than a shrunken subtotal is clamped to it.
    fn recalculate(&mut self) {
        let subtotal: Money = self.items.iter().map(SaleItem::total_price).sum();
        let discount = self.discount().min(subtotal);
        let tax = (subtotal - discount).calculate_tax(self.tax_rate());

        self.subtotal_cents = subtotal.cents();
        self.discount_cents = discount.cents();
        self.tax_cents = tax.cents();
        self.total_cents = (subtotal - discount + tax).cents();

        self.paid_cents = 0;
        self.change_cents = 0;
        self.payment_method = None;
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{NewProduct, ProductStatus};

    fn product(sku: &str, price_cents: i64) -> Product {
        Product::new(
            "tenant-1",
            &NewProduct {
                sku: sku.to_string(),
                name: format!("{sku} name"),
                unit_price_cents: price_cents,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn sale() -> Sale {
        Sale::new("tenant-1", "S-000001", "user-1")
    }

    #[test]
    fn test_totals_discount_then_tax() {
        let mut s = sale();
        let p = product("A", 5000);

        s.add_item(&p, 2).unwrap();
        assert_eq!(s.subtotal().cents(), 10000);

        s.apply_discount(Money::from_cents(1000)).unwrap();
        s.apply_tax(TaxRate::from_percentage(10.0)).unwrap();

        assert_eq!(s.tax().cents(), 900);
        assert_eq!(s.total().cents(), 9900);
    }

    #[test]
    fn test_underpayment_is_validation_error() {
        let mut s = sale();
        s.add_item(&product("A", 5000), 2).unwrap();
        s.apply_discount(Money::from_cents(1000)).unwrap();
        s.apply_tax(TaxRate::from_bps(1000)).unwrap();

        let err = s
            .process_payment(Money::from_cents(5000), PaymentMethod::Cash)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InsufficientPayment {
                paid: 5000,
                total: 9900
            })
        ));
        assert!(!s.is_paid());
    }

    #[test]
    fn test_payment_computes_change() {
        let mut s = sale();
        s.add_item(&product("A", 5000), 2).unwrap();

        s.process_payment(Money::from_cents(12000), PaymentMethod::Cash)
            .unwrap();
        assert_eq!(s.change().cents(), 2000);
        assert!(s.is_paid());
    }

    #[test]
    fn test_adding_same_product_merges_lines() {
        let mut s = sale();
        let p = product("A", 100);

        s.add_item(&p, 2).unwrap();
        let line = s.add_item(&p, 3).unwrap();

        assert_eq!(s.items.len(), 1);
        assert_eq!(line.quantity, 5);
        assert_eq!(s.subtotal().cents(), 500);
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut s = sale();
        let a = s.add_item(&product("A", 100), 1).unwrap();
        let b = s.add_item(&product("B", 100), 1).unwrap();
        s.remove_item(&a.product_id).unwrap();
        let c = s.add_item(&product("C", 100), 1).unwrap();

        assert_eq!(b.line_no, 2);
        assert_eq!(c.line_no, 3);
    }

    #[test]
    fn test_update_quantity() {
        let mut s = sale();
        let line = s.add_item(&product("A", 250), 4).unwrap();

        let change = s.update_item_quantity(&line.product_id, 1).unwrap();
        assert_eq!(change.previous, 4);
        assert_eq!(change.delta(), -3);
        assert_eq!(s.subtotal().cents(), 250);

        assert!(matches!(
            s.update_item_quantity(&line.product_id, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            s.update_item_quantity("missing", 1),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_item_change_clears_payment() {
        let mut s = sale();
        let line = s.add_item(&product("A", 1000), 1).unwrap();
        s.process_payment(Money::from_cents(1000), PaymentMethod::Card)
            .unwrap();

        s.update_item_quantity(&line.product_id, 2).unwrap();
        assert!(!s.is_paid());
        assert!(matches!(s.complete(), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn test_discount_validation_and_clamp() {
        let mut s = sale();
        let a = s.add_item(&product("A", 1000), 1).unwrap();
        s.add_item(&product("B", 1000), 1).unwrap();

        assert!(s.apply_discount(Money::from_cents(2001)).is_err());
        assert!(s.apply_discount(Money::from_cents(-1)).is_err());

        s.apply_discount(Money::from_cents(1500)).unwrap();
        s.remove_item(&a.product_id).unwrap();
        assert_eq!(s.discount().cents(), 1000);
        assert_eq!(s.total().cents(), 0);
    }

    #[test]
    fn test_tax_rate_capped() {
        let mut s = sale();
        assert!(s.apply_tax(TaxRate::from_bps(10001)).is_err());
        assert!(s.apply_tax(TaxRate::from_bps(-5)).is_err());
    }

    #[test]
    fn test_inactive_product_cannot_be_added() {
        let mut s = sale();
        let mut p = product("A", 100);
        p.change_status(ProductStatus::Inactive).unwrap();

        assert!(matches!(s.add_item(&p, 1), Err(CoreError::InvalidState(_))));
        assert!(s.items.is_empty());
    }

    #[test]
    fn test_line_quantity_cap() {
        let mut s = sale();
        let p = product("A", 1);
        s.add_item(&p, 999).unwrap();
        assert!(s.add_item(&p, 1).is_err());
        assert_eq!(s.items[0].quantity, 999);
    }

    #[test]
    fn test_line_total_overflow_is_rejected() {
        let mut s = sale();
        // Bypasses the price cap, as a row written before it existed would.
        let mut p = product("A", 100);
        p.unit_price_cents = i64::MAX / 2;

        assert!(matches!(
            s.add_item(&p, 3),
            Err(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
        assert!(s.items.is_empty());
        assert_eq!(s.total().cents(), 0);

        s.add_item(&p, 1).unwrap();
        assert!(matches!(
            s.update_item_quantity(&p.id, 3),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(s.items[0].quantity, 1);
        assert_eq!(s.items[0].total_price_cents, i64::MAX / 2);
    }

    #[test]
    fn test_complete_requires_items_and_payment() {
        let mut s = sale();
        assert!(matches!(s.complete(), Err(CoreError::InvalidState(_))));

        s.add_item(&product("A", 100), 1).unwrap();
        assert!(matches!(s.complete(), Err(CoreError::InvalidState(_))));

        s.process_payment(Money::from_cents(100), PaymentMethod::Cash)
            .unwrap();
        s.complete().unwrap();
        assert_eq!(s.status, SaleStatus::Completed);
        assert!(s.completed_at.is_some());
    }

    #[test]
    fn test_completed_sale_is_frozen() {
        let mut s = sale();
        let p = product("A", 100);
        let line = s.add_item(&p, 1).unwrap();
        s.process_payment(Money::from_cents(100), PaymentMethod::Mobile)
            .unwrap();
        s.complete().unwrap();

        assert!(matches!(s.add_item(&p, 1), Err(CoreError::InvalidState(_))));
        assert!(matches!(
            s.update_item_quantity(&line.product_id, 2),
            Err(CoreError::InvalidState(_))
        ));
        assert!(matches!(s.remove_item(&line.product_id), Err(CoreError::InvalidState(_))));
        assert!(matches!(s.cancel(), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let mut s = sale();
        s.cancel().unwrap();
        assert_eq!(s.status, SaleStatus::Cancelled);
        assert!(s.status.is_terminal());
        assert!(matches!(s.cancel(), Err(CoreError::InvalidState(_))));
        assert!(matches!(s.complete(), Err(CoreError::InvalidState(_))));
    }
}
