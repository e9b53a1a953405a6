//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                              │
//! │     └── sales().insert(&sale)          status: pending                  │
//! │                                                                         │
//! │  2. CHANGE LINES (pending only, checked by the aggregate)               │
//! │     └── sale_items().save(&item)       insert or update by id           │
//! │     └── sale_items().delete(..)                                         │
//! │     └── sales().update(&sale)          totals recomputed in core        │
//! │                                                                         │
//! │  3. COMPLETE / CANCEL                                                   │
//! │     └── sales().update(&sale)          status flip in the same tx as    │
//! │                                        the stock movements              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::Page;
use mercato_core::{Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = "id, tenant_id, sale_number, status, subtotal_cents, discount_cents, \
     tax_rate_bps, tax_cents, total_cents, paid_cents, change_cents, payment_method, \
     created_by, created_at, updated_at, completed_at, cancelled_at";

const ITEM_COLUMNS: &str = "id, sale_id, tenant_id, product_id, product_sku, product_name, \
     quantity, unit_price_cents, total_price_cents, line_no, created_at, updated_at";

// =============================================================================
// Sales
// =============================================================================

/// Repository for sale headers.
pub struct SaleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleRepository { conn }
    }

    /// Gets a sale by ID, with its items in insertion order.
    pub async fn get(&mut self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE tenant_id = ?1 AND id = ?2");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.items = SaleItemRepository::new(&mut *self.conn)
                    .list_for_sale(tenant_id, &sale.id)
                    .await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but a missing sale is an error.
    pub async fn require(&mut self, tenant_id: &str, id: &str) -> DbResult<Sale> {
        self.get(tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Inserts a sale header. Items are saved separately.
    pub async fn insert(&mut self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, sale_number, status,
                subtotal_cents, discount_cents, tax_rate_bps, tax_cents, total_cents,
                paid_cents, change_cents, payment_method,
                created_by, created_at, updated_at, completed_at, cancelled_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.sale_number)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_rate_bps)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.change_cents)
        .bind(sale.payment_method)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .bind(sale.cancelled_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Writes back status, totals, payment and timestamps.
    pub async fn update(&mut self, sale: &Sale) -> DbResult<()> {
        debug!(
            id = %sale.id,
            status = %sale.status,
            total_cents = sale.total_cents,
            "Updating sale"
        );

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = ?3,
                subtotal_cents = ?4,
                discount_cents = ?5,
                tax_rate_bps = ?6,
                tax_cents = ?7,
                total_cents = ?8,
                paid_cents = ?9,
                change_cents = ?10,
                payment_method = ?11,
                updated_at = ?12,
                completed_at = ?13,
                cancelled_at = ?14
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(&sale.tenant_id)
        .bind(&sale.id)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_rate_bps)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.change_cents)
        .bind(sale.payment_method)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .bind(sale.cancelled_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    /// Lists sale headers, newest first. Items are not loaded.
    pub async fn list(
        &mut self,
        tenant_id: &str,
        status: Option<SaleStatus>,
        page: Page,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY created_at DESC, sale_number DESC LIMIT ?3 OFFSET ?4"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(sales)
    }

    /// Counts a tenant's sales (all statuses). Sales are never deleted, so
    /// this only grows.
    pub async fn count(&mut self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    /// Next sale number for the tenant, e.g. `S-000042`.
    ///
    /// Call inside the unit of work that inserts the sale; `BEGIN IMMEDIATE`
    /// keeps two writers from drawing the same number.
    pub async fn next_sale_number(&mut self, tenant_id: &str, prefix: &str) -> DbResult<String> {
        let count = self.count(tenant_id).await?;
        Ok(format!("{}-{:06}", prefix, count + 1))
    }
}

// =============================================================================
// Sale Items
// =============================================================================

/// Repository for sale lines.
pub struct SaleItemRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleItemRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleItemRepository { conn }
    }

    /// A sale's lines by `line_no`.
    pub async fn list_for_sale(&mut self, tenant_id: &str, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items \
             WHERE tenant_id = ?1 AND sale_id = ?2 ORDER BY line_no"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(items)
    }

    /// Inserts a new line or updates the quantity of an existing one.
    ///
    /// Snapshot columns are only written on insert.
    pub async fn save(&mut self, item: &SaleItem) -> DbResult<()> {
        debug!(
            sale_id = %item.sale_id,
            product_id = %item.product_id,
            quantity = item.quantity,
            "Saving sale item"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, tenant_id, product_id, product_sku, product_name,
                quantity, unit_price_cents, total_price_cents, line_no,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (id) DO UPDATE SET
                quantity = excluded.quantity,
                total_price_cents = excluded.total_price_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.tenant_id)
        .bind(&item.product_id)
        .bind(&item.product_sku)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .bind(item.line_no)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Deletes a line.
    pub async fn delete(&mut self, tenant_id: &str, item_id: &str) -> DbResult<()> {
        debug!(item_id = %item_id, "Deleting sale item");

        let result = sqlx::query("DELETE FROM sale_items WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant_id)
            .bind(item_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", item_id));
        }

        Ok(())
    }
}
