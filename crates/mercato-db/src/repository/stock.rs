//! # Stock Repository
//!
//! Persists the `Stock` summary rows.
//!
//! ## Version Guard
//! ```text
//! read   stock { version: 7 }
//! write  UPDATE stock SET …, version = 8
//!        WHERE tenant_id = ? AND id = ? AND version = 7
//!
//! 1 row  → ok, in-memory version becomes 8
//! 0 rows → DbError::StaleWrite (someone else wrote first)
//! ```
//! There is no way to set quantities except by writing a `Stock` value the
//! core mutated, and the schema's CHECK constraints reject any row that
//! breaks `total = available + reserved`.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::Page;
use mercato_core::Stock;

const STOCK_COLUMNS: &str = "id, tenant_id, product_id, available_qty, reserved_qty, total_qty, \
     reorder_level, version, last_movement_at, created_at, updated_at";

/// Repository for stock rows.
pub struct StockRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StockRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        StockRepository { conn }
    }

    /// Gets the stock row for a product.
    pub async fn get_by_product(
        &mut self,
        tenant_id: &str,
        product_id: &str,
    ) -> DbResult<Option<Stock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE tenant_id = ?1 AND product_id = ?2"
        );
        let stock = sqlx::query_as::<_, Stock>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(stock)
    }

    /// Like [`get_by_product`](Self::get_by_product) but a missing row is an error.
    pub async fn require(&mut self, tenant_id: &str, product_id: &str) -> DbResult<Stock> {
        self.get_by_product(tenant_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", product_id))
    }

    /// Inserts the stock row for a new product.
    pub async fn insert(&mut self, stock: &Stock) -> DbResult<()> {
        debug!(
            tenant_id = %stock.tenant_id,
            product_id = %stock.product_id,
            available = stock.available_qty(),
            "Inserting stock"
        );

        sqlx::query(
            r#"
            INSERT INTO stock (
                id, tenant_id, product_id,
                available_qty, reserved_qty, total_qty, reorder_level,
                version, last_movement_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&stock.id)
        .bind(&stock.tenant_id)
        .bind(&stock.product_id)
        .bind(stock.available_qty())
        .bind(stock.reserved_qty())
        .bind(stock.total_qty())
        .bind(stock.reorder_level())
        .bind(stock.version)
        .bind(stock.last_movement_at)
        .bind(stock.created_at)
        .bind(stock.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Writes the quantities back under the version guard and bumps the
    /// in-memory version on success.
    pub async fn update(&mut self, stock: &mut Stock) -> DbResult<()> {
        debug!(
            product_id = %stock.product_id,
            available = stock.available_qty(),
            reserved = stock.reserved_qty(),
            version = stock.version,
            "Updating stock"
        );

        let result = sqlx::query(
            r#"
            UPDATE stock SET
                available_qty = ?4,
                reserved_qty = ?5,
                total_qty = ?6,
                reorder_level = ?7,
                last_movement_at = ?8,
                updated_at = ?9,
                version = version + 1
            WHERE tenant_id = ?1 AND id = ?2 AND version = ?3
            "#,
        )
        .bind(&stock.tenant_id)
        .bind(&stock.id)
        .bind(stock.version)
        .bind(stock.available_qty())
        .bind(stock.reserved_qty())
        .bind(stock.total_qty())
        .bind(stock.reorder_level())
        .bind(stock.last_movement_at)
        .bind(stock.updated_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Stock", &stock.id));
        }

        stock.version += 1;
        Ok(())
    }

    /// Stock at or below its reorder level, emptiest first.
    pub async fn list_low_stock(&mut self, tenant_id: &str, page: Page) -> DbResult<Vec<Stock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM stock \
             WHERE tenant_id = ?1 AND available_qty <= reorder_level \
             ORDER BY available_qty, product_id LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, Stock>(&sql)
            .bind(tenant_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{insert_product_with_stock, test_db};
    use crate::{DbError, Page, RepositoryAccess};

    #[tokio::test]
    async fn test_update_bumps_version() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        let (product, _) = insert_product_with_stock(&mut session, "tenant-a", "A", 10, 2).await;

        let mut stock = session.stock().require("tenant-a", &product.id).await.unwrap();
        stock.reserve(4).unwrap();
        session.stock().update(&mut stock).await.unwrap();
        assert_eq!(stock.version, 1);

        let reloaded = session.stock().require("tenant-a", &product.id).await.unwrap();
        assert_eq!(reloaded.available_qty(), 6);
        assert_eq!(reloaded.reserved_qty(), 4);
        assert_eq!(reloaded.total_qty(), 10);
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        let (product, _) = insert_product_with_stock(&mut session, "tenant-a", "A", 10, 0).await;

        let mut first = session.stock().require("tenant-a", &product.id).await.unwrap();
        let mut second = first.clone();

        first.remove(3).unwrap();
        session.stock().update(&mut first).await.unwrap();

        second.remove(5).unwrap();
        let err = session.stock().update(&mut second).await.unwrap_err();
        assert!(matches!(err, DbError::StaleWrite { .. }));

        let current = session.stock().require("tenant-a", &product.id).await.unwrap();
        assert_eq!(current.available_qty(), 7);
    }

    #[tokio::test]
    async fn test_list_low_stock() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        insert_product_with_stock(&mut session, "tenant-a", "LOW", 1, 5).await;
        insert_product_with_stock(&mut session, "tenant-a", "OK", 50, 5).await;
        insert_product_with_stock(&mut session, "tenant-b", "LOW-B", 0, 5).await;

        let low = session
            .stock()
            .list_low_stock("tenant-a", Page::default())
            .await
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].available_qty(), 1);
    }

    #[tokio::test]
    async fn test_missing_stock_is_not_found() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        let err = session.stock().require("tenant-a", "nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
