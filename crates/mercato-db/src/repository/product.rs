//! # Product Repository
//!
//! Catalog rows. SKUs are unique per tenant (enforced by the schema, so a
//! duplicate surfaces as `DbError::UniqueViolation`).

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::Page;
use mercato_core::{Product, ProductStatus};

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, name, description, unit_price_cents, \
     cost_price_cents, status, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by ID.
    pub async fn get(&mut self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND id = ?2"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&mut self, tenant_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND sku = ?2"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(sku)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(tenant_id = %product.tenant_id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, description,
                unit_price_cents, cost_price_cents, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price_cents)
        .bind(product.cost_price_cents)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Writes back the mutable product fields.
    pub async fn update(&mut self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, status = %product.status, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                description = ?4,
                unit_price_cents = ?5,
                cost_price_cents = ?6,
                status = ?7,
                updated_at = ?8
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(&product.tenant_id)
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price_cents)
        .bind(product.cost_price_cents)
        .bind(product.status)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Lists products by SKU, optionally filtered by status.
    pub async fn list(
        &mut self,
        tenant_id: &str,
        status: Option<ProductStatus>,
        page: Page,
    ) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY sku LIMIT ?3 OFFSET ?4"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(products)
    }

    /// Counts a tenant's products.
    pub async fn count(&mut self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}
