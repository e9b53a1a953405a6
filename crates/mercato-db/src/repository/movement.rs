//! # Movement Repository
//!
//! Append-only. This repository exposes `insert` and reads, nothing else;
//! the schema additionally rejects UPDATE and DELETE with triggers.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::Page;
use mercato_core::StockMovement;

const MOVEMENT_COLUMNS: &str = "id, tenant_id, product_id, movement_type, reason, quantity, \
     reference, notes, created_by, created_at";

/// Repository for the stock movement ledger.
pub struct MovementRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> MovementRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        MovementRepository { conn }
    }

    /// Appends a movement.
    pub async fn insert(&mut self, movement: &StockMovement) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            reason = %movement.reason,
            quantity = movement.quantity,
            reference = %movement.reference,
            "Recording stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, product_id, movement_type, reason,
                quantity, reference, notes, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.tenant_id)
        .bind(&movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.reason)
        .bind(movement.quantity)
        .bind(&movement.reference)
        .bind(&movement.notes)
        .bind(&movement.created_by)
        .bind(movement.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// A product's history, newest first.
    pub async fn list_for_product(
        &mut self,
        tenant_id: &str,
        product_id: &str,
        page: Page,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND product_id = ?2 \
             ORDER BY seq DESC LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }

    /// Every movement correlated with `reference` (e.g. a sale number), in
    /// the order they were written.
    pub async fn list_by_reference(
        &mut self,
        tenant_id: &str,
        reference: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND reference = ?2 ORDER BY seq"
        );
        let rows = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(tenant_id)
            .bind(reference)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{insert_product_with_stock, test_db};
    use crate::{DbError, Page, RepositoryAccess};
    use mercato_core::{MovementReason, MovementType, StockMovement};

    #[tokio::test]
    async fn test_history_newest_first() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        let (product, _) = insert_product_with_stock(&mut session, "tenant-a", "A", 10, 0).await;

        for (t, r, q) in [
            (MovementType::Reserved, MovementReason::Reservation, 2),
            (MovementType::Out, MovementReason::Sale, 2),
        ] {
            let m = StockMovement::new("tenant-a", &product.id, t, r, q, "S-000001", "user-1")
                .unwrap();
            session.movements().insert(&m).await.unwrap();
        }

        let history = session
            .movements()
            .list_for_product("tenant-a", &product.id, Page::default())
            .await
            .unwrap();
        let types: Vec<_> = history.iter().map(|m| m.movement_type).collect();
        // initial purchase, then reservation, then sale; newest first
        assert_eq!(
            types,
            vec![MovementType::Out, MovementType::Reserved, MovementType::In]
        );

        let by_ref = session
            .movements()
            .list_by_reference("tenant-a", "S-000001")
            .await
            .unwrap();
        assert_eq!(by_ref.len(), 2);
        assert_eq!(by_ref[0].reason, MovementReason::Reservation);

        let other_tenant = session
            .movements()
            .list_by_reference("tenant-b", "S-000001")
            .await
            .unwrap();
        assert!(other_tenant.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_rejects_updates() {
        let db = test_db().await;
        let mut session = db.session().await.unwrap();
        insert_product_with_stock(&mut session, "tenant-a", "A", 10, 0).await;

        let err: DbError = sqlx::query("UPDATE stock_movements SET quantity = 99")
            .execute(session.connection())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        let err: DbError = sqlx::query("DELETE FROM stock_movements")
            .execute(session.connection())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }
}
