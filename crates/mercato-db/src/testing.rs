//! Fixtures shared by the repository tests.

use crate::pool::{Database, DbConfig};
use crate::unit_of_work::{RepositoryAccess, Session};
use mercato_core::{MovementReason, MovementType, NewProduct, Product, Stock, StockMovement};

/// A fresh, migrated in-memory database.
pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub(crate) fn new_product(sku: &str, unit_price_cents: i64) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        unit_price_cents,
        ..Default::default()
    }
}

/// Inserts a product, its stock row and, for a non-zero quantity, the
/// opening purchase movement.
pub(crate) async fn insert_product_with_stock(
    session: &mut Session,
    tenant_id: &str,
    sku: &str,
    qty: i64,
    reorder_level: i64,
) -> (Product, Stock) {
    let product = Product::new(tenant_id, &new_product(sku, 100)).expect("valid product");
    let stock = Stock::new(tenant_id, &product.id, qty, reorder_level).expect("valid stock");

    session.products().insert(&product).await.expect("insert product");
    session.stock().insert(&stock).await.expect("insert stock");

    if qty > 0 {
        let opening = StockMovement::new(
            tenant_id,
            &product.id,
            MovementType::In,
            MovementReason::Purchase,
            qty,
            "INIT",
            "system",
        )
        .expect("valid movement");
        session.movements().insert(&opening).await.expect("insert movement");
    }

    (product, stock)
}
