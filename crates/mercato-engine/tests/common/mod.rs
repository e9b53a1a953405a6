//! Fixtures shared by the engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;

use mercato_core::{Actor, AuditEvent, NewProduct, Plan, Product, Role, Subscription};
use mercato_db::{Database, DbConfig, RepositoryAccess};
use mercato_engine::{AuditError, AuditSink, Engine, EngineConfig};

pub const TENANT: &str = "tenant-a";

pub fn owner() -> Actor {
    Actor::new("owner-1", TENANT, Role::Owner)
}

pub fn cashier() -> Actor {
    Actor::new("cashier-1", TENANT, Role::Cashier)
}

pub fn clerk() -> Actor {
    Actor::new("clerk-1", TENANT, Role::StockClerk)
}

pub fn viewer() -> Actor {
    Actor::new("viewer-1", TENANT, Role::Viewer)
}

/// In-memory engine with a Professional subscription for [`TENANT`].
pub async fn engine() -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = Engine::new(db, &EngineConfig::default());
    subscribe(&engine, TENANT, Plan::Professional).await;
    engine
}

pub async fn subscribe(engine: &Engine, tenant_id: &str, plan: Plan) -> Subscription {
    let subscription = Subscription::new(tenant_id, plan);
    save_subscription(engine, &subscription).await;
    subscription
}

pub async fn save_subscription(engine: &Engine, subscription: &Subscription) {
    let mut session = engine.database().session().await.unwrap();
    session.subscriptions().upsert(subscription).await.unwrap();
}

pub async fn subscription(engine: &Engine, tenant_id: &str) -> Subscription {
    let mut session = engine.database().session().await.unwrap();
    session.subscriptions().get(tenant_id).await.unwrap().unwrap()
}

/// Creates a product through the engine with `qty` units on hand.
pub async fn product(engine: &Engine, sku: &str, unit_price_cents: i64, qty: i64) -> Product {
    let input = NewProduct {
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        unit_price_cents,
        initial_qty: qty,
        reorder_level: 2,
        ..Default::default()
    };
    let (product, _) = engine.products().create_product(&owner(), &input).await.unwrap();
    product
}

/// (available, reserved, total) for a product.
pub async fn levels(engine: &Engine, product_id: &str) -> (i64, i64, i64) {
    let stock = engine.stock().get_stock(&owner(), product_id).await.unwrap();
    (stock.available_qty(), stock.reserved_qty(), stock.total_qty())
}

/// Sink that refuses every event.
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError("audit store offline".to_string()))
    }
}

pub fn failing_audit() -> Arc<dyn AuditSink> {
    Arc::new(FailingAuditSink)
}
