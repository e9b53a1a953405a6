//! # Product Service
//!
//! Catalog entries. A product is created together with its stock row and,
//! when it starts with units on hand, the purchase movement that accounts
//! for them, so the ledger always explains the quantities.

use tracing::info;

use mercato_core::{
    Actor, AuditEvent, MovementReason, MovementType, NewProduct, Permission, Product,
    ProductStatus, Stock, StockMovement, UsageKind,
};
use mercato_db::{Page, RepositoryAccess};

use crate::error::{ServiceError, ServiceResult};
use crate::Engine;

/// Reference on the movement that records a product's opening quantity.
pub const OPENING_BALANCE_REFERENCE: &str = "opening-balance";

pub struct ProductService<'e> {
    engine: &'e Engine,
}

impl<'e> ProductService<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        ProductService { engine }
    }

    /// Creates a product, its stock and the opening movement.
    ///
    /// ## Errors
    /// - `UsageLimitExceeded` when the plan's product limit is reached
    /// - `Conflict` for a SKU the tenant already uses
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: &NewProduct,
    ) -> ServiceResult<(Product, Stock)> {
        actor.authorize(Permission::ManageProducts)?;

        let product = Product::new(&actor.tenant_id, input)?;
        let stock = Stock::new(
            &actor.tenant_id,
            &product.id,
            input.initial_qty,
            input.reorder_level,
        )?;
        let opening = if input.initial_qty > 0 {
            Some(StockMovement::new(
                &actor.tenant_id,
                &product.id,
                MovementType::In,
                MovementReason::Purchase,
                input.initial_qty,
                OPENING_BALANCE_REFERENCE,
                &actor.user_id,
            )?)
        } else {
            None
        };

        self.engine.gate().can_add_product(&actor.tenant_id).await?;

        let mut uow = self.engine.database().begin().await?;
        uow.products().insert(&product).await?;
        uow.stock().insert(&stock).await?;
        if let Some(movement) = &opening {
            uow.movements().insert(movement).await?;
        }
        uow.subscriptions()
            .increment(&actor.tenant_id, UsageKind::Products, 1)
            .await?;
        uow.commit().await?;

        info!(
            product_id = %product.id,
            sku = %product.sku,
            initial_qty = input.initial_qty,
            "Product created"
        );
        let event = AuditEvent::new(actor, "product", &product.id, "product.created")
            .with_change(None::<&Product>, Some(&product));
        self.engine.record_audit(event).await;

        Ok((product, stock))
    }

    /// Moves a product along its lifecycle.
    pub async fn change_product_status(
        &self,
        actor: &Actor,
        product_id: &str,
        status: ProductStatus,
    ) -> ServiceResult<Product> {
        actor.authorize(Permission::ManageProducts)?;

        let mut uow = self.engine.database().begin().await?;
        let mut product = uow
            .products()
            .get(&actor.tenant_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        let before = product.clone();

        product.change_status(status)?;
        uow.products().update(&product).await?;
        uow.commit().await?;

        info!(product_id = %product.id, from = %before.status, to = %product.status, "Product status changed");
        let event = AuditEvent::new(actor, "product", &product.id, "product.status_changed")
            .with_change(Some(&before), Some(&product));
        self.engine.record_audit(event).await;

        Ok(product)
    }

    pub async fn get_product(&self, actor: &Actor, product_id: &str) -> ServiceResult<Product> {
        actor.authorize(Permission::ViewProducts)?;

        let mut session = self.engine.database().session().await?;
        session
            .products()
            .get(&actor.tenant_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }

    pub async fn list_products(
        &self,
        actor: &Actor,
        status: Option<ProductStatus>,
        page: Page,
    ) -> ServiceResult<Vec<Product>> {
        actor.authorize(Permission::ViewProducts)?;

        let mut session = self.engine.database().session().await?;
        Ok(session.products().list(&actor.tenant_id, status, page).await?)
    }
}
