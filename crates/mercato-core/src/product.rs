//! # Product Module
//!
//! Catalog entries and their lifecycle.
//!
//! ```text
//!   active ◄──────► inactive
//!      │                │
//!      └──► discontinued ◄┘      (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_price, validate_product_name, validate_sku};

// =============================================================================
// Product Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Sellable.
    #[default]
    Active,
    /// Temporarily hidden from sale, can be reactivated.
    Inactive,
    /// Retired for good.
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Discontinued => "discontinued",
        }
    }

    /// Legal lifecycle transitions. Same-state is not a transition.
    pub fn can_transition_to(&self, next: ProductStatus) -> bool {
        use ProductStatus::*;

        matches!(
            (self, next),
            (Active, Inactive) | (Inactive, Active) | (Active, Discontinued) | (Inactive, Discontinued)
        )
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in a tenant's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Stock Keeping Unit, unique per tenant.
    pub sku: String,

    /// Display name, snapshotted onto sale lines.
    pub name: String,

    pub description: Option<String>,

    /// Selling price in cents.
    pub unit_price_cents: i64,

    /// Purchase cost in cents (for margin reporting).
    pub cost_price_cents: Option<i64>,

    pub status: ProductStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
    pub cost_price_cents: Option<i64>,
    /// Units on hand at creation; recorded as a purchase movement.
    pub initial_qty: i64,
    pub reorder_level: i64,
}

impl Product {
    /// Validates the input and builds an active product.
    pub fn new(tenant_id: &str, input: &NewProduct) -> CoreResult<Self> {
        validate_sku(&input.sku)?;
        validate_product_name(&input.name)?;
        validate_price("unit price", input.unit_price_cents)?;
        if let Some(cost) = input.cost_price_cents {
            validate_price("cost price", cost)?;
        }

        let now = Utc::now();
        Ok(Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            unit_price_cents: input.unit_price_cents,
            cost_price_cents: input.cost_price_cents,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Moves the product to `next`, rejecting illegal transitions.
    pub fn change_status(&mut self, next: ProductStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn input() -> NewProduct {
        NewProduct {
            sku: "COKE-330".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            unit_price_cents: 150,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_product_is_active() {
        let p = Product::new("tenant-1", &input()).unwrap();
        assert_eq!(p.status, ProductStatus::Active);
        assert!(p.is_sellable());
        assert_eq!(p.price().cents(), 150);
    }

    #[test]
    fn test_new_product_validates() {
        let mut bad = input();
        bad.sku = "has space".to_string();
        assert!(Product::new("tenant-1", &bad).is_err());

        let mut bad = input();
        bad.unit_price_cents = -1;
        assert!(Product::new("tenant-1", &bad).is_err());

        let mut bad = input();
        bad.unit_price_cents = i64::MAX / 2;
        assert!(matches!(
            Product::new("tenant-1", &bad),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_status_transitions() {
        use ProductStatus::*;

        assert!(Active.can_transition_to(Inactive));
        assert!(Inactive.can_transition_to(Active));
        assert!(Active.can_transition_to(Discontinued));
        assert!(Inactive.can_transition_to(Discontinued));

        assert!(!Discontinued.can_transition_to(Active));
        assert!(!Discontinued.can_transition_to(Inactive));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_change_status() {
        let mut p = Product::new("tenant-1", &input()).unwrap();

        p.change_status(ProductStatus::Inactive).unwrap();
        assert!(!p.is_sellable());

        p.change_status(ProductStatus::Discontinued).unwrap();
        let err = p.change_status(ProductStatus::Active).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(p.status, ProductStatus::Discontinued);
    }
}
