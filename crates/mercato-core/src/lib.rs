//! # mercato-core: Pure Domain Logic for Mercato Ledger
//!
//! The inventory and sale rules as plain values and functions, with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Mercato Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                mercato-engine (Use-cases)                       │    │
//! │  │   StockService, SaleService, ProductService, UsageGate, audit   │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ mercato-core (THIS CRATE) ★                     │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────────┐         │    │
//! │  │   │  stock  │ │ movement │ │  sale   │ │ subscription │         │    │
//! │  │   │ Stock   │ │ ledger   │ │ Sale    │ │ Plan, usage  │         │    │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └──────────────┘         │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                 mercato-db (Database Layer)                     │    │
//! │  │         SQLite, migrations, UnitOfWork, repositories            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and TaxRate with integer arithmetic
//! - [`stock`] - Stock quantities and their invariant
//! - [`movement`] - Immutable stock ledger entries
//! - [`sale`] - Sale aggregate and state machine
//! - [`product`] - Catalog entries and status lifecycle
//! - [`subscription`] - Plans, limits, usage checks
//! - [`permissions`] - Roles and the acting user
//! - [`audit`] - Audit event value
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use mercato_core::Stock;
//!
//! let mut stock = Stock::new("tenant-1", "product-1", 10, 2).unwrap();
//! stock.reserve(4).unwrap();
//! stock.confirm(4).unwrap();
//!
//! assert_eq!(stock.available_qty(), 6);
//! assert_eq!(stock.total_qty(), 6);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod money;
pub mod movement;
pub mod permissions;
pub mod product;
pub mod sale;
pub mod stock;
pub mod subscription;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::AuditEvent;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use movement::{MovementReason, MovementType, StockMovement};
pub use permissions::{Actor, Permission, Role};
pub use product::{NewProduct, Product, ProductStatus};
pub use sale::{PaymentMethod, QuantityChange, Sale, SaleItem, SaleStatus};
pub use stock::Stock;
pub use subscription::{
    Denial, Plan, PlanLimits, Subscription, SubscriptionStatus, UsageCheck, UsageKind,
};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the seed binary and local demos.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines on a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum unit or cost price of a product, in cents (100 million major
/// units). Keeps every line and sale total far inside `i64`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum quantity on a single sale line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;
