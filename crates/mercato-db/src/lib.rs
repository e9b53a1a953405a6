//! # mercato-db: Database Layer for Mercato Ledger
//!
//! SQLite storage for the inventory ledger, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mercato Ledger Data Flow                           │
//! │                                                                         │
//! │  mercato-engine use-case (complete_sale)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    mercato-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │   │
//! │  │   │               │    │ ProductRepo   │    │              │    │   │
//! │  │   │ begin()  ─────┼───►│ StockRepo     │    │ 001_initial  │    │   │
//! │  │   │ session()     │    │ MovementRepo  │    │ _schema.sql  │    │   │
//! │  │   │               │    │ SaleRepo …    │    │              │    │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`unit_of_work`] - Transactions and the repository accessors
//! - [`error`] - Database error types
//! - [`repository`] - Tenant-scoped repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_db::{Database, DbConfig, RepositoryAccess};
//!
//! let db = Database::new(DbConfig::new("mercato.db")).await?;
//!
//! let mut uow = db.begin().await?;
//! let mut stock = uow.stock().require(tenant_id, product_id).await?;
//! stock.reserve(2)?;
//! uow.stock().update(&mut stock).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::Page;
pub use unit_of_work::{RepositoryAccess, Session, UnitOfWork};

// Repository re-exports for convenience
pub use repository::audit::AuditLogRepository;
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{SaleItemRepository, SaleRepository};
pub use repository::stock::StockRepository;
pub use repository::subscription::SubscriptionRepository;
