//! # Repository Module
//!
//! Tenant-scoped repositories over a borrowed SQLite connection.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Engine use-case                                                        │
//! │       │                                                                 │
//! │       │  uow.stock().get_by_product(tenant_id, product_id)              │
//! │       ▼                                                                 │
//! │  StockRepository<'c>  ── borrows &'c mut SqliteConnection              │
//! │       │                                                                 │
//! │       │  SQL (always WHERE tenant_id = ?)                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read and write takes the tenant id explicitly. There is no
//! method that can reach another tenant's rows.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog rows
//! - [`StockRepository`](stock::StockRepository) - Stock summaries with version guard
//! - [`MovementRepository`](movement::MovementRepository) - Append-only ledger
//! - [`SaleRepository`](sale::SaleRepository) / [`SaleItemRepository`](sale::SaleItemRepository)
//! - [`SubscriptionRepository`](subscription::SubscriptionRepository) - Plan and usage counters
//! - [`AuditLogRepository`](audit::AuditLogRepository) - Audit trail

pub mod audit;
pub mod movement;
pub mod product;
pub mod sale;
pub mod stock;
pub mod subscription;

// =============================================================================
// Pagination
// =============================================================================

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    /// Clamps `limit` to 1..=MAX_LIMIT and `offset` to >= 0.
    pub fn new(limit: i64, offset: i64) -> Self {
        Page {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    pub fn first(limit: i64) -> Self {
        Page::new(limit, 0)
    }

    pub fn next(&self) -> Self {
        Page::new(self.limit, self.offset + self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::first(Self::DEFAULT_LIMIT)
    }
}
