//! # Unit of Work
//!
//! The transaction boundary the engine composes its use-cases in.
//!
//! ```text
//! let mut uow = db.begin().await?;            BEGIN IMMEDIATE
//! let stock = uow.stock().get_by_product(..)  ┐
//! uow.movements().insert(&movement)           │ same transaction view
//! uow.stock().update(&mut stock)              ┘
//! uow.commit().await?;                        COMMIT
//!
//! Any `?` before commit drops `uow`           ROLLBACK
//! ```
//!
//! Repositories borrow the transaction's connection for as long as they
//! live, so two repositories never interleave statements on it.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::audit::AuditLogRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::{SaleItemRepository, SaleRepository};
use crate::repository::stock::StockRepository;
use crate::repository::subscription::SubscriptionRepository;

// =============================================================================
// Repository Access
// =============================================================================

/// Per-entity repository accessors over one connection.
///
/// Implemented by [`UnitOfWork`] (inside a transaction) and [`Session`]
/// (plain reads).
pub trait RepositoryAccess {
    fn connection(&mut self) -> &mut SqliteConnection;

    fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(self.connection())
    }

    fn stock(&mut self) -> StockRepository<'_> {
        StockRepository::new(self.connection())
    }

    fn movements(&mut self) -> MovementRepository<'_> {
        MovementRepository::new(self.connection())
    }

    fn sales(&mut self) -> SaleRepository<'_> {
        SaleRepository::new(self.connection())
    }

    fn sale_items(&mut self) -> SaleItemRepository<'_> {
        SaleItemRepository::new(self.connection())
    }

    fn subscriptions(&mut self) -> SubscriptionRepository<'_> {
        SubscriptionRepository::new(self.connection())
    }

    fn audit_log(&mut self) -> AuditLogRepository<'_> {
        AuditLogRepository::new(self.connection())
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// One `BEGIN IMMEDIATE … COMMIT` span.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        UnitOfWork { tx }
    }

    /// Makes every write in this unit durable.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write in this unit. Dropping has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}

impl RepositoryAccess for UnitOfWork {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

// =============================================================================
// Session
// =============================================================================

/// A pooled connection for reads outside a transaction.
pub struct Session {
    conn: PoolConnection<Sqlite>,
}

impl Session {
    pub(crate) fn new(conn: PoolConnection<Sqlite>) -> Self {
        Session { conn }
    }
}

impl RepositoryAccess for Session {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}
