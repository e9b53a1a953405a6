//! # Audit Delivery
//!
//! Every committed mutation produces an [`AuditEvent`]. Delivery happens
//! after commit and is fire-and-forget: a failing sink is logged and the
//! operation still succeeds.
//!
//! ```text
//! use-case ── commit ──► Engine::record_audit(event)
//!                              │
//!                              ▼
//!                        dyn AuditSink::record
//!                              │
//!                     Err ─────┴───► warn!(..), swallowed
//! ```

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use mercato_core::AuditEvent;
use mercato_db::{Database, DbError, RepositoryAccess};

#[derive(Debug, Error)]
#[error("Audit delivery failed: {0}")]
pub struct AuditError(pub String);

impl From<DbError> for AuditError {
    fn from(err: DbError) -> Self {
        AuditError(err.to_string())
    }
}

/// Where audit events go.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Writes events to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct SqliteAuditLog {
    db: Database,
}

impl SqliteAuditLog {
    pub fn new(db: Database) -> Self {
        SqliteAuditLog { db }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut session = self.db.session().await?;
        session.audit_log().insert(&event).await?;
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        debug!(action = %event.action, "Audit event dropped");
        Ok(())
    }
}
