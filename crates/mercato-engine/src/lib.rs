//! # mercato-engine: Transactional Orchestration for Mercato Ledger
//!
//! The use-cases. Each mutating call follows one shape:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Use-case Shape                                  │
//! │                                                                         │
//! │  actor.authorize(permission)      ─┐                                    │
//! │  gate.can_…(tenant) (if gated)     ├─ no transaction yet                │
//! │                                   ─┘                                    │
//! │  let mut uow = db.begin()          BEGIN IMMEDIATE                      │
//! │      read via uow.*()              ┐                                    │
//! │      mutate core aggregates        │ any `?` drops uow → ROLLBACK       │
//! │      write via uow.*()             ┘                                    │
//! │  uow.commit()                      COMMIT                               │
//! │                                                                         │
//! │  engine.record_audit(event)        after commit, failures swallowed     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(&EngineConfig::load(None)?).await?;
//! let sale = engine.sales().create_sale(&actor).await?;
//! let sale = engine.sales().add_sale_item(&actor, &sale.id, &product_id, 2).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod config;
pub mod error;
pub mod gate;
pub mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditError, AuditSink, NoopAuditSink, SqliteAuditLog};
pub use config::{ConfigError, EngineConfig};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use gate::{SubscriptionSource, UsageGate};
pub use service::product::ProductService;
pub use service::sale::SaleService;
pub use service::stock::{StockAdjustment, StockService};

use std::sync::Arc;
use tracing::{info, warn};

use mercato_core::AuditEvent;
use mercato_db::Database;

// =============================================================================
// Engine
// =============================================================================

/// Entry point to every use-case. Cheap to clone and `Send + Sync`.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    gate: UsageGate,
    audit: Arc<dyn AuditSink>,
    sale_prefix: String,
}

impl Engine {
    /// Wires the engine over an open database, auditing to its `audit_log`.
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        let gate = UsageGate::new(
            Arc::new(db.clone()),
            config.usage.warning_threshold_percent,
        );
        let audit: Arc<dyn AuditSink> = Arc::new(SqliteAuditLog::new(db.clone()));

        Engine {
            db,
            gate,
            audit,
            sale_prefix: config.sales.number_prefix.clone(),
        }
    }

    /// Opens (and migrates) the configured database, then wires the engine.
    pub async fn open(config: &EngineConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database.path.display(), "Engine ready");
        Ok(Engine::new(db, config))
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_usage_gate(mut self, gate: UsageGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn gate(&self) -> &UsageGate {
        &self.gate
    }

    pub fn sales(&self) -> SaleService<'_> {
        SaleService::new(self)
    }

    pub fn stock(&self) -> StockService<'_> {
        StockService::new(self)
    }

    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self)
    }

    pub(crate) fn sale_prefix(&self) -> &str {
        &self.sale_prefix
    }

    /// Delivers an event to the audit sink. Never fails the caller.
    pub(crate) async fn record_audit(&self, event: AuditEvent) {
        let action = event.action.clone();
        let entity_id = event.entity_id.clone();

        if let Err(e) = self.audit.record(event).await {
            warn!(action = %action, entity_id = %entity_id, error = %e, "Audit event not recorded");
        }
    }
}
