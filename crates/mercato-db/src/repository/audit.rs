//! # Audit Log Repository
//!
//! Snapshots are stored as JSON text.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use mercato_core::AuditEvent;

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: String,
    tenant_id: String,
    actor_id: String,
    entity_type: String,
    entity_id: String,
    action: String,
    old_value: Option<String>,
    new_value: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_event(self) -> DbResult<AuditEvent> {
        Ok(AuditEvent {
            id: self.id,
            tenant_id: self.tenant_id,
            actor_id: self.actor_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            old_value: parse_json(self.old_value)?,
            new_value: parse_json(self.new_value)?,
            occurred_at: self.occurred_at,
        })
    }
}

fn parse_json(raw: Option<String>) -> DbResult<Option<Value>> {
    raw.map(|s| serde_json::from_str(&s)).transpose().map_err(Into::into)
}

/// Repository for the audit trail.
pub struct AuditLogRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AuditLogRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AuditLogRepository { conn }
    }

    pub async fn insert(&mut self, event: &AuditEvent) -> DbResult<()> {
        debug!(
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = %event.action,
            "Writing audit event"
        );

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, tenant_id, actor_id, entity_type, entity_id,
                action, old_value, new_value, occurred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&event.id)
        .bind(&event.tenant_id)
        .bind(&event.actor_id)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.action)
        .bind(event.old_value.as_ref().map(Value::to_string))
        .bind(event.new_value.as_ref().map(Value::to_string))
        .bind(event.occurred_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// An entity's trail, oldest first.
    pub async fn list_for_entity(
        &mut self,
        tenant_id: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, tenant_id, actor_id, entity_type, entity_id,
                   action, old_value, new_value, occurred_at
            FROM audit_log
            WHERE tenant_id = ?1 AND entity_type = ?2 AND entity_id = ?3
            ORDER BY seq
            "#,
        )
        .bind(tenant_id)
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(AuditRow::into_event).collect()
    }
}
