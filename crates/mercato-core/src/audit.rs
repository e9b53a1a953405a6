//! # Audit Module
//!
//! The record emitted after a committed mutation. Delivery is the engine's
//! concern; this is only the value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::permissions::Actor;

/// What happened, to which entity, by whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub tenant_id: String,
    pub actor_id: String,
    /// e.g. `"sale"`, `"stock"`, `"product"`.
    pub entity_type: String,
    pub entity_id: String,
    /// e.g. `"sale.completed"`, `"stock.adjusted"`.
    pub action: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(actor: &Actor, entity_type: &str, entity_id: &str, action: &str) -> Self {
        AuditEvent {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            actor_id: actor.user_id.clone(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            old_value: None,
            new_value: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attaches before/after snapshots. Serialization failures leave the
    /// snapshot empty rather than failing the event.
    pub fn with_change<O: Serialize, N: Serialize>(mut self, old: Option<&O>, new: Option<&N>) -> Self {
        self.old_value = old.and_then(|v| serde_json::to_value(v).ok());
        self.new_value = new.and_then(|v| serde_json::to_value(v).ok());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Role;
    use serde_json::json;

    #[test]
    fn test_event_carries_actor_and_change() {
        let actor = Actor::new("user-1", "tenant-1", Role::Manager);
        let event = AuditEvent::new(&actor, "stock", "stock-1", "stock.adjusted")
            .with_change(Some(&json!({"available": 10})), Some(&json!({"available": 7})));

        assert_eq!(event.tenant_id, "tenant-1");
        assert_eq!(event.actor_id, "user-1");
        assert_eq!(event.old_value, Some(json!({"available": 10})));
        assert_eq!(event.new_value, Some(json!({"available": 7})));
    }
}
