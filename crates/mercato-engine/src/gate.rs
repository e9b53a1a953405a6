//! # Usage Gate
//!
//! Compares a tenant's usage to its plan before a gated mutation, and
//! short-circuits before any transaction opens. Counters bumped inside a
//! transaction are re-checked there with [`UsageGate::enforce`] against the
//! row the transaction reads.
//!
//! ```text
//! Subscription::check(kind, warn%)
//!      │
//!      ├── Allowed  → Ok
//!      ├── Warning  → Ok, logged at warn
//!      └── Denied   → ServiceError::UsageLimitExceeded
//! ```
//!
//! A tenant without a subscription row is refused with `NotFound`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use mercato_core::{Denial, Subscription, UsageCheck, UsageKind};
use mercato_db::{Database, RepositoryAccess};

use crate::error::{ServiceError, ServiceResult};

/// Read port for tenant subscriptions.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn subscription(&self, tenant_id: &str) -> ServiceResult<Option<Subscription>>;
}

#[async_trait]
impl SubscriptionSource for Database {
    async fn subscription(&self, tenant_id: &str) -> ServiceResult<Option<Subscription>> {
        let mut session = self.session().await?;
        Ok(session.subscriptions().get(tenant_id).await?)
    }
}

#[derive(Clone)]
pub struct UsageGate {
    source: Arc<dyn SubscriptionSource>,
    warning_percent: u8,
}

impl UsageGate {
    pub fn new(source: Arc<dyn SubscriptionSource>, warning_percent: u8) -> Self {
        UsageGate {
            source,
            warning_percent,
        }
    }

    /// Checks one more unit of `kind` for the tenant.
    pub async fn check(&self, tenant_id: &str, kind: UsageKind) -> ServiceResult<UsageCheck> {
        let subscription = self
            .source
            .subscription(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subscription", tenant_id))?;

        self.enforce(&subscription, kind)
    }

    /// Checks one more unit of `kind` against an already loaded row.
    pub fn enforce(&self, subscription: &Subscription, kind: UsageKind) -> ServiceResult<UsageCheck> {
        let tenant_id = &subscription.tenant_id;
        match subscription.check(kind, self.warning_percent) {
            UsageCheck::Denied { kind, denial } => {
                let reason = match denial {
                    Denial::LimitReached { used, limit } => {
                        format!("{} of {} used on the {} plan", used, limit, subscription.plan)
                    }
                    Denial::Inactive(status) => format!("subscription is {}", status),
                };
                warn!(tenant_id = %tenant_id, kind = %kind, reason = %reason, "Usage denied");
                Err(ServiceError::UsageLimitExceeded { kind, reason })
            }
            UsageCheck::Warning { kind, used, limit } => {
                warn!(
                    tenant_id = %tenant_id,
                    kind = %kind,
                    used,
                    limit,
                    "Approaching plan limit"
                );
                Ok(UsageCheck::Warning { kind, used, limit })
            }
            UsageCheck::Allowed => Ok(UsageCheck::Allowed),
        }
    }

    pub async fn can_add_user(&self, tenant_id: &str) -> ServiceResult<UsageCheck> {
        self.check(tenant_id, UsageKind::Users).await
    }

    pub async fn can_add_product(&self, tenant_id: &str) -> ServiceResult<UsageCheck> {
        self.check(tenant_id, UsageKind::Products).await
    }

    pub async fn can_process_sale(&self, tenant_id: &str) -> ServiceResult<UsageCheck> {
        self.check(tenant_id, UsageKind::SalesThisMonth).await
    }

    pub async fn can_call_api(&self, tenant_id: &str) -> ServiceResult<UsageCheck> {
        self.check(tenant_id, UsageKind::ApiCallsThisMonth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use mercato_core::{Plan, SubscriptionStatus};
    use std::collections::HashMap;

    struct FakeSubscriptions(HashMap<String, Subscription>);

    #[async_trait]
    impl SubscriptionSource for FakeSubscriptions {
        async fn subscription(&self, tenant_id: &str) -> ServiceResult<Option<Subscription>> {
            Ok(self.0.get(tenant_id).cloned())
        }
    }

    fn gate_with(sub: Subscription) -> UsageGate {
        let map = HashMap::from([(sub.tenant_id.clone(), sub)]);
        UsageGate::new(Arc::new(FakeSubscriptions(map)), 80)
    }

    #[tokio::test]
    async fn test_allowed_warning_denied() {
        let mut sub = Subscription::new("t", Plan::Free);

        sub.sales_this_month = 10;
        let gate = gate_with(sub.clone());
        assert_eq!(gate.can_process_sale("t").await.unwrap(), UsageCheck::Allowed);

        sub.sales_this_month = 85;
        let gate = gate_with(sub.clone());
        assert!(matches!(
            gate.can_process_sale("t").await.unwrap(),
            UsageCheck::Warning { used: 85, limit: 100, .. }
        ));

        sub.sales_this_month = 100;
        let gate = gate_with(sub);
        let err = gate.can_process_sale("t").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UsageLimitExceeded);
        assert!(err.to_string().contains("100 of 100"));
    }

    #[tokio::test]
    async fn test_inactive_subscription_denies() {
        let mut sub = Subscription::new("t", Plan::Enterprise);
        sub.status = SubscriptionStatus::Cancelled;
        let gate = gate_with(sub);

        for result in [
            gate.can_add_user("t").await,
            gate.can_add_product("t").await,
            gate.can_call_api("t").await,
        ] {
            assert!(matches!(
                result,
                Err(ServiceError::UsageLimitExceeded { ref reason, .. }) if reason.contains("cancelled")
            ));
        }
    }

    #[test]
    fn test_enforce_uses_the_given_row() {
        let mut stale = Subscription::new("t", Plan::Free);
        stale.sales_this_month = 3;
        let gate = gate_with(stale);

        let mut current = Subscription::new("t", Plan::Free);
        current.sales_this_month = 100;
        let err = gate
            .enforce(&current, UsageKind::SalesThisMonth)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UsageLimitExceeded);
    }

    #[tokio::test]
    async fn test_missing_subscription() {
        let gate = UsageGate::new(Arc::new(FakeSubscriptions(HashMap::new())), 80);
        let err = gate.can_add_product("nobody").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
