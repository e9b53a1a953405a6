//! # Subscription Module
//!
//! Plans, their limits, and the usage evaluation behind the usage gate.
//!
//! ## Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check(kind)                                                            │
//! │     │                                                                   │
//! │     ├── status != active           → Denied (Inactive)                  │
//! │     ├── limit == None (unlimited)  → Allowed                            │
//! │     ├── used >= limit              → Denied (LimitReached)              │
//! │     ├── used >= limit × warn%      → Warning                            │
//! │     └── otherwise                  → Allowed                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default warning threshold, percent of the plan limit.
pub const DEFAULT_WARNING_PERCENT: u8 = 80;

// =============================================================================
// Plan
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Professional,
    Enterprise,
}

/// Per-plan ceilings. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: Option<i64>,
    pub max_products: Option<i64>,
    pub max_sales_per_month: Option<i64>,
    pub max_api_calls_per_month: Option<i64>,
}

impl Plan {
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                max_users: Some(1),
                max_products: Some(50),
                max_sales_per_month: Some(100),
                max_api_calls_per_month: Some(1_000),
            },
            Plan::Basic => PlanLimits {
                max_users: Some(3),
                max_products: Some(500),
                max_sales_per_month: Some(1_000),
                max_api_calls_per_month: Some(10_000),
            },
            Plan::Professional => PlanLimits {
                max_users: Some(10),
                max_products: Some(5_000),
                max_sales_per_month: Some(10_000),
                max_api_calls_per_month: Some(100_000),
            },
            Plan::Enterprise => PlanLimits {
                max_users: None,
                max_products: None,
                max_sales_per_month: None,
                max_api_calls_per_month: None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Basic => "basic",
            Plan::Professional => "professional",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Subscription Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        })
    }
}

// =============================================================================
// Usage
// =============================================================================

/// A gated resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Users,
    Products,
    SalesThisMonth,
    ApiCallsThisMonth,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UsageKind::Users => "users",
            UsageKind::Products => "products",
            UsageKind::SalesThisMonth => "sales this month",
            UsageKind::ApiCallsThisMonth => "API calls this month",
        })
    }
}

/// Why a gated action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    LimitReached { used: i64, limit: i64 },
    Inactive(SubscriptionStatus),
}

/// Outcome of a usage check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageCheck {
    Allowed,
    /// Allowed, but usage crossed the warning threshold.
    Warning { kind: UsageKind, used: i64, limit: i64 },
    Denied { kind: UsageKind, denial: Denial },
}

impl UsageCheck {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, UsageCheck::Denied { .. })
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A tenant's subscription and its running usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subscription {
    pub tenant_id: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub users: i64,
    pub products: i64,
    pub sales_this_month: i64,
    pub api_calls_this_month: i64,
    pub period_start: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A fresh active subscription with zeroed counters.
    pub fn new(tenant_id: &str, plan: Plan) -> Self {
        let now = Utc::now();
        Subscription {
            tenant_id: tenant_id.to_string(),
            plan,
            status: SubscriptionStatus::Active,
            users: 0,
            products: 0,
            sales_this_month: 0,
            api_calls_this_month: 0,
            period_start: now,
            updated_at: now,
        }
    }

    pub fn usage(&self, kind: UsageKind) -> i64 {
        match kind {
            UsageKind::Users => self.users,
            UsageKind::Products => self.products,
            UsageKind::SalesThisMonth => self.sales_this_month,
            UsageKind::ApiCallsThisMonth => self.api_calls_this_month,
        }
    }

    pub fn limit(&self, kind: UsageKind) -> Option<i64> {
        let limits = self.plan.limits();
        match kind {
            UsageKind::Users => limits.max_users,
            UsageKind::Products => limits.max_products,
            UsageKind::SalesThisMonth => limits.max_sales_per_month,
            UsageKind::ApiCallsThisMonth => limits.max_api_calls_per_month,
        }
    }

    /// Evaluates one more unit of `kind` against the plan.
    pub fn check(&self, kind: UsageKind, warning_percent: u8) -> UsageCheck {
        if self.status != SubscriptionStatus::Active {
            return UsageCheck::Denied {
                kind,
                denial: Denial::Inactive(self.status),
            };
        }

        let Some(limit) = self.limit(kind) else {
            return UsageCheck::Allowed;
        };
        let used = self.usage(kind);

        if used >= limit {
            return UsageCheck::Denied {
                kind,
                denial: Denial::LimitReached { used, limit },
            };
        }

        if used * 100 >= limit * i64::from(warning_percent) {
            return UsageCheck::Warning { kind, used, limit };
        }

        UsageCheck::Allowed
    }

    pub fn can_add_user(&self, warning_percent: u8) -> UsageCheck {
        self.check(UsageKind::Users, warning_percent)
    }

    pub fn can_add_product(&self, warning_percent: u8) -> UsageCheck {
        self.check(UsageKind::Products, warning_percent)
    }

    pub fn can_process_sale(&self, warning_percent: u8) -> UsageCheck {
        self.check(UsageKind::SalesThisMonth, warning_percent)
    }

    pub fn can_call_api(&self, warning_percent: u8) -> UsageCheck {
        self.check(UsageKind::ApiCallsThisMonth, warning_percent)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn free_with_products(products: i64) -> Subscription {
        let mut s = Subscription::new("tenant-1", Plan::Free);
        s.products = products;
        s
    }

    #[test]
    fn test_below_threshold_allowed() {
        let s = free_with_products(10);
        assert_eq!(s.can_add_product(80), UsageCheck::Allowed);
    }

    #[test]
    fn test_warning_at_eighty_percent() {
        let s = free_with_products(40);
        assert_eq!(
            s.can_add_product(DEFAULT_WARNING_PERCENT),
            UsageCheck::Warning {
                kind: UsageKind::Products,
                used: 40,
                limit: 50
            }
        );
        assert!(s.can_add_product(DEFAULT_WARNING_PERCENT).is_allowed());
    }

    #[test]
    fn test_denied_at_limit() {
        let s = free_with_products(50);
        let check = s.can_add_product(80);
        assert!(!check.is_allowed());
        assert_eq!(
            check,
            UsageCheck::Denied {
                kind: UsageKind::Products,
                denial: Denial::LimitReached { used: 50, limit: 50 }
            }
        );
    }

    #[test]
    fn test_inactive_subscription_denies_everything() {
        let mut s = free_with_products(0);
        s.status = SubscriptionStatus::PastDue;

        for check in [
            s.can_add_user(80),
            s.can_add_product(80),
            s.can_process_sale(80),
            s.can_call_api(80),
        ] {
            assert!(matches!(
                check,
                UsageCheck::Denied {
                    denial: Denial::Inactive(SubscriptionStatus::PastDue),
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_unlimited_never_warns() {
        let mut s = Subscription::new("tenant-1", Plan::Enterprise);
        s.sales_this_month = 1_000_000;
        assert_eq!(s.can_process_sale(80), UsageCheck::Allowed);
    }

    #[test]
    fn test_configurable_threshold() {
        let s = free_with_products(30);
        assert_eq!(s.can_add_product(80), UsageCheck::Allowed);
        assert!(matches!(s.can_add_product(50), UsageCheck::Warning { .. }));
    }
}
