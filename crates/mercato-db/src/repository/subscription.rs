//! # Subscription Repository
//!
//! One row per tenant: plan, status and the usage counters the gate reads.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mercato_core::{Subscription, UsageKind};

const SUBSCRIPTION_COLUMNS: &str = "tenant_id, plan, status, users, products, sales_this_month, \
     api_calls_this_month, period_start, updated_at";

/// Repository for tenant subscriptions.
pub struct SubscriptionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SubscriptionRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SubscriptionRepository { conn }
    }

    pub async fn get(&mut self, tenant_id: &str) -> DbResult<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE tenant_id = ?1");
        let subscription = sqlx::query_as::<_, Subscription>(&sql)
            .bind(tenant_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(subscription)
    }

    /// Inserts or replaces the tenant's subscription.
    pub async fn upsert(&mut self, subscription: &Subscription) -> DbResult<()> {
        debug!(
            tenant_id = %subscription.tenant_id,
            plan = %subscription.plan,
            status = %subscription.status,
            "Saving subscription"
        );

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                tenant_id, plan, status, users, products,
                sales_this_month, api_calls_this_month, period_start, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (tenant_id) DO UPDATE SET
                plan = excluded.plan,
                status = excluded.status,
                users = excluded.users,
                products = excluded.products,
                sales_this_month = excluded.sales_this_month,
                api_calls_this_month = excluded.api_calls_this_month,
                period_start = excluded.period_start,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&subscription.tenant_id)
        .bind(subscription.plan)
        .bind(subscription.status)
        .bind(subscription.users)
        .bind(subscription.products)
        .bind(subscription.sales_this_month)
        .bind(subscription.api_calls_this_month)
        .bind(subscription.period_start)
        .bind(subscription.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Adds `by` to one usage counter.
    pub async fn increment(&mut self, tenant_id: &str, kind: UsageKind, by: i64) -> DbResult<()> {
        let column = match kind {
            UsageKind::Users => "users",
            UsageKind::Products => "products",
            UsageKind::SalesThisMonth => "sales_this_month",
            UsageKind::ApiCallsThisMonth => "api_calls_this_month",
        };
        debug!(tenant_id = %tenant_id, counter = column, by, "Incrementing usage");

        let sql = format!(
            "UPDATE subscriptions SET {column} = {column} + ?2, updated_at = ?3 WHERE tenant_id = ?1"
        );
        let result = sqlx::query(&sql)
            .bind(tenant_id)
            .bind(by)
            .bind(Utc::now())
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Subscription", tenant_id));
        }

        Ok(())
    }
}
