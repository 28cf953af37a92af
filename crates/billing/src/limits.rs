//! Usage limit enforcement
//!
//! Answers "may this tenant add one more X?" by comparing current usage
//! counters against the plan's limits.

use sqlx::PgPool;
use uuid::Uuid;
use vetly_shared::{LimitResource, PlanKey, UNLIMITED};

use crate::error::{BillingError, BillingResult};

/// Core limit check: `UNLIMITED` (-1) always allows, otherwise the increment
/// is permitted while usage is strictly below the limit.
///
/// Pure and deterministic; callers supply both inputs.
pub fn limit_allows(usage: i64, limit: i64) -> bool {
    limit == UNLIMITED || usage < limit
}

/// Result of a limit check for one resource
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct LimitDecision {
    pub resource: LimitResource,
    pub allowed: bool,
    pub usage: i64,
    pub limit: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    plan_key: PlanKey,
    total_pets: i64,
    total_users: i64,
    total_cash_registers: i64,
    storage_used_mb: i64,
    whatsapp_messages_this_month: i64,
}

impl UsageRow {
    fn usage_for(&self, resource: LimitResource) -> i64 {
        match resource {
            LimitResource::Pets => self.total_pets,
            LimitResource::Users => self.total_users,
            LimitResource::StorageMb => self.storage_used_mb,
            LimitResource::CashRegisters => self.total_cash_registers,
            LimitResource::WhatsappMessages => self.whatsapp_messages_this_month,
        }
    }
}

/// Service deciding whether a tenant may consume one more unit of a resource
#[derive(Clone)]
pub struct LimitEnforcer {
    pool: PgPool,
}

impl LimitEnforcer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether the tenant may add one more unit of `resource`.
    ///
    /// The plan limits are resolved from the tenant's current plan at read
    /// time; nothing is mutated by this call.
    pub async fn check_increment(
        &self,
        tenant_id: Uuid,
        resource: LimitResource,
    ) -> BillingResult<LimitDecision> {
        let row: Option<UsageRow> = sqlx::query_as(
            r#"
            SELECT s.plan_key, u.total_pets, u.total_users, u.total_cash_registers,
                   u.storage_used_mb, u.whatsapp_messages_this_month
            FROM tenant_subscriptions s
            JOIN tenant_usage_stats u ON u.tenant_id = s.tenant_id
            WHERE s.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let row =
            row.ok_or_else(|| BillingError::SubscriptionNotFound(tenant_id.to_string()))?;

        let limits = row.plan_key.limits();
        let usage = row.usage_for(resource);
        let limit = limits.limit_for(resource);

        Ok(LimitDecision {
            resource,
            allowed: limit_allows(usage, limit),
            usage,
            limit,
        })
    }
}
