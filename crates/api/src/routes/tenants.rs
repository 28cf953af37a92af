//! Tenant management routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use vetly_billing::NewTenant;
use vetly_shared::{BillingInterval, PlanKey, PlanLimits, SubscriptionStatus};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub slug: String,
    pub user_id: Uuid,
    pub plan_key: String,
    pub billing_interval: String,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_status: SubscriptionStatus,
    pub is_trial_period: bool,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub plan_key: PlanKey,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub current_period_end: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct CreateTenantResponse {
    pub tenant: TenantResponse,
    pub subscription: SubscriptionSummary,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub tenant_id: Uuid,
    pub plan_key: PlanKey,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub is_trial_period: bool,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub current_period_end: Option<OffsetDateTime>,
    pub days_left_in_trial: Option<i64>,
    pub limits: PlanLimits,
    pub usage: UsageCounters,
}

#[derive(Debug, Serialize)]
pub struct UsageCounters {
    pub pets: i64,
    pub users: i64,
    pub cash_registers: i64,
    pub storage_mb: i64,
    pub whatsapp_messages_this_month: i64,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct TenantRow {
    subscription_status: SubscriptionStatus,
    is_trial_period: bool,
    trial_ends_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    plan_key: PlanKey,
    status: SubscriptionStatus,
    billing_interval: BillingInterval,
    current_period_end: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
struct UsageRow {
    total_pets: i64,
    total_users: i64,
    total_cash_registers: i64,
    storage_used_mb: i64,
    whatsapp_messages_this_month: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new tenant with its trial subscription and default rows
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<CreateTenantResponse>)> {
    if !state.config.enable_signup {
        return Err(ApiError::ServiceUnavailable);
    }

    let provisioned = state
        .provisioner()
        .provision(NewTenant {
            name: req.name,
            slug: req.slug,
            user_id: req.user_id,
            plan_key: req.plan_key,
            billing_interval: req.billing_interval,
        })
        .await?;

    let tenant = provisioned.tenant;
    let subscription = provisioned.subscription;

    Ok((
        StatusCode::CREATED,
        Json(CreateTenantResponse {
            tenant: TenantResponse {
                id: tenant.id,
                name: tenant.name,
                slug: tenant.slug,
                subscription_status: tenant.subscription_status,
                is_trial_period: tenant.is_trial_period,
                trial_ends_at: tenant.trial_ends_at,
                created_at: tenant.created_at,
            },
            subscription: SubscriptionSummary {
                plan_key: subscription.plan_key,
                status: subscription.status,
                billing_interval: subscription.billing_interval,
                current_period_end: subscription.current_period_end,
            },
        }),
    ))
}

/// Get subscription details, plan limits, and current usage for a tenant.
/// This is the data source feature gates read.
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let tenant: Option<TenantRow> = sqlx::query_as(
        "SELECT subscription_status, is_trial_period, trial_ends_at FROM tenants WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(&state.pool)
    .await?;

    let tenant =
        tenant.ok_or_else(|| ApiError::NotFound(format!("Tenant not found: {}", tenant_id)))?;

    let sub: SubscriptionRow = sqlx::query_as(
        r#"
        SELECT plan_key, status, billing_interval, current_period_end
        FROM tenant_subscriptions
        WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id)
    .fetch_one(&state.pool)
    .await?;

    let usage: UsageRow = sqlx::query_as(
        r#"
        SELECT total_pets, total_users, total_cash_registers,
               storage_used_mb, whatsapp_messages_this_month
        FROM tenant_usage_stats
        WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id)
    .fetch_one(&state.pool)
    .await?;

    let days_left_in_trial = if tenant.is_trial_period {
        tenant
            .trial_ends_at
            .map(|ends| (ends - OffsetDateTime::now_utc()).whole_days().max(0))
    } else {
        None
    };

    Ok(Json(SubscriptionResponse {
        tenant_id,
        plan_key: sub.plan_key,
        status: sub.status,
        billing_interval: sub.billing_interval,
        is_trial_period: tenant.is_trial_period,
        trial_ends_at: tenant.trial_ends_at,
        current_period_end: sub.current_period_end,
        days_left_in_trial,
        limits: sub.plan_key.limits(),
        usage: UsageCounters {
            pets: usage.total_pets,
            users: usage.total_users,
            cash_registers: usage.total_cash_registers,
            storage_mb: usage.storage_used_mb,
            whatsapp_messages_this_month: usage.whatsapp_messages_this_month,
        },
    }))
}
