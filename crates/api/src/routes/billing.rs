//! Subscription billing routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use vetly_billing::{LimitDecision, Plan, PlanChangeOutcome, PlanChangeRequest};
use vetly_shared::LimitResource;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub target_plan: String,
    pub billing_interval: String,
    pub from_trial: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LimitCheckRequest {
    pub resource: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the plan catalog
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<Plan>>> {
    let plans = state.plan_catalog().list().await?;
    Ok(Json(plans))
}

/// Change a tenant's subscription plan.
///
/// Returns either a `trial_conversion` (checkout redirect, subscription
/// untouched) or a `subscription_upgrade` (applied immediately, with the
/// proration charged on the existing subscription).
pub async fn change_plan(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<ChangePlanRequest>,
) -> ApiResult<Json<PlanChangeOutcome>> {
    let outcome = state
        .plan_change()
        .change_plan(
            tenant_id,
            PlanChangeRequest {
                target_plan: req.target_plan,
                billing_interval: req.billing_interval,
                from_trial: req.from_trial,
            },
        )
        .await?;

    Ok(Json(outcome))
}

/// Check whether the tenant may add one more unit of a gated resource
pub async fn check_limit(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<LimitCheckRequest>,
) -> ApiResult<Json<LimitDecision>> {
    let resource: LimitResource = req
        .resource
        .parse()
        .map_err(|e: String| ApiError::Validation(e))?;

    let decision = state.limits().check_increment(tenant_id, resource).await?;
    Ok(Json(decision))
}
