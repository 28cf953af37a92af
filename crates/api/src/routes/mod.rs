//! API routes

pub mod billing;
pub mod health;
pub mod tenants;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let api_routes = Router::new()
        .route("/plans", get(billing::list_plans))
        .route("/tenants", post(tenants::create_tenant))
        .route(
            "/tenants/:tenant_id/subscription",
            get(tenants::get_subscription),
        )
        .route(
            "/tenants/:tenant_id/subscription/change-plan",
            post(billing::change_plan),
        )
        .route("/tenants/:tenant_id/limits/check", post(billing::check_limit));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}
