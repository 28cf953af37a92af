//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use vetly_billing::BillingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Resource already exists")]
    Conflict(String),

    // Billing errors
    #[error("Payment required")]
    PaymentRequired,
    #[error("Usage limit exceeded")]
    UsageLimitExceeded,
    #[error("Billing provider error")]
    BillingUpstream(String),

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),

            // Billing
            ApiError::PaymentRequired => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED", self.to_string()),
            ApiError::UsageLimitExceeded => (StatusCode::PAYMENT_REQUIRED, "USAGE_LIMIT_EXCEEDED", self.to_string()),
            ApiError::BillingUpstream(_) => (StatusCode::BAD_GATEWAY, "BILLING_UPSTREAM", "Billing provider error".to_string()),

            // Internal
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", "Database error".to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // PostgreSQL unique violation
                    if code == "23505" {
                        return ApiError::Conflict("Resource already exists".to_string());
                    }
                }
                ApiError::Database(db_err.to_string())
            }
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(msg) | BillingError::InvalidInterval(msg) => {
                ApiError::Validation(msg)
            }
            BillingError::InvalidPlanChange(msg) => ApiError::BadRequest(msg),
            BillingError::SlugTaken(slug) => {
                ApiError::Conflict(format!("A tenant with slug '{}' already exists", slug))
            }
            BillingError::PlanNotFound(key) => ApiError::NotFound(format!("Plan not found: {}", key)),
            BillingError::TenantNotFound(id) => {
                ApiError::NotFound(format!("Tenant not found: {}", id))
            }
            BillingError::SubscriptionNotFound(id) => {
                ApiError::NotFound(format!("Subscription not found for tenant: {}", id))
            }
            BillingError::UserNotFound(id) => ApiError::NotFound(format!("User not found: {}", id)),
            BillingError::PaymentMethodRequired => ApiError::PaymentRequired,
            BillingError::StripeApi(msg) => {
                tracing::error!(error = %msg, "Billing provider call failed");
                ApiError::BillingUpstream(msg)
            }
            BillingError::Database(msg) => ApiError::Database(msg),
            BillingError::Config(msg) | BillingError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal billing error");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_conflict_maps_to_conflict() {
        let err: ApiError = BillingError::SlugTaken("test-clinic".to_string()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_unknown_plan_maps_to_not_found() {
        let err: ApiError = BillingError::PlanNotFound("PLATINUM".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_stripe_failure_maps_to_upstream() {
        let err: ApiError = BillingError::StripeApi("boom".to_string()).into();
        assert!(matches!(err, ApiError::BillingUpstream(_)));
    }
}
