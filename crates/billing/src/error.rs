//! Billing error types

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe API error: {0}")]
    StripeApi(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Subscription not found for tenant: {0}")]
    SubscriptionNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Tenant slug already in use: {0}")]
    SlugTaken(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid billing interval: {0}")]
    InvalidInterval(String),

    #[error("Plan change not allowed: {0}")]
    InvalidPlanChange(String),

    #[error("Payment method required for this operation")]
    PaymentMethodRequired,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::StripeApi(err.to_string())
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(err.to_string())
    }
}

impl From<vetly_shared::VetError> for BillingError {
    fn from(err: vetly_shared::VetError) -> Self {
        use vetly_shared::VetError;
        match err {
            VetError::Validation(msg) => BillingError::Validation(msg),
            VetError::NotFound(msg) => BillingError::TenantNotFound(msg),
            VetError::Conflict(msg) => BillingError::SlugTaken(msg),
            VetError::Billing(msg) => BillingError::Internal(msg),
            VetError::Internal(msg) => BillingError::Internal(msg),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
