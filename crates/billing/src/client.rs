//! Stripe client configuration

use stripe::Client;
use vetly_shared::{BillingInterval, PlanKey};

use crate::error::{BillingError, BillingResult};

/// Configuration for Stripe billing
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe secret API key
    pub secret_key: String,
    /// Price IDs for each paid plan
    pub price_ids: PriceIds,
    /// Base URL for success/cancel redirects
    pub app_base_url: String,
}

/// Stripe price IDs for the paid plans.
/// Plan hierarchy: BASICO (no price) → PROFESIONAL → CLINICA → EMPRESA
#[derive(Debug, Clone)]
pub struct PriceIds {
    // Monthly prices
    pub profesional: String,
    pub clinica: String,
    pub empresa: String,

    // Yearly prices (20% discount)
    pub profesional_yearly: Option<String>,
    pub clinica_yearly: Option<String>,
    pub empresa_yearly: Option<String>,
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Ok(Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY")
                .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?,
            price_ids: PriceIds {
                // Monthly prices (required)
                profesional: std::env::var("STRIPE_PRICE_PROFESIONAL").map_err(|_| {
                    BillingError::Config("STRIPE_PRICE_PROFESIONAL not set".to_string())
                })?,
                clinica: std::env::var("STRIPE_PRICE_CLINICA")
                    .map_err(|_| BillingError::Config("STRIPE_PRICE_CLINICA not set".to_string()))?,
                empresa: std::env::var("STRIPE_PRICE_EMPRESA")
                    .map_err(|_| BillingError::Config("STRIPE_PRICE_EMPRESA not set".to_string()))?,

                // Yearly prices (optional)
                profesional_yearly: std::env::var("STRIPE_PRICE_PROFESIONAL_YEARLY").ok(),
                clinica_yearly: std::env::var("STRIPE_PRICE_CLINICA_YEARLY").ok(),
                empresa_yearly: std::env::var("STRIPE_PRICE_EMPRESA_YEARLY").ok(),
            },
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Get price ID for a plan and billing interval.
    /// Returns None for BASICO (no payment) or missing yearly prices.
    pub fn price_id_for(&self, plan: PlanKey, interval: BillingInterval) -> Option<&str> {
        match (plan, interval) {
            (PlanKey::Basico, _) => None,
            (PlanKey::Profesional, BillingInterval::Monthly) => Some(&self.price_ids.profesional),
            (PlanKey::Clinica, BillingInterval::Monthly) => Some(&self.price_ids.clinica),
            (PlanKey::Empresa, BillingInterval::Monthly) => Some(&self.price_ids.empresa),
            (PlanKey::Profesional, BillingInterval::Yearly) => {
                self.price_ids.profesional_yearly.as_deref()
            }
            (PlanKey::Clinica, BillingInterval::Yearly) => self.price_ids.clinica_yearly.as_deref(),
            (PlanKey::Empresa, BillingInterval::Yearly) => self.price_ids.empresa_yearly.as_deref(),
        }
    }

    /// Get plan key from a price ID (handles both monthly and yearly prices)
    pub fn plan_for_price_id(&self, price_id: &str) -> Option<PlanKey> {
        if price_id == self.price_ids.profesional {
            Some(PlanKey::Profesional)
        } else if price_id == self.price_ids.clinica {
            Some(PlanKey::Clinica)
        } else if price_id == self.price_ids.empresa {
            Some(PlanKey::Empresa)
        } else if self.price_ids.profesional_yearly.as_deref() == Some(price_id) {
            Some(PlanKey::Profesional)
        } else if self.price_ids.clinica_yearly.as_deref() == Some(price_id) {
            Some(PlanKey::Clinica)
        } else if self.price_ids.empresa_yearly.as_deref() == Some(price_id) {
            Some(PlanKey::Empresa)
        } else {
            None
        }
    }
}

/// Stripe billing client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a new Stripe client from config
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::new(&config.secret_key);
        Self { client, config }
    }

    /// Create a new Stripe client from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the config
    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}
