//! Shared application state

use sqlx::PgPool;
use std::sync::Arc;
use vetly_billing::{LimitEnforcer, PlanCatalog, PlanChangeService, StripeClient, TenantProvisioner};

use crate::config::Config;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub stripe: StripeClient,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, stripe: StripeClient) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            stripe,
        }
    }

    pub fn provisioner(&self) -> TenantProvisioner {
        TenantProvisioner::new(self.pool.clone())
    }

    pub fn plan_catalog(&self) -> PlanCatalog {
        PlanCatalog::new(self.pool.clone())
    }

    pub fn plan_change(&self) -> PlanChangeService {
        PlanChangeService::new(self.stripe.clone(), self.pool.clone())
    }

    pub fn limits(&self) -> LimitEnforcer {
        LimitEnforcer::new(self.pool.clone())
    }
}
