//! Stripe Checkout sessions

use sqlx::PgPool;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCustomer, Customer, CustomerId,
};
use uuid::Uuid;
use vetly_shared::BillingInterval;

use crate::catalog::Plan;
use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Checkout service for creating Stripe checkout sessions
pub struct CheckoutService {
    stripe: StripeClient,
    pool: PgPool,
}

impl CheckoutService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Reuse the tenant's Stripe customer, creating one on first use
    async fn ensure_customer(&self, tenant_id: Uuid) -> BillingResult<String> {
        let row: Option<(Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT s.stripe_customer_id, t.name
            FROM tenant_subscriptions s
            JOIN tenants t ON t.id = s.tenant_id
            WHERE s.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let (customer_id, tenant_name) =
            row.ok_or_else(|| BillingError::SubscriptionNotFound(tenant_id.to_string()))?;

        if let Some(id) = customer_id {
            return Ok(id);
        }

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("tenant_id".to_string(), tenant_id.to_string());

        let mut params = CreateCustomer::new();
        params.name = Some(&tenant_name);
        params.metadata = Some(metadata);

        let customer = Customer::create(self.stripe.inner(), params).await?;

        sqlx::query(
            "UPDATE tenant_subscriptions SET stripe_customer_id = $1, updated_at = NOW() WHERE tenant_id = $2",
        )
        .bind(customer.id.as_str())
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            customer_id = %customer.id,
            "Created Stripe customer for tenant"
        );

        Ok(customer.id.to_string())
    }

    /// Create a checkout session that collects payment for the given plan.
    ///
    /// The session metadata carries everything the payment provider's webhook
    /// needs to confirm the conversion; the subscription rows are not touched
    /// here.
    pub async fn create_plan_checkout(
        &self,
        tenant_id: Uuid,
        plan: &Plan,
        billing_interval: BillingInterval,
        from_trial: bool,
    ) -> BillingResult<CheckoutSession> {
        let price_id = self
            .stripe
            .config()
            .price_id_for(plan.key, billing_interval)
            .ok_or_else(|| {
                BillingError::PlanNotFound(format!(
                    "{} ({} pricing not configured)",
                    plan.key, billing_interval
                ))
            })?
            .to_string();

        let customer_id = self.ensure_customer(tenant_id).await?;
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)))?;

        let base_url = &self.stripe.config().app_base_url;
        let success_url = format!(
            "{}/billing/success?session_id={{CHECKOUT_SESSION_ID}}",
            base_url
        );
        let cancel_url = format!("{}/billing/cancel", base_url);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("tenant_id".to_string(), tenant_id.to_string());
        metadata.insert("plan_key".to_string(), plan.key.to_string());
        metadata.insert("billing_interval".to_string(), billing_interval.to_string());
        metadata.insert("from_trial".to_string(), from_trial.to_string());

        let line_items = vec![CreateCheckoutSessionLineItems {
            price: Some(price_id),
            quantity: Some(1),
            ..Default::default()
        }];

        let params = CreateCheckoutSession {
            customer: Some(customer_id),
            mode: Some(CheckoutSessionMode::Subscription),
            line_items: Some(line_items),
            success_url: Some(&success_url),
            cancel_url: Some(&cancel_url),
            metadata: Some(metadata),
            allow_promotion_codes: Some(true),
            billing_address_collection: Some(stripe::CheckoutSessionBillingAddressCollection::Auto),
            ..Default::default()
        };

        let session = CheckoutSession::create(self.stripe.inner(), params).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            session_id = %session.id,
            plan = %plan.key,
            billing_interval = %billing_interval,
            from_trial,
            "Created checkout session"
        );

        Ok(session)
    }

    /// Retrieve a checkout session by ID
    pub async fn get_session(&self, session_id: &str) -> BillingResult<CheckoutSession> {
        let session_id = session_id
            .parse::<stripe::CheckoutSessionId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid session ID: {}", e)))?;

        let session = CheckoutSession::retrieve(self.stripe.inner(), &session_id, &[]).await?;
        Ok(session)
    }
}

/// Response for creating a checkout session
#[derive(Debug, serde::Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            session_id: session.id.to_string(),
            url: session.url,
        }
    }
}
