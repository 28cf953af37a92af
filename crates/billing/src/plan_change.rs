//! Plan change orchestration
//!
//! Moves a subscription between plans and billing intervals. Changes that
//! need payment collection hand off to a hosted checkout session; changes on
//! an existing paid subscription are applied immediately with proration.

use serde::Serialize;
use sqlx::PgPool;
use stripe::{Expandable, Subscription, SubscriptionId, UpdateSubscription, UpdateSubscriptionItems};
// Import the proration behavior enum from the subscription module (not subscription_item)
use stripe::generated::billing::subscription::SubscriptionProrationBehavior;
use time::OffsetDateTime;
use uuid::Uuid;
use vetly_shared::{BillingInterval, PlanKey, SubscriptionStatus};

use crate::catalog::{Plan, PlanCatalog};
use crate::checkout::CheckoutService;
use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Request to move a tenant's subscription to another plan/interval
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlanChangeRequest {
    pub target_plan: String,
    pub billing_interval: String,
    /// Defaults to the subscription's current trial state when omitted
    pub from_trial: Option<bool>,
}

/// Discriminated outcome of a plan change
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanChangeOutcome {
    /// Payment must be collected first: the subscription is untouched and the
    /// caller is redirected to a hosted checkout. The payment provider's
    /// webhook confirms the conversion asynchronously.
    TrialConversion {
        checkout_url: String,
        session_id: String,
    },
    /// The change was applied immediately on the existing paid subscription
    SubscriptionUpgrade {
        proration_amount_cents: i64,
        proration_date: OffsetDateTime,
        new_recurring_price_cents: i64,
    },
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionStateRow {
    plan_key: PlanKey,
    status: SubscriptionStatus,
    stripe_subscription_id: Option<String>,
}

/// Service orchestrating plan and interval changes
#[derive(Clone)]
pub struct PlanChangeService {
    stripe: StripeClient,
    pool: PgPool,
}

impl PlanChangeService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Change a tenant's plan.
    ///
    /// Accepted only while the subscription is TRIALING or ACTIVE. Upgrade
    /// vs. downgrade is derived from plan ranks for the log line; both flow
    /// through the same change path.
    pub async fn change_plan(
        &self,
        tenant_id: Uuid,
        req: PlanChangeRequest,
    ) -> BillingResult<PlanChangeOutcome> {
        let interval = BillingInterval::from_str(&req.billing_interval)
            .ok_or_else(|| BillingError::InvalidInterval(req.billing_interval.clone()))?;

        let catalog = PlanCatalog::new(self.pool.clone());
        let plan = catalog.get_by_key(&req.target_plan).await?;

        let current: Option<SubscriptionStateRow> = sqlx::query_as(
            r#"
            SELECT plan_key, status, stripe_subscription_id
            FROM tenant_subscriptions
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let current =
            current.ok_or_else(|| BillingError::SubscriptionNotFound(tenant_id.to_string()))?;

        if !current.status.can_change_plan() {
            return Err(BillingError::InvalidPlanChange(format!(
                "Cannot change plan while subscription is {}",
                current.status
            )));
        }

        let is_downgrade = plan.key.tier() < current.plan_key.tier();
        let from_trial = req.from_trial.unwrap_or_else(|| current.status.is_trial());

        tracing::info!(
            tenant_id = %tenant_id,
            from_plan = %current.plan_key,
            to_plan = %plan.key,
            billing_interval = %interval,
            is_downgrade,
            from_trial,
            "Starting plan change"
        );

        // No payment method on file yet: collect payment via hosted checkout
        // before touching the subscription.
        if plan.requires_payment() && current.stripe_subscription_id.is_none() {
            let checkout = CheckoutService::new(self.stripe.clone(), self.pool.clone());
            let session = checkout
                .create_plan_checkout(tenant_id, &plan, interval, from_trial)
                .await?;

            let checkout_url = session.url.clone().ok_or_else(|| {
                BillingError::StripeApi("Checkout session has no URL".to_string())
            })?;

            tracing::info!(
                tenant_id = %tenant_id,
                session_id = %session.id,
                plan = %plan.key,
                "Created conversion checkout session"
            );

            return Ok(PlanChangeOutcome::TrialConversion {
                checkout_url,
                session_id: session.id.to_string(),
            });
        }

        if let Some(ref sub_id) = current.stripe_subscription_id {
            // Already paying: change the Stripe subscription in place, then
            // persist the new plan to both rows.
            let outcome = self
                .change_paid_subscription(tenant_id, sub_id, &plan, interval)
                .await?;
            return Ok(outcome);
        }

        // Free target with no Stripe subscription: nothing to charge
        self.apply_plan_change(tenant_id, &plan, interval).await?;
        Ok(PlanChangeOutcome::SubscriptionUpgrade {
            proration_amount_cents: 0,
            proration_date: OffsetDateTime::now_utc(),
            new_recurring_price_cents: 0,
        })
    }

    /// Change the plan on an existing paid Stripe subscription
    async fn change_paid_subscription(
        &self,
        tenant_id: Uuid,
        sub_id: &str,
        plan: &Plan,
        interval: BillingInterval,
    ) -> BillingResult<PlanChangeOutcome> {
        let sub_id: SubscriptionId = sub_id
            .parse()
            .map_err(|e| BillingError::StripeApi(format!("Invalid subscription ID: {}", e)))?;

        let stripe_sub = Subscription::retrieve(self.stripe.inner(), &sub_id, &[]).await?;

        if !plan.requires_payment() {
            // Downgrading to the free plan: let the paid subscription run out
            // instead of swapping its price.
            let params = UpdateSubscription {
                cancel_at_period_end: Some(true),
                ..Default::default()
            };
            Subscription::update(self.stripe.inner(), &sub_id, params).await?;

            self.apply_plan_change(tenant_id, plan, interval).await?;

            tracing::info!(
                tenant_id = %tenant_id,
                subscription_id = %sub_id,
                "Downgraded to free plan, Stripe subscription set to cancel at period end"
            );

            return Ok(PlanChangeOutcome::SubscriptionUpgrade {
                proration_amount_cents: 0,
                proration_date: OffsetDateTime::now_utc(),
                new_recurring_price_cents: 0,
            });
        }

        let item_id = stripe_sub
            .items
            .data
            .first()
            .map(|item| item.id.clone())
            .ok_or_else(|| BillingError::Internal("No subscription items found".to_string()))?;

        let customer_id = match &stripe_sub.customer {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(customer) => customer.id.to_string(),
        };

        let price_id = self
            .stripe
            .config()
            .price_id_for(plan.key, interval)
            .ok_or_else(|| {
                BillingError::PlanNotFound(format!(
                    "{} ({} pricing not configured)",
                    plan.key, interval
                ))
            })?
            .to_string();

        let proration_amount_cents = self
            .preview_proration(&customer_id, &sub_id, item_id.as_ref(), &price_id)
            .await?;

        // Stripe reports period boundaries as unix timestamps
        let now_ts = chrono::Utc::now().timestamp();
        let days_remaining =
            ((stripe_sub.current_period_end - now_ts) as f64 / 86400.0).ceil() as i32;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("tenant_id".to_string(), tenant_id.to_string());
        metadata.insert("plan_key".to_string(), plan.key.to_string());

        // Explicitly enable proration so the tenant is charged/credited the
        // difference for the remainder of the period
        let params = UpdateSubscription {
            items: Some(vec![UpdateSubscriptionItems {
                id: Some(item_id.to_string()),
                price: Some(price_id.clone()),
                ..Default::default()
            }]),
            metadata: Some(metadata),
            proration_behavior: Some(SubscriptionProrationBehavior::CreateProrations),
            ..Default::default()
        };

        Subscription::update(self.stripe.inner(), &sub_id, params)
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("no attached payment source")
                    || err_str.contains("no default payment method")
                {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        error = %err_str,
                        "Subscription update failed: customer has no payment method"
                    );
                    return BillingError::PaymentMethodRequired;
                }
                BillingError::StripeApi(err_str)
            })?;

        self.apply_plan_change(tenant_id, plan, interval).await?;

        let proration_date = OffsetDateTime::now_utc();

        tracing::info!(
            tenant_id = %tenant_id,
            subscription_id = %sub_id,
            plan = %plan.key,
            proration_amount_cents,
            days_remaining,
            "Changed paid subscription plan"
        );

        Ok(PlanChangeOutcome::SubscriptionUpgrade {
            proration_amount_cents,
            proration_date,
            new_recurring_price_cents: plan.price_for_interval(interval),
        })
    }

    /// Preview the prorated amount for swapping the subscription item's price.
    ///
    /// Uses the POST /invoices/create_preview API (the old GET
    /// /invoices/upcoming is deprecated), which async-stripe 0.39 does not
    /// expose, so the call goes through reqwest directly.
    async fn preview_proration(
        &self,
        customer_id: &str,
        sub_id: &SubscriptionId,
        item_id: &str,
        new_price_id: &str,
    ) -> BillingResult<i64> {
        let form_params = [
            ("customer", customer_id),
            ("subscription", sub_id.as_ref()),
            ("subscription_details[items][0][id]", item_id),
            ("subscription_details[items][0][price]", new_price_id),
            (
                "subscription_details[proration_behavior]",
                "create_prorations",
            ),
        ];

        let client = reqwest::Client::new();
        let response = client
            .post("https://api.stripe.com/v1/invoices/create_preview")
            .bearer_auth(&self.stripe.config().secret_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| BillingError::StripeApi(format!("Failed to call Stripe API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                error_body = %error_body,
                "Stripe invoices/create_preview API failed"
            );
            return Err(BillingError::StripeApi(format!(
                "Stripe API error ({}): {}",
                status, error_body
            )));
        }

        let upcoming_invoice: serde_json::Value = response.json().await.map_err(|e| {
            BillingError::StripeApi(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(upcoming_invoice["amount_due"].as_i64().unwrap_or(0))
    }

    /// Persist the new plan and status to both the tenant row and its
    /// subscription row in one transaction, keeping the pair in agreement.
    async fn apply_plan_change(
        &self,
        tenant_id: Uuid,
        plan: &Plan,
        interval: BillingInterval,
    ) -> BillingResult<()> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tenants
            SET subscription_status = $1, is_trial_period = FALSE, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(SubscriptionStatus::Active)
        .bind(now)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tenant_subscriptions
            SET plan_id = $1, plan_key = $2, status = $3, billing_interval = $4, updated_at = $5
            WHERE tenant_id = $6
            "#,
        )
        .bind(plan.id)
        .bind(plan.key)
        .bind(SubscriptionStatus::Active)
        .bind(interval)
        .bind(now)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
