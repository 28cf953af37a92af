//! Tenant provisioning
//!
//! Creates a tenant together with all of its companion rows (settings, usage
//! stats, default roles, admin link, trial subscription) as one unit of work.
//! The whole insert sequence runs in a single transaction: a failure at any
//! step leaves no partial state behind.

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use vetly_shared::{
    validate_slug, validate_tenant_name, BillingInterval, SubscriptionStatus, Tenant,
    TenantSubscription,
};

use crate::catalog::PlanCatalog;
use crate::error::{BillingError, BillingResult};

/// Length of the free trial granted to every new tenant
pub const TRIAL_PERIOD_DAYS: i64 = 30;

/// Roles seeded for every tenant; the creating user is linked to "admin"
const DEFAULT_ROLES: [(&str, &str); 3] = [
    ("admin", "Administrator"),
    ("veterinarian", "Veterinarian"),
    ("assistant", "Assistant"),
];

/// Input for tenant provisioning
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub slug: String,
    pub user_id: Uuid,
    pub plan_key: String,
    pub billing_interval: String,
}

/// A freshly provisioned tenant and its trial subscription
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub subscription: TenantSubscription,
}

/// Service that provisions new tenants with their default rows
#[derive(Clone)]
pub struct TenantProvisioner {
    pool: PgPool,
    catalog: PlanCatalog,
}

impl TenantProvisioner {
    pub fn new(pool: PgPool) -> Self {
        let catalog = PlanCatalog::new(pool.clone());
        Self { pool, catalog }
    }

    /// Provision a tenant: tenant row, settings, usage stats, default roles,
    /// admin role link, user attachment, and the trial subscription.
    ///
    /// Validation, plan resolution, and the slug uniqueness check all happen
    /// before the first write, so every failure before the transaction opens
    /// leaves zero rows behind; failures inside it roll everything back.
    pub async fn provision(&self, req: NewTenant) -> BillingResult<ProvisionedTenant> {
        validate_tenant_name(&req.name)?;
        validate_slug(&req.slug)?;

        let interval = BillingInterval::from_str(&req.billing_interval)
            .ok_or_else(|| BillingError::InvalidInterval(req.billing_interval.clone()))?;

        // Resolve the plan before any write. An unknown key can never strand
        // a subscription-less tenant.
        let plan = self.catalog.get_by_key(&req.plan_key).await?;

        // Check slug uniqueness before writing anything
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE slug = $1")
            .bind(&req.slug)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(BillingError::SlugTaken(req.slug.clone()));
        }

        // The creating user must already exist and not belong to a tenant
        let user: Option<(Uuid, Option<Uuid>)> =
            sqlx::query_as("SELECT id, tenant_id FROM users WHERE id = $1")
                .bind(req.user_id)
                .fetch_optional(&self.pool)
                .await?;

        match user {
            None => return Err(BillingError::UserNotFound(req.user_id.to_string())),
            Some((_, Some(_))) => {
                return Err(BillingError::Validation(
                    "User already belongs to a tenant".to_string(),
                ))
            }
            Some((_, None)) => {}
        }

        let now = OffsetDateTime::now_utc();
        // Single timestamp shared by the tenant's trial end and the
        // subscription's period end, keeping the two in exact agreement
        let trial_ends_at = now + Duration::days(TRIAL_PERIOD_DAYS);

        let tenant_id = Uuid::new_v4();
        let subscription_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        // 1. Tenant
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, slug, subscription_status, is_trial_period, trial_ends_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $6)
            "#,
        )
        .bind(tenant_id)
        .bind(req.name.trim())
        .bind(&req.slug)
        .bind(SubscriptionStatus::Trialing)
        .bind(trial_ends_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // 2. Settings
        sqlx::query(
            r#"
            INSERT INTO tenant_settings (id, tenant_id, settings, created_at, updated_at)
            VALUES ($1, $2, '{}', $3, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // 3. Usage stats - the creating user counts as the first member
        sqlx::query(
            r#"
            INSERT INTO tenant_usage_stats (id, tenant_id, total_users, updated_at)
            VALUES ($1, $2, 1, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // 4. Default roles
        let mut admin_role_id = None;
        for (key, name) in DEFAULT_ROLES {
            let role_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO roles (id, tenant_id, key, name, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(role_id)
            .bind(tenant_id)
            .bind(key)
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if key == "admin" {
                admin_role_id = Some(role_id);
            }
        }

        let admin_role_id = admin_role_id
            .ok_or_else(|| BillingError::Internal("Default roles missing admin".to_string()))?;

        // 5. Link the creating user to the admin role
        sqlx::query(
            r#"
            INSERT INTO user_roles (id, tenant_id, user_id, role_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(req.user_id)
        .bind(admin_role_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // 6. Attach the user to the tenant
        sqlx::query("UPDATE users SET tenant_id = $1, updated_at = $2 WHERE id = $3")
            .bind(tenant_id)
            .bind(now)
            .bind(req.user_id)
            .execute(&mut *tx)
            .await?;

        // 7. Trial subscription, period end stamped from the same timestamp
        //    as the tenant's trial end
        sqlx::query(
            r#"
            INSERT INTO tenant_subscriptions
                (id, tenant_id, plan_id, plan_key, status, billing_interval, current_period_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(subscription_id)
        .bind(tenant_id)
        .bind(plan.id)
        .bind(plan.key)
        .bind(SubscriptionStatus::Trialing)
        .bind(interval)
        .bind(trial_ends_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            slug = %req.slug,
            plan = %plan.key,
            trial_ends_at = %trial_ends_at,
            "Provisioned tenant with trial subscription"
        );

        Ok(ProvisionedTenant {
            tenant: Tenant {
                id: tenant_id,
                name: req.name.trim().to_string(),
                slug: req.slug,
                subscription_status: SubscriptionStatus::Trialing,
                is_trial_period: true,
                trial_ends_at: Some(trial_ends_at),
                disabled_at: None,
                created_at: now,
                updated_at: now,
            },
            subscription: TenantSubscription {
                id: subscription_id,
                tenant_id,
                plan_id: plan.id,
                plan_key: plan.key,
                status: SubscriptionStatus::Trialing,
                billing_interval: interval,
                current_period_end: Some(trial_ends_at),
                stripe_customer_id: None,
                stripe_subscription_id: None,
                created_at: now,
                updated_at: now,
            },
        })
    }
}
