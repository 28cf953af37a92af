//! Integration tests for tenant provisioning and the trial subscription
//!
//! These tests verify that a new tenant and all of its companion rows are
//! created consistently, and that the tenant/subscription status pair stays
//! in agreement.
//!
//! ## Running Tests
//! ```bash
//! export DATABASE_URL="postgres://..."
//! cargo test --test provisioning -- --ignored --test-threads=1
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use vetly_billing::{BillingError, NewTenant, TenantProvisioner, TRIAL_PERIOD_DAYS};
use vetly_shared::SubscriptionStatus;

// ============================================================================
// Test Utilities
// ============================================================================

async fn setup_test_pool() -> PgPool {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    vetly_shared::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Create a user with no tenant attached
async fn create_test_user(pool: &PgPool) -> Uuid {
    let user_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, created_at, updated_at)
        VALUES ($1, $2, 'Test Owner', NOW(), NOW())
        "#,
    )
    .bind(user_id)
    .bind(format!("test-owner-{}@example.com", user_id))
    .execute(pool)
    .await
    .expect("Failed to create test user");

    user_id
}

fn unique_slug() -> String {
    format!("test-clinic-{}", Uuid::new_v4())
}

fn new_tenant_request(slug: &str, user_id: Uuid, plan_key: &str) -> NewTenant {
    NewTenant {
        name: "Test Clinic".to_string(),
        slug: slug.to_string(),
        user_id,
        plan_key: plan_key.to_string(),
        billing_interval: "monthly".to_string(),
    }
}

/// Cleanup test data after test completion.
/// Deletes in dependency order to respect foreign key constraints.
async fn cleanup_test_data(pool: &PgPool, tenant_slug: &str, user_id: Uuid) {
    let tenant_id: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE slug = $1")
        .bind(tenant_slug)
        .fetch_optional(pool)
        .await
        .unwrap_or(None);

    if let Some((tenant_id,)) = tenant_id {
        sqlx::query("DELETE FROM user_roles WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok(); // Ignore errors during cleanup

        sqlx::query("DELETE FROM roles WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();

        sqlx::query("DELETE FROM tenant_subscriptions WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();

        sqlx::query("DELETE FROM tenant_usage_stats WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();

        sqlx::query("DELETE FROM tenant_settings WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();

        sqlx::query("UPDATE users SET tenant_id = NULL WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();

        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .execute(pool)
            .await
            .ok();
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .ok();
}

// ============================================================================
// Provisioning Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires database
async fn test_provision_creates_trial_tenant() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let before = OffsetDateTime::now_utc();
    let provisioned = provisioner
        .provision(new_tenant_request(&slug, user_id, "PROFESIONAL"))
        .await
        .expect("Provisioning should succeed");
    let after = OffsetDateTime::now_utc();

    let tenant = &provisioned.tenant;
    assert_eq!(tenant.subscription_status, SubscriptionStatus::Trialing);
    assert!(tenant.is_trial_period);

    // Trial ends 30 days out; 29-31 day window absorbs clock skew between
    // computation and assertion
    let trial_ends_at = tenant.trial_ends_at.expect("trial_ends_at must be set");
    assert!(trial_ends_at > before + Duration::days(TRIAL_PERIOD_DAYS - 1));
    assert!(trial_ends_at < after + Duration::days(TRIAL_PERIOD_DAYS + 1));

    // The persisted row agrees with the returned struct
    let (db_status, db_trial): (SubscriptionStatus, bool) = sqlx::query_as(
        "SELECT subscription_status, is_trial_period FROM tenants WHERE id = $1",
    )
    .bind(tenant.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(db_status, SubscriptionStatus::Trialing);
    assert!(db_trial);

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_subscription_mirrors_tenant_state() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let provisioned = provisioner
        .provision(new_tenant_request(&slug, user_id, "PROFESIONAL"))
        .await
        .expect("Provisioning should succeed");

    // Status must agree across the tenant/subscription pair
    assert_eq!(
        provisioned.subscription.status,
        provisioned.tenant.subscription_status
    );

    // Period end equals the trial end within one second
    let trial_ends_at = provisioned.tenant.trial_ends_at.unwrap();
    let period_end = provisioned.subscription.current_period_end.unwrap();
    let drift = (period_end - trial_ends_at).abs();
    assert!(drift < Duration::seconds(1), "drift was {}", drift);

    // Same invariant on the persisted rows
    let (db_status, db_period_end): (SubscriptionStatus, OffsetDateTime) = sqlx::query_as(
        "SELECT status, current_period_end FROM tenant_subscriptions WHERE tenant_id = $1",
    )
    .bind(provisioned.tenant.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(db_status, SubscriptionStatus::Trialing);
    assert!((db_period_end - trial_ends_at).abs() < Duration::seconds(1));

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_default_roles_and_admin_link() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let provisioned = provisioner
        .provision(new_tenant_request(&slug, user_id, "BASICO"))
        .await
        .expect("Provisioning should succeed");
    let tenant_id = provisioned.tenant.id;

    let (role_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(role_count >= 3, "expected at least 3 default roles");

    // The creating user is linked to the admin role
    let admin_link: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT ur.id
        FROM user_roles ur
        JOIN roles r ON r.id = ur.role_id
        WHERE ur.tenant_id = $1 AND ur.user_id = $2 AND r.key = 'admin'
        "#,
    )
    .bind(tenant_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .unwrap();
    assert!(admin_link.is_some());

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_companion_rows_and_user_attachment() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let provisioned = provisioner
        .provision(new_tenant_request(&slug, user_id, "CLINICA"))
        .await
        .expect("Provisioning should succeed");
    let tenant_id = provisioned.tenant.id;

    // Usage stats start with the creating user counted
    let (total_users,): (i64,) =
        sqlx::query_as("SELECT total_users FROM tenant_usage_stats WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(total_users, 1);

    // Settings row exists
    let settings: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM tenant_settings WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(settings.is_some());

    // The creating user now belongs to the tenant
    let (user_tenant,): (Option<Uuid>,) =
        sqlx::query_as("SELECT tenant_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(user_tenant, Some(tenant_id));

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_duplicate_slug_conflicts_without_mutating_first_tenant() {
    let pool = setup_test_pool().await;
    let first_user = create_test_user(&pool).await;
    let second_user = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let first = provisioner
        .provision(new_tenant_request(&slug, first_user, "PROFESIONAL"))
        .await
        .expect("First provisioning should succeed");

    let second = provisioner
        .provision(new_tenant_request(&slug, second_user, "PROFESIONAL"))
        .await;
    assert!(matches!(second, Err(BillingError::SlugTaken(_))));

    // The first tenant is untouched
    let (name, updated_at): (String, OffsetDateTime) =
        sqlx::query_as("SELECT name, updated_at FROM tenants WHERE id = $1")
            .bind(first.tenant.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(name, first.tenant.name);
    assert!((updated_at - first.tenant.updated_at).abs() < Duration::seconds(1));

    // And only one tenant exists for the slug
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE slug = $1")
        .bind(&slug)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    cleanup_test_data(&pool, &slug, first_user).await;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(second_user)
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_unknown_plan_key_writes_nothing() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let result = provisioner
        .provision(new_tenant_request(&slug, user_id, "PLATINUM"))
        .await;
    assert!(matches!(result, Err(BillingError::PlanNotFound(_))));

    // The plan is resolved before the first write, so no tenant exists
    let tenant: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert!(tenant.is_none());

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_profesional_monthly_scenario() {
    let pool = setup_test_pool().await;
    let user_id = create_test_user(&pool).await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let provisioned = provisioner
        .provision(NewTenant {
            name: "Test Clinic".to_string(),
            slug: slug.clone(),
            user_id,
            plan_key: "PROFESIONAL".to_string(),
            billing_interval: "monthly".to_string(),
        })
        .await
        .expect("Provisioning should succeed");

    assert_eq!(
        provisioned.tenant.subscription_status,
        SubscriptionStatus::Trialing
    );
    assert_eq!(
        provisioned.subscription.plan_key,
        vetly_shared::PlanKey::Profesional
    );

    cleanup_test_data(&pool, &slug, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_missing_user_fails_before_any_write() {
    let pool = setup_test_pool().await;
    let slug = unique_slug();

    let provisioner = TenantProvisioner::new(pool.clone());
    let result = provisioner
        .provision(new_tenant_request(&slug, Uuid::new_v4(), "PROFESIONAL"))
        .await;
    assert!(matches!(result, Err(BillingError::UserNotFound(_))));

    let tenant: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tenants WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert!(tenant.is_none());
}
