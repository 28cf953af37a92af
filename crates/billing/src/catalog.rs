//! Plan catalog
//!
//! Read-only lookups of plan definitions. The `plans` table is seeded by
//! migration; the in-code constructors are the source of truth for defaults.

use sqlx::PgPool;
use uuid::Uuid;
use vetly_shared::{BillingInterval, PlanKey, PlanLimits};

use crate::error::{BillingError, BillingResult};

/// Subscription plan definition
#[derive(Debug, Clone, serde::Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub key: PlanKey,
    pub tier: i16,
    pub limits: PlanLimits,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
}

impl Plan {
    /// Price in cents for the given billing interval
    pub fn price_for_interval(&self, interval: BillingInterval) -> i64 {
        match interval {
            BillingInterval::Monthly => self.monthly_price_cents,
            BillingInterval::Yearly => self.yearly_price_cents,
        }
    }

    /// Whether switching to this plan requires collecting payment
    pub fn requires_payment(&self) -> bool {
        self.key.requires_payment()
    }

    fn from_key(id: Uuid, key: PlanKey) -> Self {
        Self {
            id,
            key,
            tier: key.tier() as i16,
            limits: key.limits(),
            monthly_price_cents: key.monthly_price_cents(),
            yearly_price_cents: key.yearly_price_cents(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    key: PlanKey,
    tier: i16,
    max_pets: i64,
    max_users: i64,
    max_storage_mb: i64,
    max_cash_registers: i64,
    max_whatsapp_messages: i64,
    monthly_price_cents: i32,
    yearly_price_cents: i32,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            tier: row.tier,
            limits: PlanLimits {
                max_pets: row.max_pets,
                max_users: row.max_users,
                max_storage_mb: row.max_storage_mb,
                max_cash_registers: row.max_cash_registers,
                max_whatsapp_messages: row.max_whatsapp_messages,
            },
            monthly_price_cents: row.monthly_price_cents as i64,
            yearly_price_cents: row.yearly_price_cents as i64,
        }
    }
}

/// Read-only plan catalog backed by the `plans` table
#[derive(Clone)]
pub struct PlanCatalog {
    pool: PgPool,
}

impl PlanCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a plan by its key string.
    ///
    /// Fails with `PlanNotFound` for keys outside the catalog; nothing is
    /// ever written through this service.
    pub async fn get_by_key(&self, key: &str) -> BillingResult<Plan> {
        let plan_key: PlanKey = key
            .parse()
            .map_err(|_| BillingError::PlanNotFound(key.to_string()))?;

        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, key, tier, max_pets, max_users, max_storage_mb,
                   max_cash_registers, max_whatsapp_messages,
                   monthly_price_cents, yearly_price_cents
            FROM plans
            WHERE key = $1
            "#,
        )
        .bind(plan_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Plan::from)
            .ok_or_else(|| BillingError::PlanNotFound(key.to_string()))
    }

    /// List the full catalog ordered by tier
    pub async fn list(&self) -> BillingResult<Vec<Plan>> {
        let rows: Vec<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, key, tier, max_pets, max_users, max_storage_mb,
                   max_cash_registers, max_whatsapp_messages,
                   monthly_price_cents, yearly_price_cents
            FROM plans
            ORDER BY tier ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Plan::from).collect())
    }
}

// Static constructors used by tests and by the seed data as reference values
impl Plan {
    /// BASICO: the free default plan (unlimited WhatsApp messages)
    pub fn basico() -> Self {
        Self::from_key(Uuid::new_v4(), PlanKey::Basico)
    }

    /// PROFESIONAL: single-vet practice
    pub fn profesional() -> Self {
        Self::from_key(Uuid::new_v4(), PlanKey::Profesional)
    }

    /// CLINICA: multi-vet clinic
    pub fn clinica() -> Self {
        Self::from_key(Uuid::new_v4(), PlanKey::Clinica)
    }

    /// EMPRESA: unlimited everything
    pub fn empresa() -> Self {
        Self::from_key(Uuid::new_v4(), PlanKey::Empresa)
    }
}
