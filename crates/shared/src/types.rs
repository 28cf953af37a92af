//! Common types used across Vetly

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Sentinel limit value meaning "no limit enforced"
pub const UNLIMITED: i64 = -1;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Tenant (clinic) ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// User ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Plan ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub Uuid);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PlanId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Subscription plan key, ranked by tier: BASICO < PROFESIONAL < CLINICA < EMPRESA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanKey {
    Basico,
    Profesional,
    Clinica,
    Empresa,
}

impl Default for PlanKey {
    fn default() -> Self {
        Self::Basico
    }
}

impl PlanKey {
    /// Rank used for upgrade/downgrade comparison (higher = bigger plan)
    pub fn tier(&self) -> u8 {
        match self {
            Self::Basico => 0,
            Self::Profesional => 1,
            Self::Clinica => 2,
            Self::Empresa => 3,
        }
    }

    /// Default limits for this plan.
    ///
    /// Resolved per-tenant at read time; `UNLIMITED` (-1) disables enforcement
    /// for that resource. The catalog table is seeded from the same values.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Self::Basico => PlanLimits {
                max_pets: 100,
                max_users: 3,
                max_storage_mb: 1024,
                max_cash_registers: 1,
                max_whatsapp_messages: UNLIMITED,
            },
            Self::Profesional => PlanLimits {
                max_pets: 500,
                max_users: 10,
                max_storage_mb: 5120,
                max_cash_registers: 2,
                max_whatsapp_messages: 1000,
            },
            Self::Clinica => PlanLimits {
                max_pets: 2000,
                max_users: 25,
                max_storage_mb: 20480,
                max_cash_registers: 5,
                max_whatsapp_messages: 5000,
            },
            Self::Empresa => PlanLimits {
                max_pets: UNLIMITED,
                max_users: UNLIMITED,
                max_storage_mb: UNLIMITED,
                max_cash_registers: UNLIMITED,
                max_whatsapp_messages: UNLIMITED,
            },
        }
    }

    /// Monthly price in cents. BASICO is the free default plan.
    pub fn monthly_price_cents(&self) -> i64 {
        match self {
            Self::Basico => 0,
            Self::Profesional => 2_900,
            Self::Clinica => 7_900,
            Self::Empresa => 19_900,
        }
    }

    /// Yearly price in cents (20% discount over 12 monthly payments)
    pub fn yearly_price_cents(&self) -> i64 {
        match self {
            Self::Basico => 0,
            Self::Profesional => 27_840,
            Self::Clinica => 75_840,
            Self::Empresa => 191_040,
        }
    }

    /// Whether switching to this plan requires collecting payment
    pub fn requires_payment(&self) -> bool {
        self.monthly_price_cents() > 0
    }
}

impl std::fmt::Display for PlanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basico => write!(f, "BASICO"),
            Self::Profesional => write!(f, "PROFESIONAL"),
            Self::Clinica => write!(f, "CLINICA"),
            Self::Empresa => write!(f, "EMPRESA"),
        }
    }
}

impl std::str::FromStr for PlanKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BASICO" => Ok(Self::Basico),
            "PROFESIONAL" => Ok(Self::Profesional),
            "CLINICA" => Ok(Self::Clinica),
            "EMPRESA" => Ok(Self::Empresa),
            _ => Err(format!("Invalid plan key: {}", s)),
        }
    }
}

/// Subscription status, mirrored on both the tenant row and its subscription row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Trialing
    }
}

impl SubscriptionStatus {
    pub fn is_trial(&self) -> bool {
        matches!(self, Self::Trialing)
    }

    /// Plan changes are only accepted from these states
    pub fn can_change_plan(&self) -> bool {
        matches!(self, Self::Trialing | Self::Active)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trialing => write!(f, "TRIALING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::PastDue => write!(f, "PAST_DUE"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRIALING" => Ok(Self::Trialing),
            "ACTIVE" => Ok(Self::Active),
            "PAST_DUE" => Ok(Self::PastDue),
            "CANCELED" => Ok(Self::Canceled),
            "UNPAID" => Ok(Self::Unpaid),
            "INCOMPLETE" => Ok(Self::Incomplete),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// Billing interval for subscriptions.
///
/// The signup entry point says "yearly" and the upgrade entry point says
/// "annual"; both parse to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    #[default]
    Monthly,
    Yearly,
}

impl BillingInterval {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" => Some(Self::Monthly),
            "yearly" | "annual" | "year" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// Gated resource kind for limit checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitResource {
    Pets,
    Users,
    StorageMb,
    CashRegisters,
    WhatsappMessages,
}

impl std::fmt::Display for LimitResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pets => write!(f, "pets"),
            Self::Users => write!(f, "users"),
            Self::StorageMb => write!(f, "storage_mb"),
            Self::CashRegisters => write!(f, "cash_registers"),
            Self::WhatsappMessages => write!(f, "whatsapp_messages"),
        }
    }
}

impl std::str::FromStr for LimitResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pets" => Ok(Self::Pets),
            "users" => Ok(Self::Users),
            "storage_mb" | "storage" => Ok(Self::StorageMb),
            "cash_registers" => Ok(Self::CashRegisters),
            "whatsapp_messages" | "whatsapp" => Ok(Self::WhatsappMessages),
            _ => Err(format!("Invalid limit resource: {}", s)),
        }
    }
}

// =============================================================================
// Plan Limits
// =============================================================================

/// Immutable per-plan limits, `UNLIMITED` (-1) meaning no cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_pets: i64,
    pub max_users: i64,
    pub max_storage_mb: i64,
    pub max_cash_registers: i64,
    pub max_whatsapp_messages: i64,
}

impl PlanLimits {
    /// Limit value for a given gated resource
    pub fn limit_for(&self, resource: LimitResource) -> i64 {
        match resource {
            LimitResource::Pets => self.max_pets,
            LimitResource::Users => self.max_users,
            LimitResource::StorageMb => self.max_storage_mb,
            LimitResource::CashRegisters => self.max_cash_registers,
            LimitResource::WhatsappMessages => self.max_whatsapp_messages,
        }
    }
}

// =============================================================================
// Database Models
// =============================================================================

/// Tenant (clinic) model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_status: SubscriptionStatus,
    pub is_trial_period: bool,
    pub trial_ends_at: Option<OffsetDateTime>,
    /// Soft-disable marker; tenants are never hard-deleted in normal operation
    pub disabled_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Tenant subscription model (one-to-one with Tenant).
///
/// `status` must always agree with `Tenant.subscription_status`, and
/// `current_period_end` equals `Tenant.trial_ends_at` while trialing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantSubscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub plan_key: PlanKey,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub current_period_end: Option<OffsetDateTime>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Tenant settings model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantSettings {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub timezone: String,
    pub currency: String,
    pub settings: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Tenant usage counters, incremented by downstream feature code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantUsageStats {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub total_pets: i64,
    pub total_users: i64,
    pub total_cash_registers: i64,
    pub storage_used_mb: i64,
    pub whatsapp_messages_this_month: i64,
    pub updated_at: OffsetDateTime,
}

/// Tenant-scoped role model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key: String,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// Link between a user and a tenant-scoped role
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRoleAssignment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// User model (identity exists before any tenant does)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub tenant_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // PlanKey Tests
    // =========================================================================

    #[test]
    fn test_plan_key_default() {
        assert_eq!(PlanKey::default(), PlanKey::Basico);
    }

    #[test]
    fn test_plan_key_tier_ordering() {
        assert!(PlanKey::Basico.tier() < PlanKey::Profesional.tier());
        assert!(PlanKey::Profesional.tier() < PlanKey::Clinica.tier());
        assert!(PlanKey::Clinica.tier() < PlanKey::Empresa.tier());
    }

    #[test]
    fn test_plan_key_limits() {
        let basico = PlanKey::Basico.limits();
        assert_eq!(basico.max_pets, 100);
        assert_eq!(basico.max_users, 3);
        // WhatsApp is unlimited on the default plan
        assert_eq!(basico.max_whatsapp_messages, UNLIMITED);

        let empresa = PlanKey::Empresa.limits();
        assert_eq!(empresa.max_pets, UNLIMITED);
        assert_eq!(empresa.max_users, UNLIMITED);
        assert_eq!(empresa.max_cash_registers, UNLIMITED);
    }

    #[test]
    fn test_plan_key_requires_payment() {
        assert!(!PlanKey::Basico.requires_payment());
        assert!(PlanKey::Profesional.requires_payment());
        assert!(PlanKey::Clinica.requires_payment());
        assert!(PlanKey::Empresa.requires_payment());
    }

    #[test]
    fn test_plan_key_yearly_discount() {
        // Yearly price is 20% off twelve monthly payments
        for key in [PlanKey::Profesional, PlanKey::Clinica, PlanKey::Empresa] {
            let full_year = key.monthly_price_cents() * 12;
            assert_eq!(key.yearly_price_cents(), full_year * 80 / 100);
        }
    }

    #[test]
    fn test_plan_key_display() {
        assert_eq!(format!("{}", PlanKey::Basico), "BASICO");
        assert_eq!(format!("{}", PlanKey::Profesional), "PROFESIONAL");
        assert_eq!(format!("{}", PlanKey::Clinica), "CLINICA");
        assert_eq!(format!("{}", PlanKey::Empresa), "EMPRESA");
    }

    #[test]
    fn test_plan_key_from_str() {
        assert_eq!("PROFESIONAL".parse::<PlanKey>().unwrap(), PlanKey::Profesional);
        assert_eq!("profesional".parse::<PlanKey>().unwrap(), PlanKey::Profesional);
        assert_eq!("Empresa".parse::<PlanKey>().unwrap(), PlanKey::Empresa);
        assert!("premium".parse::<PlanKey>().is_err());
    }

    // =========================================================================
    // SubscriptionStatus Tests
    // =========================================================================

    #[test]
    fn test_subscription_status_default() {
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Trialing);
    }

    #[test]
    fn test_subscription_status_can_change_plan() {
        assert!(SubscriptionStatus::Trialing.can_change_plan());
        assert!(SubscriptionStatus::Active.can_change_plan());
        assert!(!SubscriptionStatus::PastDue.can_change_plan());
        assert!(!SubscriptionStatus::Canceled.can_change_plan());
        assert!(!SubscriptionStatus::Unpaid.can_change_plan());
        assert!(!SubscriptionStatus::Incomplete.can_change_plan());
    }

    #[test]
    fn test_subscription_status_display_and_parse() {
        assert_eq!(format!("{}", SubscriptionStatus::Trialing), "TRIALING");
        assert_eq!(format!("{}", SubscriptionStatus::PastDue), "PAST_DUE");
        assert_eq!(
            "TRIALING".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Trialing
        );
        assert_eq!(
            "past_due".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::PastDue
        );
        assert!("invalid".parse::<SubscriptionStatus>().is_err());
    }

    // =========================================================================
    // BillingInterval Tests
    // =========================================================================

    #[test]
    fn test_billing_interval_aliases() {
        assert_eq!(BillingInterval::from_str("monthly"), Some(BillingInterval::Monthly));
        assert_eq!(BillingInterval::from_str("month"), Some(BillingInterval::Monthly));
        // Signup says "yearly", upgrade says "annual" - same interval
        assert_eq!(BillingInterval::from_str("yearly"), Some(BillingInterval::Yearly));
        assert_eq!(BillingInterval::from_str("annual"), Some(BillingInterval::Yearly));
        assert_eq!(BillingInterval::from_str("weekly"), None);
    }

    // =========================================================================
    // LimitResource / PlanLimits Tests
    // =========================================================================

    #[test]
    fn test_limit_resource_parse() {
        assert_eq!("pets".parse::<LimitResource>().unwrap(), LimitResource::Pets);
        assert_eq!(
            "whatsapp".parse::<LimitResource>().unwrap(),
            LimitResource::WhatsappMessages
        );
        assert!("appointments".parse::<LimitResource>().is_err());
    }

    #[test]
    fn test_plan_limits_limit_for() {
        let limits = PlanKey::Profesional.limits();
        assert_eq!(limits.limit_for(LimitResource::Pets), 500);
        assert_eq!(limits.limit_for(LimitResource::Users), 10);
        assert_eq!(limits.limit_for(LimitResource::CashRegisters), 2);
    }

    // =========================================================================
    // ID Wrapper Tests
    // =========================================================================

    #[test]
    fn test_tenant_id_new() {
        let id1 = TenantId::new();
        let id2 = TenantId::new();
        assert_ne!(id1, id2); // Each new ID should be unique
    }

    #[test]
    fn test_user_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let user_id: UserId = uuid.into();
        assert_eq!(user_id.0, uuid);
    }
}
