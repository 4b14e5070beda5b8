//! Tariff configuration aggregate: one version of a rate schedule.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequential identity assigned by the store on create.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TariffId(pub u64);

impl fmt::Display for TariffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state. Single source of truth; there is no separate "active" flag.
///
/// Draft -> Active -> {Paused <-> Active} -> Finalized. Finalized is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffState {
    Draft,
    Active,
    Paused,
    Finalized,
}

impl TariffState {
    /// Field edits are allowed only in Draft or Paused.
    pub fn is_editable(&self) -> bool {
        matches!(self, TariffState::Draft | TariffState::Paused)
    }
}

/// Customer category (socio-economic class of the connection).
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Residential,
    Commercial,
    Industrial,
    Senior,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Residential,
        Category::Commercial,
        Category::Industrial,
        Category::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Residential => "residential",
            Category::Commercial => "commercial",
            Category::Industrial => "industrial",
            Category::Senior => "senior",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "residential" => Ok(Category::Residential),
            "commercial" => Ok(Category::Commercial),
            "industrial" => Ok(Category::Industrial),
            "senior" => Ok(Category::Senior),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

/// One amount per category. Every category is mandatory, so lookups are total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRates {
    pub residential: Decimal,
    pub commercial: Decimal,
    pub industrial: Decimal,
    pub senior: Decimal,
}

impl CategoryRates {
    pub fn uniform(amount: Decimal) -> Self {
        CategoryRates {
            residential: amount,
            commercial: amount,
            industrial: amount,
            senior: amount,
        }
    }

    pub fn get(&self, category: Category) -> Decimal {
        match category {
            Category::Residential => self.residential,
            Category::Commercial => self.commercial,
            Category::Industrial => self.industrial,
            Category::Senior => self.senior,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Decimal)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Consumption band in m³. `upper_bound: None` means unbounded (last tier only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rates: CategoryRates,
}

impl Tier {
    pub fn is_unbounded(&self) -> bool {
        self.upper_bound.is_none()
    }
}

/// Month-range multiplier on consumption cost. `start_month > end_month` wraps the year end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalAdjustment {
    pub name: String,
    pub start_month: u32,
    pub end_month: u32,
    pub multiplier: Decimal,
}

impl SeasonalAdjustment {
    pub fn covers(&self, month: u32) -> bool {
        if self.start_month <= self.end_month {
            self.start_month <= month && month <= self.end_month
        } else {
            month >= self.start_month || month <= self.end_month
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
    MinConsumptionThreshold,
}

/// All present conditions must hold for a rule to apply.
///
/// `consecutive_months` is carried but not evaluated here: the caller confirms payment
/// history before billing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountConditions {
    #[serde(default)]
    pub min_consumption: Option<Decimal>,
    #[serde(default)]
    pub max_consumption: Option<Decimal>,
    #[serde(default)]
    pub eligible_categories: Option<Vec<Category>>,
    #[serde(default)]
    pub consecutive_months: Option<u32>,
    #[serde(default)]
    pub requires_early_payment: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub kind: DiscountKind,
    pub name: String,
    pub value: Decimal,
    #[serde(default)]
    pub conditions: DiscountConditions,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Late-payment policy. `reconnection_fee` is applied by whoever reconnects service,
/// never by the bill calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    pub grace_days: u32,
    pub daily_penalty_percent: Decimal,
    pub max_penalty_percent: Decimal,
    pub reconnection_fee: Decimal,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        LateFeePolicy {
            grace_days: 0,
            daily_penalty_percent: Decimal::ZERO,
            max_penalty_percent: Decimal::ZERO,
            reconnection_fee: Decimal::ZERO,
        }
    }
}

/// Government subsidy settings. Stored and validated; not applied by `billing::calculate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSubsidy {
    pub enabled: bool,
    pub percent: Decimal,
    pub max_consumption: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationSettings {
    pub rounding_decimals: u32,
    pub apply_tax: bool,
    #[serde(default)]
    pub tax_percent: Option<Decimal>,
    #[serde(default)]
    pub state_subsidy: StateSubsidy,
}

impl Default for ComputationSettings {
    fn default() -> Self {
        ComputationSettings {
            rounding_decimals: 0,
            apply_tax: false,
            tax_percent: None,
            state_subsidy: StateSubsidy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub modified_by: String,
    pub modified_at: DateTime<Utc>,
}

impl AuditTrail {
    pub fn new(actor: &str, at: DateTime<Utc>) -> Self {
        AuditTrail {
            created_by: actor.to_string(),
            created_at: at,
            modified_by: actor.to_string(),
            modified_at: at,
        }
    }

    pub fn touch(&mut self, actor: &str, at: DateTime<Utc>) {
        self.modified_by = actor.to_string();
        self.modified_at = at;
    }
}

/// Editable content of a configuration, as submitted on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub effective_from: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub fixed_charge: CategoryRates,
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub seasonal_adjustments: Vec<SeasonalAdjustment>,
    #[serde(default)]
    pub discount_rules: Vec<DiscountRule>,
    #[serde(default)]
    pub late_fee_policy: LateFeePolicy,
    #[serde(default)]
    pub computation_settings: ComputationSettings,
}

/// Partial edit. Absent fields are left untouched; `clear_expiry` removes `expires_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub effective_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_expiry: bool,
    #[serde(default)]
    pub fixed_charge: Option<CategoryRates>,
    #[serde(default)]
    pub tiers: Option<Vec<Tier>>,
    #[serde(default)]
    pub seasonal_adjustments: Option<Vec<SeasonalAdjustment>>,
    #[serde(default)]
    pub discount_rules: Option<Vec<DiscountRule>>,
    #[serde(default)]
    pub late_fee_policy: Option<LateFeePolicy>,
    #[serde(default)]
    pub computation_settings: Option<ComputationSettings>,
}

/// Tariff configuration aggregate.
///
/// Invariants (enforced by `tariff::validation` and `tariff::apply`):
/// - Tiers are ascending, contiguous from 0, with only the last one unbounded
/// - `effective_from <= expires_at` when an expiry is set at create/update time
/// - At most one configuration in a book is `Active`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffConfiguration {
    pub id: TariffId,
    pub name: String,
    pub description: String,
    pub state: TariffState,
    pub effective_from: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub fixed_charge: CategoryRates,
    pub tiers: Vec<Tier>,
    pub seasonal_adjustments: Vec<SeasonalAdjustment>,
    pub discount_rules: Vec<DiscountRule>,
    pub late_fee_policy: LateFeePolicy,
    pub computation_settings: ComputationSettings,
    pub audit: AuditTrail,
}

impl TariffConfiguration {
    /// Materialize a draft as a new Draft-state configuration.
    pub fn from_draft(id: TariffId, draft: TariffDraft, actor: &str, at: DateTime<Utc>) -> Self {
        TariffConfiguration {
            id,
            name: draft.name,
            description: draft.description,
            state: TariffState::Draft,
            effective_from: draft.effective_from,
            expires_at: draft.expires_at,
            paused_at: None,
            fixed_charge: draft.fixed_charge,
            tiers: draft.tiers,
            seasonal_adjustments: draft.seasonal_adjustments,
            discount_rules: draft.discount_rules,
            late_fee_policy: draft.late_fee_policy,
            computation_settings: draft.computation_settings,
            audit: AuditTrail::new(actor, at),
        }
    }

    /// Apply a patch in place. Does not check state or validity; callers do.
    pub fn apply_patch(&mut self, patch: TariffPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(effective_from) = patch.effective_from {
            self.effective_from = effective_from;
        }
        if patch.clear_expiry {
            self.expires_at = None;
        } else if let Some(expires_at) = patch.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(fixed_charge) = patch.fixed_charge {
            self.fixed_charge = fixed_charge;
        }
        if let Some(tiers) = patch.tiers {
            self.tiers = tiers;
        }
        if let Some(seasonal) = patch.seasonal_adjustments {
            self.seasonal_adjustments = seasonal;
        }
        if let Some(rules) = patch.discount_rules {
            self.discount_rules = rules;
        }
        if let Some(policy) = patch.late_fee_policy {
            self.late_fee_policy = policy;
        }
        if let Some(settings) = patch.computation_settings {
            self.computation_settings = settings;
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TariffState::Active
    }

    /// Active and inside its effective window at `at`.
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active()
            && self.effective_from <= at
            && self.expires_at.map_or(true, |expires| expires >= at)
    }

    /// SHA256 (hex) of the canonical bincode encoding. Two results computed from the
    /// same configuration carry the same fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = bincode::serialize(self)
            .map_err(|e| Error::Storage(format!("Failed to encode configuration {}: {}", self.id, e)))?;
        Ok(crate::sha256_hex(&bytes))
    }
}
