pub mod apply;
pub mod command;
pub mod configuration;
pub mod hook;
pub mod validation;

pub use apply::{apply, Transition};
pub use command::{StoreCommand, TariffCommand};
pub use configuration::{
    AuditTrail, Category, CategoryRates, ComputationSettings, DiscountConditions, DiscountKind,
    DiscountRule, LateFeePolicy, SeasonalAdjustment, StateSubsidy, TariffConfiguration,
    TariffDraft, TariffId, TariffPatch, TariffState, Tier,
};
pub use hook::{LifecycleHook, NoOpHook};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All tariff configurations known to the utility, keyed by id.
///
/// The book is a plain value: `apply` produces a new book per command, which is what
/// lets the store publish whole snapshots to readers.
///
/// Invariant: at most one configuration has `state == Active`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TariffBook {
    configurations: BTreeMap<TariffId, TariffConfiguration>,

    /// Last id handed out; ids are never reused after delete.
    last_id: u64,
}

impl TariffBook {
    /// Create an empty book
    pub fn new() -> Self {
        TariffBook {
            configurations: BTreeMap::new(),
            last_id: 0,
        }
    }

    /// Id the next Create will receive.
    pub fn next_id(&self) -> TariffId {
        TariffId(self.last_id + 1)
    }

    pub(crate) fn allocate_id(&mut self) -> TariffId {
        self.last_id += 1;
        TariffId(self.last_id)
    }

    pub fn get(&self, id: TariffId) -> Option<&TariffConfiguration> {
        self.configurations.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TariffId) -> Option<&mut TariffConfiguration> {
        self.configurations.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, config: TariffConfiguration) {
        self.last_id = self.last_id.max(config.id.0);
        self.configurations.insert(config.id, config);
    }

    pub(crate) fn remove(&mut self, id: TariffId) -> Option<TariffConfiguration> {
        self.configurations.remove(&id)
    }

    /// All configurations in id order.
    pub fn list(&self) -> impl Iterator<Item = &TariffConfiguration> {
        self.configurations.values()
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// The configuration currently in the Active state, regardless of dates.
    pub fn active(&self) -> Option<&TariffConfiguration> {
        self.configurations.values().find(|c| c.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.configurations.values().filter(|c| c.is_active()).count()
    }

    /// Resolve the configuration that governs billing at `at`.
    ///
    /// Matches the Active configuration whose `effective_from <= at` and whose
    /// `expires_at`, if any, is `>= at`. An Active configuration that is future-dated
    /// or already past its expiry does not match.
    pub fn resolve(&self, at: DateTime<Utc>) -> Result<&TariffConfiguration> {
        self.configurations
            .values()
            .find(|c| c.is_effective_at(at))
            .ok_or(Error::NoActiveConfiguration { at })
    }
}

impl Default for TariffBook {
    fn default() -> Self {
        TariffBook::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    /// Tier with the same rate for every category.
    pub fn tier(lower: i64, upper: Option<i64>, rate: i64) -> Tier {
        Tier {
            lower_bound: Decimal::from(lower),
            upper_bound: upper.map(Decimal::from),
            rates: CategoryRates::uniform(Decimal::from(rate)),
        }
    }

    /// Residential reference schedule: [0-10 -> 800][11-20 -> 1200][21+ -> 1800], fixed 12500.
    pub fn draft() -> TariffDraft {
        TariffDraft {
            name: "Tarifa 2025".to_string(),
            description: "Rural water schedule".to_string(),
            effective_from: at(2025, 1, 1),
            expires_at: None,
            fixed_charge: CategoryRates {
                residential: Decimal::from(12_500),
                commercial: Decimal::from(20_000),
                industrial: Decimal::from(35_000),
                senior: Decimal::from(8_000),
            },
            tiers: vec![
                tier(0, Some(10), 800),
                tier(11, Some(20), 1200),
                tier(21, None, 1800),
            ],
            seasonal_adjustments: vec![],
            discount_rules: vec![],
            late_fee_policy: LateFeePolicy::default(),
            computation_settings: ComputationSettings::default(),
        }
    }

    pub fn configuration(state: TariffState) -> TariffConfiguration {
        let mut config = TariffConfiguration::from_draft(TariffId(1), draft(), "admin", at(2025, 1, 1));
        config.state = state;
        config
    }
}
