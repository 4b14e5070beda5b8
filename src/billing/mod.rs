//! Bill calculation: configuration + consumption -> amount owed.
//!
//! Every function here is pure. `calculate` backs both real invoicing and the
//! "simulate" preview, so both produce the same numbers for the same inputs.

pub mod discount;
pub mod finalize;
pub mod seasonal;
pub mod surcharge;
pub mod tiers;

pub use discount::AppliedDiscount;
pub use seasonal::AppliedSeasonal;
pub use surcharge::AppliedSurcharge;
pub use tiers::TierCharge;

use crate::error::{Error, Result};
use crate::tariff::{Category, TariffBook, TariffConfiguration, TariffId};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest consumption accepted for one billing period.
///
/// Together with the limits `tariff::validation` puts on rates, multipliers and
/// percentages this keeps every intermediate amount well inside `Decimal`'s range.
pub const MAX_CONSUMPTION_M3: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingBreakdown {
    pub tiers: Vec<TierCharge>,
    pub discounts: Vec<AppliedDiscount>,
    pub surcharge: Option<AppliedSurcharge>,
    pub seasonal: Option<AppliedSeasonal>,
}

/// Result of one calculation. Owned by the caller; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCalculationResult {
    pub config_id: TariffId,
    /// `TariffConfiguration::fingerprint` of the schedule used.
    pub config_fingerprint: String,
    pub category: Category,
    pub consumption_m3: Decimal,
    pub billing_period: NaiveDate,
    pub fixed_charge: Decimal,
    /// After seasonal adjustment.
    pub consumption_cost: Decimal,
    pub subtotal: Decimal,
    pub discounts_total: Decimal,
    pub surcharges_total: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    /// Informational; charged by the reconnection workflow, not included in the total.
    pub reconnection_fee: Decimal,
    pub breakdown: BillingBreakdown,
}

/// Inputs for one bill, with the defaults the invoicing flow uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRequest {
    pub category: Category,
    pub consumption_m3: Decimal,
    pub billing_period: NaiveDate,
    #[serde(default)]
    pub days_overdue: u32,
    #[serde(default)]
    pub early_payment: bool,
}

impl BillingRequest {
    pub fn new(category: Category, consumption_m3: Decimal, billing_period: NaiveDate) -> Self {
        BillingRequest {
            category,
            consumption_m3,
            billing_period,
            days_overdue: 0,
            early_payment: false,
        }
    }

    pub fn days_overdue(mut self, days: u32) -> Self {
        self.days_overdue = days;
        self
    }

    pub fn early_payment(mut self, early: bool) -> Self {
        self.early_payment = early;
        self
    }

    /// Instant used to resolve the schedule for this period: midnight UTC of the period date.
    pub fn resolution_time(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.billing_period.and_time(NaiveTime::MIN))
    }
}

/// Reject consumption outside `0..=MAX_CONSUMPTION_M3`.
pub fn check_consumption(consumption_m3: Decimal) -> Result<()> {
    if consumption_m3 < Decimal::ZERO || consumption_m3 > MAX_CONSUMPTION_M3 {
        return Err(Error::Validation(format!(
            "consumption must be between 0 and {} m³ (got {})",
            MAX_CONSUMPTION_M3, consumption_m3
        )));
    }
    Ok(())
}

/// Compute the bill for one consumption figure against an already-resolved schedule.
///
/// Order: fixed charge, tiered consumption, seasonal multiplier, discounts on the
/// subtotal, late fee on `subtotal - discounts`, then tax and rounding. Discounts are
/// not clamped: if they exceed the subtotal the negative base flows through unchanged.
///
/// `config` must have passed `validate_configuration`, as everything held by a
/// `TariffBook` has. Out-of-range consumption is a `Validation` error.
pub fn calculate(
    config: &TariffConfiguration,
    category: Category,
    consumption_m3: Decimal,
    billing_period: NaiveDate,
    days_overdue: u32,
    early_payment: bool,
) -> Result<BillingCalculationResult> {
    check_consumption(consumption_m3)?;
    let fixed_charge = config.fixed_charge.get(category);
    let (tier_cost, tier_breakdown) = tiers::price(&config.tiers, category, consumption_m3);
    let (consumption_cost, seasonal) =
        seasonal::adjust(tier_cost, &config.seasonal_adjustments, billing_period.month());
    let subtotal = fixed_charge + consumption_cost;

    let (discounts_total, discounts) = discount::apply(
        &config.discount_rules,
        category,
        consumption_m3,
        subtotal,
        early_payment,
    );
    let base_after_discount = subtotal - discounts_total;

    let (surcharges_total, surcharge) =
        surcharge::late_fee(&config.late_fee_policy, base_after_discount, days_overdue);
    let (tax, total_amount) = finalize::finalize(
        base_after_discount + surcharges_total,
        &config.computation_settings,
    );

    debug!(
        config = %config.id,
        %category,
        %consumption_m3,
        %subtotal,
        %discounts_total,
        %surcharges_total,
        %total_amount,
        "bill calculated"
    );

    Ok(BillingCalculationResult {
        config_id: config.id,
        config_fingerprint: config.fingerprint()?,
        category,
        consumption_m3,
        billing_period,
        fixed_charge,
        consumption_cost,
        subtotal,
        discounts_total,
        surcharges_total,
        tax,
        total_amount,
        reconnection_fee: config.late_fee_policy.reconnection_fee,
        breakdown: BillingBreakdown {
            tiers: tier_breakdown,
            discounts,
            surcharge,
            seasonal,
        },
    })
}

/// `calculate` with a `BillingRequest`.
pub fn calculate_request(
    config: &TariffConfiguration,
    request: &BillingRequest,
) -> Result<BillingCalculationResult> {
    calculate(
        config,
        request.category,
        request.consumption_m3,
        request.billing_period,
        request.days_overdue,
        request.early_payment,
    )
}

/// Resolve the governing schedule in `book` for the request's period, then calculate.
///
/// Pass a store snapshot: the schedule is resolved once and the calculation never
/// looks at the store again.
pub fn simulate(book: &TariffBook, request: &BillingRequest) -> Result<BillingCalculationResult> {
    let config = book.resolve(request.resolution_time())?;
    calculate_request(config, request)
}
