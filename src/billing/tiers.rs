//! Tiered consumption pricing.

use crate::tariff::{Category, Tier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Consumption billed inside one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCharge {
    /// 1-based position of the tier in the schedule
    pub tier: usize,
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub consumed_m3: Decimal,
    pub rate: Decimal,
    pub subtotal: Decimal,
}

/// Price `consumption_m3` against ascending, contiguous tiers.
///
/// Bounds are whole-m³ labels: `[0-10][11-20][21-]` bills the first 10 m³ in tier 1,
/// the next 10 in tier 2 and the rest in tier 3. A bounded tier's capacity is its upper
/// bound minus the previous tier's upper bound (the first tier counts from its lower
/// bound), which equals `upper - lower + 1` for every tier after the first.
///
/// Consumption must be non-negative; callers validate readings first. Tiers with zero
/// consumption are omitted from the breakdown, so zero consumption yields `(0, [])`.
pub fn price(tiers: &[Tier], category: Category, consumption_m3: Decimal) -> (Decimal, Vec<TierCharge>) {
    let mut cost = Decimal::ZERO;
    let mut breakdown = Vec::new();
    let mut remaining = consumption_m3;
    let mut floor = tiers.first().map_or(Decimal::ZERO, |t| t.lower_bound);

    for (i, tier) in tiers.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        let capacity = match tier.upper_bound {
            Some(upper) => upper - floor,
            None => remaining,
        };
        if let Some(upper) = tier.upper_bound {
            floor = upper;
        }
        if capacity <= Decimal::ZERO {
            continue;
        }

        let consumed = remaining.min(capacity);
        let rate = tier.rates.get(category);
        let subtotal = consumed * rate;
        cost += subtotal;
        remaining -= consumed;

        breakdown.push(TierCharge {
            tier: i + 1,
            lower_bound: tier.lower_bound,
            upper_bound: tier.upper_bound,
            consumed_m3: consumed,
            rate,
            subtotal,
        });
    }

    (cost, breakdown)
}
