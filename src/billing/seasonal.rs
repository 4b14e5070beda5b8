use crate::tariff::SeasonalAdjustment;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seasonal multiplier that was applied to a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSeasonal {
    pub name: String,
    pub multiplier: Decimal,
    pub cost_before: Decimal,
    pub cost_after: Decimal,
}

/// Multiply `consumption_cost` by the first adjustment whose month window contains
/// `billing_month`. Windows are checked in configuration order and the first match
/// wins, even if a later window also matches.
pub fn adjust(
    consumption_cost: Decimal,
    adjustments: &[SeasonalAdjustment],
    billing_month: u32,
) -> (Decimal, Option<AppliedSeasonal>) {
    match adjustments.iter().find(|a| a.covers(billing_month)) {
        Some(season) => {
            let adjusted = consumption_cost * season.multiplier;
            (
                adjusted,
                Some(AppliedSeasonal {
                    name: season.name.clone(),
                    multiplier: season.multiplier,
                    cost_before: consumption_cost,
                    cost_after: adjusted,
                }),
            )
        }
        None => (consumption_cost, None),
    }
}
