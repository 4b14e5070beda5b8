use crate::tariff::ComputationSettings;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Round half away from zero (half-up for positive amounts) at `decimals` places.
pub fn round_half_up(amount: Decimal, decimals: u32) -> Decimal {
    amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply tax to `base` and round the total. Returns `(tax, total)`.
///
/// Only the total is rounded; `tax` keeps full precision so the breakdown can be
/// audited.
pub fn finalize(base: Decimal, settings: &ComputationSettings) -> (Decimal, Decimal) {
    let tax = if settings.apply_tax {
        base * settings.tax_percent.unwrap_or(Decimal::ZERO) / dec!(100)
    } else {
        Decimal::ZERO
    };
    let total = round_half_up(base + tax, settings.rounding_decimals);
    (tax, total)
}
