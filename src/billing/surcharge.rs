use crate::tariff::LateFeePolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Late-payment penalty that was applied to a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSurcharge {
    pub days_late: u32,
    pub penalty_percent: Decimal,
    pub amount: Decimal,
}

/// Late-payment penalty on `base_after_discount`.
///
/// Nothing accrues up to and including `grace_days`. After that the penalty grows by
/// `daily_penalty_percent` per day, capped at `max_penalty_percent`. The policy's
/// reconnection fee is never charged here.
pub fn late_fee(
    policy: &LateFeePolicy,
    base_after_discount: Decimal,
    days_overdue: u32,
) -> (Decimal, Option<AppliedSurcharge>) {
    if days_overdue <= policy.grace_days {
        return (Decimal::ZERO, None);
    }
    let days_late = days_overdue - policy.grace_days;
    let penalty_percent =
        (Decimal::from(days_late) * policy.daily_penalty_percent).min(policy.max_penalty_percent);
    let amount = base_after_discount * penalty_percent / dec!(100);
    (
        amount,
        Some(AppliedSurcharge {
            days_late,
            penalty_percent,
            amount,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LateFeePolicy {
        LateFeePolicy {
            grace_days: 10,
            daily_penalty_percent: dec!(0.5),
            max_penalty_percent: dec!(50),
            reconnection_fee: dec!(15000),
        }
    }

    #[test]
    fn test_within_grace_period() {
        assert_eq!(late_fee(&policy(), dec!(26500), 0), (Decimal::ZERO, None));
        assert_eq!(late_fee(&policy(), dec!(26500), 10), (Decimal::ZERO, None));
    }

    #[test]
    fn test_after_grace_period() {
        let (amount, applied) = late_fee(&policy(), dec!(20000), 15);
        let applied = applied.unwrap();
        assert_eq!(applied.days_late, 5);
        assert_eq!(applied.penalty_percent, dec!(2.5));
        assert_eq!(amount, dec!(500));
        assert_eq!(applied.amount, amount);
    }

    #[test]
    fn test_penalty_capped() {
        let (amount, applied) = late_fee(&policy(), dec!(20000), 500);
        assert_eq!(applied.unwrap().penalty_percent, dec!(50));
        assert_eq!(amount, dec!(10000));
    }

    #[test]
    fn test_reconnection_fee_not_charged() {
        let (amount, _) = late_fee(&policy(), dec!(0), 400);
        assert_eq!(amount, Decimal::ZERO);
    }
}
