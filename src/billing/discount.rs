use crate::tariff::{Category, DiscountConditions, DiscountKind, DiscountRule};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Flat percentage granted by a `MinConsumptionThreshold` rule.
///
/// The rule's own `value` is the consumption ceiling, not the percentage, so every
/// threshold rule grants exactly this much.
pub const MIN_CONSUMPTION_THRESHOLD_PERCENT: Decimal = Decimal::TEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub name: String,
    pub kind: DiscountKind,
    pub amount: Decimal,
}

/// True when every condition present on the rule holds.
///
/// An empty `eligible_categories` list places no restriction. `consecutive_months` is
/// not checked here.
pub fn conditions_met(
    conditions: &DiscountConditions,
    category: Category,
    consumption_m3: Decimal,
    early_payment: bool,
) -> bool {
    if let Some(min) = conditions.min_consumption {
        if consumption_m3 < min {
            return false;
        }
    }
    if let Some(max) = conditions.max_consumption {
        if consumption_m3 > max {
            return false;
        }
    }
    if let Some(categories) = &conditions.eligible_categories {
        if !categories.is_empty() && !categories.contains(&category) {
            return false;
        }
    }
    if conditions.requires_early_payment == Some(true) && !early_payment {
        return false;
    }
    true
}

fn amount_for(rule: &DiscountRule, consumption_m3: Decimal, subtotal: Decimal) -> Option<Decimal> {
    match rule.kind {
        DiscountKind::Percentage => Some(subtotal * rule.value / dec!(100)),
        DiscountKind::FixedAmount => Some(rule.value),
        DiscountKind::MinConsumptionThreshold => (consumption_m3 <= rule.value)
            .then(|| subtotal * MIN_CONSUMPTION_THRESHOLD_PERCENT / dec!(100)),
    }
}

/// Evaluate every enabled rule and sum the ones that apply.
///
/// Rules stack: there is no precedence, no exclusivity and no cap, so the total can
/// exceed `subtotal`.
pub fn apply(
    rules: &[DiscountRule],
    category: Category,
    consumption_m3: Decimal,
    subtotal: Decimal,
    early_payment: bool,
) -> (Decimal, Vec<AppliedDiscount>) {
    let applied: Vec<AppliedDiscount> = rules
        .iter()
        .filter(|rule| rule.enabled)
        .filter(|rule| conditions_met(&rule.conditions, category, consumption_m3, early_payment))
        .filter_map(|rule| {
            amount_for(rule, consumption_m3, subtotal).map(|amount| AppliedDiscount {
                name: rule.name.clone(),
                kind: rule.kind,
                amount,
            })
        })
        .collect();

    let total: Decimal = applied.iter().map(|d| d.amount).sum();
    (total, applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: DiscountKind, name: &str, value: Decimal) -> DiscountRule {
        DiscountRule {
            kind,
            name: name.to_string(),
            value,
            conditions: DiscountConditions::default(),
            enabled: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let rules = vec![rule(DiscountKind::Percentage, "promo", dec!(5))];
        let (total, applied) = apply(&rules, Category::Residential, dec!(15), dec!(26500), false);
        assert_eq!(total, dec!(1325));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].name, "promo");
    }

    #[test]
    fn test_fixed_amount_discount() {
        let rules = vec![rule(DiscountKind::FixedAmount, "loyalty", dec!(1000))];
        let (total, _) = apply(&rules, Category::Residential, dec!(15), dec!(26500), false);
        assert_eq!(total, dec!(1000));
    }

    #[test]
    fn test_min_consumption_threshold_grants_flat_ten_percent() {
        // value 5 is a ceiling in m³, and the discount is 10% whatever the value says
        let rules = vec![rule(DiscountKind::MinConsumptionThreshold, "saver", dec!(5))];
        let (total, applied) = apply(&rules, Category::Residential, dec!(4), dec!(20000), false);
        assert_eq!(total, dec!(2000));
        assert_eq!(applied[0].kind, DiscountKind::MinConsumptionThreshold);

        let (total, applied) = apply(&rules, Category::Residential, dec!(6), dec!(20000), false);
        assert_eq!(total, Decimal::ZERO);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_disabled_rule_ignored() {
        let mut promo = rule(DiscountKind::FixedAmount, "off", dec!(100));
        promo.enabled = false;
        let (total, applied) = apply(&[promo], Category::Senior, dec!(1), dec!(1000), true);
        assert_eq!(total, Decimal::ZERO);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_category_condition() {
        let mut senior = rule(DiscountKind::Percentage, "senior", dec!(50));
        senior.conditions.eligible_categories = Some(vec![Category::Senior]);
        let rules = vec![senior];

        let (total, _) = apply(&rules, Category::Senior, dec!(10), dec!(1000), false);
        assert_eq!(total, dec!(500));
        let (total, _) = apply(&rules, Category::Commercial, dec!(10), dec!(1000), false);
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_consumption_bounds_condition() {
        let mut band = rule(DiscountKind::FixedAmount, "band", dec!(10));
        band.conditions.min_consumption = Some(dec!(5));
        band.conditions.max_consumption = Some(dec!(10));
        let rules = vec![band];

        assert_eq!(apply(&rules, Category::Residential, dec!(4), dec!(100), false).0, Decimal::ZERO);
        assert_eq!(apply(&rules, Category::Residential, dec!(5), dec!(100), false).0, dec!(10));
        assert_eq!(apply(&rules, Category::Residential, dec!(10), dec!(100), false).0, dec!(10));
        assert_eq!(apply(&rules, Category::Residential, dec!(11), dec!(100), false).0, Decimal::ZERO);
    }

    #[test]
    fn test_early_payment_condition() {
        let mut early = rule(DiscountKind::Percentage, "early", dec!(3));
        early.conditions.requires_early_payment = Some(true);
        let rules = vec![early];
        assert_eq!(apply(&rules, Category::Residential, dec!(1), dec!(1000), false).0, Decimal::ZERO);
        assert_eq!(apply(&rules, Category::Residential, dec!(1), dec!(1000), true).0, dec!(30));
    }

    #[test]
    fn test_consecutive_months_not_evaluated() {
        let mut streak = rule(DiscountKind::FixedAmount, "streak", dec!(50));
        streak.conditions.consecutive_months = Some(12);
        let (total, _) = apply(&[streak], Category::Residential, dec!(1), dec!(1000), false);
        assert_eq!(total, dec!(50));
    }

    #[test]
    fn test_discounts_stack_without_cap() {
        let rules = vec![
            rule(DiscountKind::Percentage, "spring", dec!(60)),
            rule(DiscountKind::Percentage, "referral", dec!(60)),
            rule(DiscountKind::FixedAmount, "flat", dec!(100)),
        ];
        let (total, applied) = apply(&rules, Category::Residential, dec!(1), dec!(1000), false);
        assert_eq!(total, dec!(1300));
        assert_eq!(applied.len(), 3);
    }
}
