use crate::error::{Error, Result};
use crate::tariff::{
    DiscountKind, StoreCommand, TariffBook, TariffCommand, TariffConfiguration, TariffId,
    TariffState, Tier,
};
use rust_decimal::Decimal;

/// Largest scale `rust_decimal` can represent.
const MAX_ROUNDING_DECIMALS: u32 = 28;

/// Ceiling for money amounts, per-m³ rates and m³ figures in a configuration.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Ceiling for seasonal multipliers.
pub const MAX_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

fn invalid(msg: impl Into<String>) -> Error {
    Error::Validation(msg.into())
}

fn non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(invalid(format!("{} must not be negative (got {})", field, value)));
    }
    Ok(())
}

fn at_most(field: &str, value: Decimal, max: Decimal) -> Result<()> {
    non_negative(field, value)?;
    if value > max {
        return Err(invalid(format!("{} must not exceed {} (got {})", field, max, value)));
    }
    Ok(())
}

fn amount(field: &str, value: Decimal) -> Result<()> {
    at_most(field, value, MAX_AMOUNT)
}

fn percent(field: &str, value: Decimal) -> Result<()> {
    at_most(field, value, Decimal::ONE_HUNDRED)
}

/// Check tier ordering and contiguity.
///
/// - At least one tier; the first starts at 0
/// - Each tier starts one unit above the previous upper bound
/// - Only the last tier may be unbounded
/// - Bounds and rates lie within `0..=MAX_AMOUNT`
pub fn validate_tiers(tiers: &[Tier]) -> Result<()> {
    let first = tiers
        .first()
        .ok_or_else(|| invalid("at least one consumption tier is required"))?;
    if !first.lower_bound.is_zero() {
        return Err(invalid(format!(
            "first tier must start at 0 m³ (starts at {})",
            first.lower_bound
        )));
    }

    let last_index = tiers.len() - 1;
    for (i, tier) in tiers.iter().enumerate() {
        if tier.is_unbounded() {
            if i != last_index {
                return Err(invalid(format!(
                    "tier {} is unbounded but is not the last tier",
                    i + 1
                )));
            }
        } else if let Some(upper) = tier.upper_bound {
            amount(&format!("tier {} upper bound", i + 1), upper)?;
            if upper < tier.lower_bound {
                return Err(invalid(format!(
                    "tier {} has upper bound {} below its lower bound {}",
                    i + 1,
                    upper,
                    tier.lower_bound
                )));
            }
        }

        // an unbounded previous tier was rejected on the previous iteration
        if let Some(prev_upper) = i.checked_sub(1).and_then(|p| tiers[p].upper_bound) {
            let expected = prev_upper + Decimal::ONE;
            if tier.lower_bound < expected {
                return Err(invalid(format!(
                    "tier {} overlaps tier {}: starts at {} but tier {} ends at {}",
                    i + 1,
                    i,
                    tier.lower_bound,
                    i,
                    prev_upper
                )));
            }
            if tier.lower_bound > expected {
                return Err(invalid(format!(
                    "gap between tier {} (ends at {}) and tier {} (starts at {})",
                    i,
                    prev_upper,
                    i + 1,
                    tier.lower_bound
                )));
            }
        }

        for (category, rate) in tier.rates.iter() {
            amount(&format!("tier {} {} rate", i + 1, category), rate)?;
        }
    }

    Ok(())
}

/// Validate a whole configuration. Used on create and on the patched result of update.
pub fn validate_configuration(config: &TariffConfiguration) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }

    if let Some(expires_at) = config.expires_at {
        if expires_at < config.effective_from {
            return Err(invalid(format!(
                "expires_at {} is before effective_from {}",
                expires_at, config.effective_from
            )));
        }
    }

    for (category, charge) in config.fixed_charge.iter() {
        amount(&format!("{} fixed charge", category), charge)?;
    }

    validate_tiers(&config.tiers)?;

    for season in &config.seasonal_adjustments {
        for month in [season.start_month, season.end_month] {
            if !(1..=12).contains(&month) {
                return Err(invalid(format!(
                    "seasonal adjustment '{}' has month {} outside 1-12",
                    season.name, month
                )));
            }
        }
        at_most(
            &format!("seasonal adjustment '{}' multiplier", season.name),
            season.multiplier,
            MAX_MULTIPLIER,
        )?;
    }

    for rule in &config.discount_rules {
        let field = format!("discount '{}' value", rule.name);
        match rule.kind {
            DiscountKind::Percentage => percent(&field, rule.value)?,
            DiscountKind::FixedAmount | DiscountKind::MinConsumptionThreshold => {
                amount(&field, rule.value)?
            }
        }
        let conditions = &rule.conditions;
        if let Some(min) = conditions.min_consumption {
            amount(&format!("discount '{}' min_consumption", rule.name), min)?;
        }
        if let Some(max) = conditions.max_consumption {
            amount(&format!("discount '{}' max_consumption", rule.name), max)?;
        }
        if let (Some(min), Some(max)) = (conditions.min_consumption, conditions.max_consumption) {
            if min > max {
                return Err(invalid(format!(
                    "discount '{}' min_consumption {} exceeds max_consumption {}",
                    rule.name, min, max
                )));
            }
        }
    }

    let policy = &config.late_fee_policy;
    percent("daily_penalty_percent", policy.daily_penalty_percent)?;
    percent("max_penalty_percent", policy.max_penalty_percent)?;
    amount("reconnection_fee", policy.reconnection_fee)?;

    let settings = &config.computation_settings;
    if settings.rounding_decimals > MAX_ROUNDING_DECIMALS {
        return Err(invalid(format!(
            "rounding_decimals must be at most {} (got {})",
            MAX_ROUNDING_DECIMALS, settings.rounding_decimals
        )));
    }
    match settings.tax_percent {
        Some(tax) => percent("tax_percent", tax)?,
        None if settings.apply_tax => {
            return Err(invalid("tax_percent is required when apply_tax is set"));
        }
        None => {}
    }
    percent("state_subsidy percent", settings.state_subsidy.percent)?;
    amount(
        "state_subsidy max_consumption",
        settings.state_subsidy.max_consumption,
    )?;

    Ok(())
}

fn require(book: &TariffBook, id: TariffId) -> Result<&TariffConfiguration> {
    book.get(id).ok_or(Error::NotFound(id))
}

fn require_state(
    config: &TariffConfiguration,
    allowed: &[TariffState],
    operation: &'static str,
) -> Result<()> {
    if allowed.contains(&config.state) {
        Ok(())
    } else {
        Err(Error::InvalidStateTransition {
            id: config.id,
            from: config.state,
            operation,
        })
    }
}

/// Validate a Create command: the materialized draft must be a valid configuration.
pub fn validate_create(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Create { draft } = &cmd.kind else {
        return Err(invalid("expected Create command"));
    };
    let candidate =
        TariffConfiguration::from_draft(book.next_id(), draft.clone(), &cmd.actor, cmd.at);
    validate_configuration(&candidate)
}

/// Validate an Update command
///
/// Checks:
/// - Target is Draft or Paused
/// - Patched configuration is valid as a whole
pub fn validate_update(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Update { id, patch } = &cmd.kind else {
        return Err(invalid("expected Update command"));
    };
    let config = require(book, *id)?;
    require_state(config, &[TariffState::Draft, TariffState::Paused], "update")?;
    let mut candidate = config.clone();
    candidate.apply_patch(patch.clone());
    validate_configuration(&candidate)
}

/// Validate an Activate command
///
/// Future-dated activation is legal; activating something already expired is not.
pub fn validate_activate(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Activate { id } = &cmd.kind else {
        return Err(invalid("expected Activate command"));
    };
    let config = require(book, *id)?;
    require_state(config, &[TariffState::Draft, TariffState::Paused], "activate")?;
    if let Some(expires_at) = config.expires_at {
        if expires_at < cmd.at {
            return Err(Error::ConfigurationExpired {
                id: *id,
                expires_at,
            });
        }
    }
    Ok(())
}

pub fn validate_pause(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Pause { id } = &cmd.kind else {
        return Err(invalid("expected Pause command"));
    };
    let config = require(book, *id)?;
    require_state(config, &[TariffState::Active], "pause")
}

/// Validate a Resume command: target must be Paused and nothing else Active.
pub fn validate_resume(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Resume { id } = &cmd.kind else {
        return Err(invalid("expected Resume command"));
    };
    let config = require(book, *id)?;
    require_state(config, &[TariffState::Paused], "resume")?;
    if let Some(active) = book.active() {
        return Err(Error::ActiveConflict {
            id: *id,
            active: active.id,
        });
    }
    Ok(())
}

pub fn validate_finalize(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Finalize { id } = &cmd.kind else {
        return Err(invalid("expected Finalize command"));
    };
    let config = require(book, *id)?;
    require_state(config, &[TariffState::Active, TariffState::Paused], "finalize")
}

pub fn validate_delete(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    let TariffCommand::Delete { id } = &cmd.kind else {
        return Err(invalid("expected Delete command"));
    };
    let config = require(book, *id)?;
    require_state(
        config,
        &[TariffState::Draft, TariffState::Paused, TariffState::Finalized],
        "delete",
    )
}

/// Main validation function that dispatches to the per-command validators.
pub fn validate(book: &TariffBook, cmd: &StoreCommand) -> Result<()> {
    match &cmd.kind {
        TariffCommand::Create { .. } => validate_create(book, cmd),
        TariffCommand::Update { .. } => validate_update(book, cmd),
        TariffCommand::Activate { .. } => validate_activate(book, cmd),
        TariffCommand::Pause { .. } => validate_pause(book, cmd),
        TariffCommand::Resume { .. } => validate_resume(book, cmd),
        TariffCommand::Finalize { .. } => validate_finalize(book, cmd),
        TariffCommand::Delete { .. } => validate_delete(book, cmd),
    }
}
