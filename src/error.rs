use crate::tariff::{TariffId, TariffState};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid tariff configuration: {0}")]
    Validation(String),

    #[error("No active tariff configuration applies at {at}")]
    NoActiveConfiguration { at: DateTime<Utc> },

    #[error("Cannot {operation} tariff {id} while it is {from:?}")]
    InvalidStateTransition {
        id: TariffId,
        from: TariffState,
        operation: &'static str,
    },

    #[error("Cannot resume tariff {id}: tariff {active} is already active")]
    ActiveConflict { id: TariffId, active: TariffId },

    #[error("Cannot activate tariff {id}: it expired at {expires_at}")]
    ConfigurationExpired {
        id: TariffId,
        expires_at: DateTime<Utc>,
    },

    #[error("Tariff {0} not found")]
    NotFound(TariffId),

    #[error("Unknown customer category: {0}")]
    UnknownCategory(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
