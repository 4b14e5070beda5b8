use crate::tariff::{TariffDraft, TariffId, TariffPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store mutation. Each variant maps to one lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffCommand {
    Create { draft: TariffDraft },
    Update { id: TariffId, patch: TariffPatch },
    Activate { id: TariffId },
    Pause { id: TariffId },
    Resume { id: TariffId },
    Finalize { id: TariffId },
    Delete { id: TariffId },
}

impl TariffCommand {
    /// Operation name used in errors and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            TariffCommand::Create { .. } => "create",
            TariffCommand::Update { .. } => "update",
            TariffCommand::Activate { .. } => "activate",
            TariffCommand::Pause { .. } => "pause",
            TariffCommand::Resume { .. } => "resume",
            TariffCommand::Finalize { .. } => "finalize",
            TariffCommand::Delete { .. } => "delete",
        }
    }

    /// Target configuration, if the command addresses an existing one.
    pub fn target(&self) -> Option<TariffId> {
        match self {
            TariffCommand::Create { .. } => None,
            TariffCommand::Update { id, .. }
            | TariffCommand::Activate { id }
            | TariffCommand::Pause { id }
            | TariffCommand::Resume { id }
            | TariffCommand::Finalize { id }
            | TariffCommand::Delete { id } => Some(*id),
        }
    }
}

/// A command stamped with who issued it and when.
///
/// `at` is the evaluation time for every time-dependent rule (expiry checks,
/// `paused_at`, audit fields), so applying the same command log always yields
/// the same book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCommand {
    pub actor: String,
    pub at: DateTime<Utc>,
    pub kind: TariffCommand,
}

impl StoreCommand {
    pub fn new(actor: String, at: DateTime<Utc>, kind: TariffCommand) -> Self {
        StoreCommand { actor, at, kind }
    }
}
