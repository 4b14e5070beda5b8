pub mod kv;

pub use kv::{FileStorage, StorageLock};

use crate::error::Result;
use crate::tariff::{StoreCommand, TariffBook};

/// Storage abstraction for the append-only command log and tariff book snapshots.
///
/// The calculation core never touches storage; this is the store's durability seam.
///
/// Implementations must preserve:
/// - Append-only semantics for the command log
/// - Atomic snapshot writes (crash-safe)
/// - Deterministic replay from the command log
pub trait Storage {
    /// Append a committed command to the log (append-only, fsync before ack)
    fn append_command(&mut self, cmd: &StoreCommand) -> Result<()>;

    /// Load the latest book snapshot with the number of log entries it covers
    ///
    /// Returns `None` if no snapshot exists (empty book).
    fn load_book(&self) -> Result<Option<(TariffBook, u64)>>;

    /// Persist book snapshot atomically (write to temp file, fsync, rename)
    ///
    /// `next_command_id` is the log position of the first command NOT reflected in `book`.
    fn persist_book(&mut self, book: &TariffBook, next_command_id: u64) -> Result<()>;

    /// Load commands from the log starting at position `from_command_id` (inclusive)
    fn load_commands_from(&self, from_command_id: u64) -> Result<Vec<StoreCommand>>;
}
