//! Replay service: load the book from storage and replay the command log to tip.

use crate::error::Result;
use crate::storage::Storage;
use crate::tariff::{apply, StoreCommand, TariffBook};
use tracing::debug;

/// Replay the command log from storage to the current tip.
///
/// - If a snapshot exists: load it, then replay commands from `next_command_id`.
/// - If no snapshot: replay from an empty book (position 0).
///
/// Commands carry their own timestamps, so replay never consults the wall clock and
/// reproduces exactly the book that was live when each command committed.
pub fn replay_to_tip<S: Storage>(storage: &S) -> Result<(TariffBook, u64)> {
    let (book, next_id) = storage.load_book()?.unwrap_or_else(|| (TariffBook::new(), 0));
    let commands = storage.load_commands_from(next_id)?;
    let replayed = commands.len() as u64;
    let book = replay_commands(&book, &commands)?;
    debug!(from = next_id, replayed, "command log replayed");
    Ok((book, next_id + replayed))
}

/// Apply `commands` in order on top of `book`.
pub fn replay_commands(book: &TariffBook, commands: &[StoreCommand]) -> Result<TariffBook> {
    let mut current = book.clone();
    for cmd in commands {
        current = apply(&current, cmd)?.0;
    }
    Ok(current)
}
