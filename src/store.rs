//! Tariff configuration store: the shared, mutable home of the tariff book.
//!
//! Writers are serialized by one mutex, so every read-check-write of the Active slot
//! (activate, resume) runs against the latest committed book. Readers clone an `Arc`
//! of the current book and never block on, or observe, a command in flight.

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::tariff::{
    apply, LifecycleHook, NoOpHook, StoreCommand, TariffBook, TariffCommand, TariffConfiguration,
    TariffDraft, TariffId, TariffPatch, Transition,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{info, warn};

pub struct TariffStore<H: LifecycleHook = NoOpHook> {
    book: RwLock<Arc<TariffBook>>,
    writer: Mutex<H>,
}

impl TariffStore<NoOpHook> {
    /// Create an empty store
    pub fn new() -> Self {
        TariffStore::with_hook(TariffBook::new(), NoOpHook)
    }

    /// Create a store over an existing book (e.g. one replayed from storage)
    pub fn from_book(book: TariffBook) -> Self {
        TariffStore::with_hook(book, NoOpHook)
    }
}

impl Default for TariffStore<NoOpHook> {
    fn default() -> Self {
        TariffStore::new()
    }
}

impl<H: LifecycleHook> TariffStore<H> {
    pub fn with_hook(book: TariffBook, hook: H) -> Self {
        TariffStore {
            book: RwLock::new(Arc::new(book)),
            writer: Mutex::new(hook),
        }
    }

    /// Immutable view of the book as of the last committed command.
    pub fn snapshot(&self) -> Arc<TariffBook> {
        self.book.read().clone()
    }

    pub fn get(&self, id: TariffId) -> Option<TariffConfiguration> {
        self.snapshot().get(id).cloned()
    }

    pub fn list(&self) -> Vec<TariffConfiguration> {
        self.snapshot().list().cloned().collect()
    }

    /// Resolve the schedule governing `at` and return it as an owned snapshot.
    pub fn resolve(&self, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.snapshot().resolve(at).cloned()
    }

    /// Validate and commit one command, then notify the hook.
    ///
    /// On error the published book is unchanged and the hook is not called.
    pub fn execute(&self, cmd: &StoreCommand) -> Result<Transition> {
        self.commit(cmd).map(|(_, transition)| transition)
    }

    /// `execute`, then append `cmd` to the log and persist the resulting book.
    ///
    /// `next_command_id` is the log position this store was replayed to. Callers
    /// sharing a data directory must hold its `FileStorage::lock` from replay until
    /// this returns.
    pub fn execute_durable<S: Storage>(
        &self,
        storage: &mut S,
        next_command_id: u64,
        cmd: &StoreCommand,
    ) -> Result<Transition> {
        let transition = self.execute(cmd)?;
        storage.append_command(cmd)?;
        storage.persist_book(&self.snapshot(), next_command_id + 1)?;
        Ok(transition)
    }

    fn commit(&self, cmd: &StoreCommand) -> Result<(Arc<TariffBook>, Transition)> {
        let mut hook = self.writer.lock();
        let current = self.snapshot();
        let (next, transition) = match apply(&current, cmd) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(
                    operation = cmd.kind.operation(),
                    target = ?cmd.kind.target(),
                    actor = %cmd.actor,
                    error = %e,
                    "tariff command rejected"
                );
                return Err(e);
            }
        };
        let next = Arc::new(next);
        *self.book.write() = next.clone();

        info!(
            operation = cmd.kind.operation(),
            id = %transition.id(),
            actor = %cmd.actor,
            "tariff command committed"
        );
        notify(&mut *hook, &next, &transition);
        Ok((next, transition))
    }

    /// Commit and return the affected configuration as of that commit.
    fn execute_for(
        &self,
        actor: &str,
        at: DateTime<Utc>,
        kind: TariffCommand,
    ) -> Result<TariffConfiguration> {
        let (book, transition) = self.commit(&StoreCommand::new(actor.to_string(), at, kind))?;
        match transition {
            Transition::Deleted(config) => Ok(config),
            other => {
                let id = other.id();
                book.get(id).cloned().ok_or(Error::NotFound(id))
            }
        }
    }

    /// Create a Draft from `draft`. Returns the stored configuration with its new id.
    pub fn create(&self, draft: TariffDraft, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Create { draft })
    }

    /// Edit a Draft or Paused configuration.
    pub fn update(
        &self,
        id: TariffId,
        patch: TariffPatch,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Update { id, patch })
    }

    /// Make `id` the Active configuration, pausing whichever one was Active before.
    pub fn activate(&self, id: TariffId, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Activate { id })
    }

    pub fn pause(&self, id: TariffId, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Pause { id })
    }

    /// Reactivate a Paused configuration. Fails if another one is Active.
    pub fn resume(&self, id: TariffId, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Resume { id })
    }

    /// Retire an Active or Paused configuration for good; its expiry becomes `at`.
    pub fn finalize(&self, id: TariffId, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Finalize { id })
    }

    /// Remove a configuration that is not Active. Returns what was removed.
    pub fn delete(&self, id: TariffId, actor: &str, at: DateTime<Utc>) -> Result<TariffConfiguration> {
        self.execute_for(actor, at, TariffCommand::Delete { id })
    }

    /// Run `f` against the installed hook (e.g. to drain recorded events).
    pub fn with_hook_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut *self.writer.lock())
    }
}

fn notify<H: LifecycleHook>(hook: &mut H, book: &TariffBook, transition: &Transition) {
    if let Transition::Deleted(config) = transition {
        hook.on_deleted(config);
        return;
    }
    let Some(config) = book.get(transition.id()) else {
        return;
    };
    match transition {
        Transition::Created(_) => hook.on_created(config),
        Transition::Updated(_) => hook.on_updated(config),
        Transition::Activated { displaced, .. } => hook.on_activated(config, *displaced),
        Transition::Paused(_) => hook.on_paused(config),
        Transition::Resumed(_) => hook.on_resumed(config),
        Transition::Finalized(_) => hook.on_finalized(config),
        Transition::Deleted(_) => {}
    }
}
