//! Hook: injectable observer for tariff lifecycle events.
//!
//! `TariffStore` calls the hook after a command has committed, so a hook never sees a
//! transition that was later rolled back and cannot block one.

use crate::tariff::{TariffConfiguration, TariffId};

/// Trait-based hook for lifecycle notifications (invoice schedulers, audit sinks, caches).
pub trait LifecycleHook {
    fn on_created(&mut self, _config: &TariffConfiguration) {}

    fn on_updated(&mut self, _config: &TariffConfiguration) {}

    /// `displaced` is the configuration that was Active before and is now Paused.
    fn on_activated(&mut self, _config: &TariffConfiguration, _displaced: Option<TariffId>) {}

    fn on_paused(&mut self, _config: &TariffConfiguration) {}

    fn on_resumed(&mut self, _config: &TariffConfiguration) {}

    fn on_finalized(&mut self, _config: &TariffConfiguration) {}

    /// Receives the configuration as it was just before removal.
    fn on_deleted(&mut self, _config: &TariffConfiguration) {}
}

/// No-op hook: the store default.
#[derive(Debug, Clone, Default)]
pub struct NoOpHook;

impl LifecycleHook for NoOpHook {}
