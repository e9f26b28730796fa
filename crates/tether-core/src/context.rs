//! Process-wide state shared by the dispatcher, scheduler, and session.
//!
//! Settings, the cooldown table, and the loaded reference datasets live here
//! instead of in globals. Each is behind its own `Mutex`; nothing holds two
//! of them at once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tether_contracts::{
    command::ActionKind,
    cooldown::CooldownTable,
    dataset::DatasetBundle,
    error::TetherResult,
};

use crate::{clock::Clock, config::Settings};

pub struct SharedContext {
    clock: Arc<dyn Clock>,
    settings: Mutex<Settings>,
    cooldowns: Mutex<CooldownTable>,
    datasets: Mutex<Arc<DatasetBundle>>,
}

impl SharedContext {
    pub fn new(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let cooldowns = CooldownTable::new(settings.open_cooldown, settings.pickup_cooldown);
        Self {
            clock,
            settings: Mutex::new(settings),
            cooldowns: Mutex::new(cooldowns),
            datasets: Mutex::new(Arc::new(DatasetBundle::default())),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        lock(&self.settings).clone()
    }

    /// Mutate the settings through `f`. Cooldown windows follow the new values.
    pub fn update_settings<F>(&self, f: F) -> TetherResult<()>
    where
        F: FnOnce(&mut Settings) -> TetherResult<()>,
    {
        let (open, pickup) = {
            let mut settings = lock(&self.settings);
            f(&mut settings)?;
            (settings.open_cooldown, settings.pickup_cooldown)
        };
        lock(&self.cooldowns).set_windows(open, pickup);
        Ok(())
    }

    /// Time left on `name`'s cooldown for `action`, if any.
    pub fn cooldown_remaining(&self, action: ActionKind, name: &str) -> Option<Duration> {
        let now = self.now();
        lock(&self.cooldowns).remaining(action, name, now)
    }

    /// Stamp `name` as acted on now.
    pub fn record_action(&self, action: ActionKind, name: &str) {
        let now = self.now();
        lock(&self.cooldowns).record(action, name, now);
    }

    pub fn with_cooldowns<R>(&self, f: impl FnOnce(&CooldownTable) -> R) -> R {
        f(&lock(&self.cooldowns))
    }

    pub fn datasets(&self) -> Arc<DatasetBundle> {
        lock(&self.datasets).clone()
    }

    pub fn set_datasets(&self, bundle: DatasetBundle) -> Arc<DatasetBundle> {
        let bundle = Arc::new(bundle);
        *lock(&self.datasets) = bundle.clone();
        bundle
    }
}

/// Lock without propagating poison: the guarded values stay valid after a
/// panicking reader.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
