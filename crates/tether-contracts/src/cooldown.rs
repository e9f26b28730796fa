//! Per-target cooldown bookkeeping.
//!
//! Timestamps are `Duration`s on the caller's clock (time since an arbitrary
//! epoch), so tests can drive the table with a manual clock.

use std::collections::HashMap;
use std::time::Duration;

use crate::command::ActionKind;

/// Last-action timestamps per (action, target name), with one window per
/// action family. `Buy` shares the open window.
///
/// An action on a name is suppressed while `now - last < window`.
#[derive(Debug, Clone, Default)]
pub struct CooldownTable {
    open_window: Duration,
    pickup_window: Duration,
    last: HashMap<(ActionKind, String), Duration>,
}

impl CooldownTable {
    pub fn new(open_window: Duration, pickup_window: Duration) -> Self {
        Self { open_window, pickup_window, last: HashMap::new() }
    }

    pub fn window(&self, action: ActionKind) -> Duration {
        match action {
            ActionKind::Open | ActionKind::Buy => self.open_window,
            ActionKind::Pickup => self.pickup_window,
        }
    }

    pub fn set_windows(&mut self, open_window: Duration, pickup_window: Duration) {
        self.open_window = open_window;
        self.pickup_window = pickup_window;
    }

    /// Time left before `name` may be acted on again, or `None` if it may act now.
    pub fn remaining(&self, action: ActionKind, name: &str, now: Duration) -> Option<Duration> {
        let last = self.last.get(&(action, name.to_string()))?;
        let elapsed = now.saturating_sub(*last);
        let window = self.window(action);
        (elapsed < window).then(|| window - elapsed)
    }

    pub fn is_active(&self, action: ActionKind, name: &str, now: Duration) -> bool {
        self.remaining(action, name, now).is_some()
    }

    /// Stamp `name` as acted on at `now`.
    pub fn record(&mut self, action: ActionKind, name: &str, now: Duration) {
        self.last.insert((action, name.to_string()), now);
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}
