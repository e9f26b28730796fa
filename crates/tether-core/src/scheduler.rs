//! The bounded pickup scheduler.
//!
//! State machine: `Idle → Polling { deadline } → Done`.
//!
//! Each tick queries the locator for items and orbs inside the container,
//! runs every candidate through the policy engine, and dispatches a pickup
//! for each accepted one. The loop suspends after every successful pickup
//! (inter-pickup delay) and once per full pass (poll interval), and ends
//! when the clock passes the deadline fixed at scan start.
//!
//! Scans are independent of each other; the cooldown table in the shared
//! context is not, so overlapping scans never pick the same entity twice
//! inside its cooldown window.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use tether_contracts::{
    command::{ActionKind, Opcode},
    entity::{Entity, EntityKind},
    scan::ScanResult,
};

use crate::{
    context::SharedContext,
    dispatch::TransportDispatcher,
    locate::EntityLocator,
    traits::{NodeId, PolicyContext, PolicyEngine},
};

/// Entity kinds a scan picks up.
pub const PICKABLE: [EntityKind; 2] = [EntityKind::Item, EntityKind::Orb];

/// Lower bound on the pass interval so a zero setting cannot spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Polling { deadline: Duration },
    Done,
}

pub struct PickupScheduler {
    context: Arc<SharedContext>,
    locator: Arc<EntityLocator>,
    dispatcher: Arc<TransportDispatcher>,
    policy: Arc<dyn PolicyEngine>,
}

impl PickupScheduler {
    pub fn new(
        context: Arc<SharedContext>,
        locator: Arc<EntityLocator>,
        dispatcher: Arc<TransportDispatcher>,
        policy: Arc<dyn PolicyEngine>,
    ) -> Self {
        Self { context, locator, dispatcher, policy }
    }

    /// Scan for the configured `postOpenPollWindow`.
    pub fn scan(&self, container: &Entity, scope: Option<NodeId>) -> ScanResult {
        let window = self.context.settings().post_open_poll_window;
        self.scan_for(container, scope, window)
    }

    /// Scan with an explicit window. Callers that need to stop early pass a
    /// shorter window.
    pub fn scan_for(&self, container: &Entity, scope: Option<NodeId>, window: Duration) -> ScanResult {
        let settings = self.context.settings();
        let policy = settings.policy_config();
        let datasets = self.context.datasets();
        let volume = container.reference_volume(settings.container_search_radius_multiplier);
        if !container.has_known_extent() {
            debug!(container = %container.name, ?volume, "container extent unknown, using fallback radius");
        }
        let clock = self.context.clock().clone();
        let poll_interval = settings.poll_interval.max(MIN_POLL_INTERVAL);

        let mut result = ScanResult::new();
        let mut phase = ScanPhase::Idle;
        debug!(container = %container.name, ?phase, "scan created");

        // Capped one pass short of the clock's range so `now > deadline` stays
        // reachable for any window.
        let deadline = clock
            .now()
            .saturating_add(window)
            .min(Duration::MAX.saturating_sub(poll_interval));
        phase = ScanPhase::Polling { deadline };
        debug!(container = %container.name, ?phase, mode = ?policy.mode, "scan polling");

        while clock.now() <= deadline {
            result.ticks += 1;

            for entity in self.locator.find_contained(&volume, &PICKABLE, scope) {
                if result.is_picked(&entity.name) {
                    continue;
                }

                let verdict = self.context.with_cooldowns(|cooldowns| {
                    let ctx = PolicyContext {
                        action: ActionKind::Pickup,
                        config: &policy,
                        cooldowns,
                        datasets: &datasets,
                        now: clock.now(),
                    };
                    self.policy.evaluate(&entity, &ctx)
                });

                match verdict.into_result(&entity.name) {
                    Err(rejection) => {
                        debug!(error = %rejection, "candidate skipped");
                        result.record_skipped(&entity.name);
                    }
                    Ok(()) => {
                        let Some(opcode) = Opcode::pickup_for(entity.kind) else {
                            continue;
                        };
                        match self.dispatcher.send(opcode, &entity.name) {
                            Ok(report) => {
                                debug!(
                                    identifier = %entity.name,
                                    tier = report.tier.as_str(),
                                    "candidate picked"
                                );
                                result.record_picked(&entity.name);
                                self.context.record_action(ActionKind::Pickup, &entity.name);
                                clock.sleep(settings.inter_pickup_delay);
                            }
                            Err(e) => {
                                debug!(identifier = %entity.name, error = %e, "pickup dispatch failed");
                                result.record_error(&entity.name, e.to_string());
                            }
                        }
                    }
                }
            }

            clock.sleep(poll_interval);
        }

        phase = ScanPhase::Done;
        result.finish();
        info!(
            container = %container.name,
            ?phase,
            picked = result.picked.len(),
            skipped = result.skipped.len(),
            errors = result.errors.len(),
            ticks = result.ticks,
            "scan finished"
        );
        result
    }
}
