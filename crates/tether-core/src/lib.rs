//! # tether-core
//!
//! The resilient command-dispatch layer and the pickup scheduler built on it.
//!
//! This crate provides:
//! - The collaborator traits (`Host`, `WorldTree`, `Channel`, `PolicyEngine`, ...)
//! - `CapabilityResolver`, which probes the environment once and caches the result
//! - `FrameEncoder`, the two-frame wire encoding with tiered payload fallback
//! - `TransportDispatcher`, the five-tier best-effort sender
//! - `EntityLocator`, typed-name lookup and containment queries
//! - `PickupScheduler`, the bounded polling loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tether_core::{CapabilityResolver, TransportDispatcher, PickupScheduler};
//! ```

pub mod capability;
pub mod clock;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod frame;
pub mod locate;
pub mod scheduler;
pub mod traits;

pub use capability::{Capability, CapabilityResolver, CapabilitySet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Routes, Settings};
pub use context::SharedContext;
pub use dispatch::{DispatchReport, DispatchTier, TransportDispatcher};
pub use frame::{FrameEncoder, PayloadEncoding, TransportPayload};
pub use locate::EntityLocator;
pub use scheduler::PickupScheduler;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tether_contracts::{
        command::{GenericMessage, Opcode},
        dataset::DatasetBundle,
        entity::{Entity, EntityKind},
        error::{HostFault, TetherError},
        geometry::{OrientedBox, ReferenceVolume, Vec3},
        policy::PolicyVerdict,
    };

    use crate::traits::{
        BufferPrimitive, BufferUtility, Channel, Host, NodeId, PolicyContext, PolicyEngine, WorldTree,
    };
    use crate::*;

    // ── Mock world ────────────────────────────────────────────────────────────

    struct Node {
        name: String,
        children: Vec<NodeId>,
        entity: Option<Entity>,
        channel: Option<Arc<dyn Channel>>,
    }

    /// An arena-backed world tree built up by each test.
    struct TestWorld {
        nodes: Mutex<Vec<Node>>,
    }

    impl TestWorld {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                nodes: Mutex::new(vec![Node {
                    name: "root".to_string(),
                    children: vec![],
                    entity: None,
                    channel: None,
                }]),
            })
        }

        fn add(&self, parent: NodeId, name: &str) -> NodeId {
            let mut nodes = self.nodes.lock().unwrap();
            let id = NodeId(nodes.len() as u64);
            nodes.push(Node { name: name.to_string(), children: vec![], entity: None, channel: None });
            nodes[parent.0 as usize].children.push(id);
            id
        }

        /// Create every missing segment of `path` and return the last node.
        fn path(&self, path: &[&str]) -> NodeId {
            let mut node = self.root();
            for segment in path {
                node = match self.find_child(node, segment) {
                    Some(existing) => existing,
                    None => self.add(node, segment),
                };
            }
            node
        }

        fn add_channel(&self, parent: NodeId, channel: Arc<RecordingChannel>) -> NodeId {
            let id = self.add(parent, &channel.name.clone());
            self.nodes.lock().unwrap()[id.0 as usize].channel = Some(channel);
            id
        }

        fn add_entity(&self, parent: NodeId, entity: Entity) -> NodeId {
            let id = self.add(parent, &entity.name.clone());
            self.nodes.lock().unwrap()[id.0 as usize].entity = Some(entity);
            id
        }
    }

    impl WorldTree for TestWorld {
        fn root(&self) -> NodeId {
            NodeId(0)
        }

        fn children(&self, node: NodeId) -> Vec<NodeId> {
            self.nodes
                .lock()
                .unwrap()
                .get(node.0 as usize)
                .map(|n| n.children.clone())
                .unwrap_or_default()
        }

        fn name(&self, node: NodeId) -> Option<String> {
            self.nodes.lock().unwrap().get(node.0 as usize).map(|n| n.name.clone())
        }

        fn entity(&self, node: NodeId) -> Option<Entity> {
            self.nodes.lock().unwrap().get(node.0 as usize)?.entity.clone()
        }

        fn channel(&self, node: NodeId) -> Option<Arc<dyn Channel>> {
            self.nodes.lock().unwrap().get(node.0 as usize)?.channel.clone()
        }
    }

    // ── Mock channels ─────────────────────────────────────────────────────────

    /// A channel that appends "<name>:pair" / "<name>:msg" to a shared log on
    /// every call, failing when configured to.
    struct RecordingChannel {
        name: String,
        pair: bool,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingChannel {
        fn new(name: &str, pair: bool, fail: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self { name: name.to_string(), pair, fail, log: log.clone() })
        }
    }

    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            &self.name
        }

        fn supports_pair_send(&self) -> bool {
            self.pair
        }

        fn send_pair(&self, _first: &TransportPayload, _second: &TransportPayload) -> Result<(), HostFault> {
            self.log.lock().unwrap().push(format!("{}:pair", self.name));
            if self.fail {
                Err(HostFault::new("endpoint rejected call"))
            } else {
                Ok(())
            }
        }

        fn send_message(&self, _message: &GenericMessage) -> Result<(), HostFault> {
            self.log.lock().unwrap().push(format!("{}:msg", self.name));
            if self.fail {
                Err(HostFault::new("endpoint rejected call"))
            } else {
                Ok(())
            }
        }
    }

    // ── Mock host ─────────────────────────────────────────────────────────────

    struct Passthrough;

    impl BufferUtility for Passthrough {
        fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault> {
            Ok(bytes.to_vec())
        }

        fn create_and_write(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault> {
            Ok(bytes.to_vec())
        }
    }

    struct TestHost {
        world: Arc<TestWorld>,
        native: bool,
        primitive_faults: bool,
        probes: Mutex<u32>,
    }

    impl TestHost {
        fn new(world: &Arc<TestWorld>) -> Self {
            Self { world: world.clone(), native: false, primitive_faults: false, probes: Mutex::new(0) }
        }
    }

    impl Host for TestHost {
        fn native_buffer(&self) -> Result<Option<Arc<dyn BufferUtility>>, HostFault> {
            *self.probes.lock().unwrap() += 1;
            Ok(self.native.then(|| Arc::new(Passthrough) as Arc<dyn BufferUtility>))
        }

        fn buffer_primitive(&self) -> Result<Option<Arc<dyn BufferPrimitive>>, HostFault> {
            if self.primitive_faults {
                Err(HostFault::new("primitive probe exploded"))
            } else {
                Ok(None)
            }
        }

        fn world(&self) -> Arc<dyn WorldTree> {
            self.world.clone()
        }

        fn owned_region(&self) -> Result<Option<NodeId>, HostFault> {
            Ok(None)
        }

        fn load_datasets(&self) -> Result<DatasetBundle, HostFault> {
            Ok(DatasetBundle::default())
        }
    }

    // ── Mock policies ─────────────────────────────────────────────────────────

    /// Accepts anything outside its cooldown, except names in `deny`.
    struct TestPolicy {
        deny: HashSet<String>,
    }

    impl PolicyEngine for TestPolicy {
        fn evaluate(&self, entity: &Entity, ctx: &PolicyContext<'_>) -> PolicyVerdict {
            if ctx.cooldowns.is_active(ctx.action, &entity.name, ctx.now) {
                return PolicyVerdict::reject("cooldown");
            }
            if self.deny.contains(&entity.name) {
                return PolicyVerdict::reject("denied");
            }
            PolicyVerdict::Accept
        }
    }

    // ── Wiring helpers ────────────────────────────────────────────────────────

    struct Rig {
        world: Arc<TestWorld>,
        context: Arc<SharedContext>,
        clock: Arc<ManualClock>,
        resolver: Arc<CapabilityResolver>,
        dispatcher: Arc<TransportDispatcher>,
    }

    fn rig_with(world: Arc<TestWorld>, host: TestHost) -> Rig {
        let clock = Arc::new(ManualClock::new());
        let context = Arc::new(SharedContext::new(Settings::default(), clock.clone()));
        let resolver = Arc::new(CapabilityResolver::new(Arc::new(host), Routes::default()));
        let dispatcher = Arc::new(TransportDispatcher::new(
            resolver.clone(),
            world.clone(),
            context.clone(),
            Routes::default(),
        ));
        Rig { world, context, clock, resolver, dispatcher }
    }

    fn rig(world: Arc<TestWorld>) -> Rig {
        let host = TestHost::new(&world);
        rig_with(world, host)
    }

    fn scheduler(rig: &Rig, deny: &[&str]) -> PickupScheduler {
        PickupScheduler::new(
            rig.context.clone(),
            Arc::new(EntityLocator::new(rig.world.clone())),
            rig.dispatcher.clone(),
            Arc::new(TestPolicy { deny: deny.iter().map(|s| s.to_string()).collect() }),
        )
    }

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(vec![]))
    }

    // ── Capability resolution ─────────────────────────────────────────────────

    #[test]
    fn test_resolve_is_cached_until_reset() {
        let world = TestWorld::new();
        let mut host = TestHost::new(&world);
        host.native = true;
        let host = Arc::new(host);
        let resolver = CapabilityResolver::new(host.clone(), Routes::default());

        let first = resolver.resolve();
        let second = resolver.resolve();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*host.probes.lock().unwrap(), 1);
        assert!(first.has(Capability::NativeBuffer));

        resolver.reset();
        assert!(!resolver.is_resolved());
        resolver.resolve();
        assert_eq!(*host.probes.lock().unwrap(), 2);
    }

    #[test]
    fn test_failing_probe_does_not_abort_others() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, false, &log));

        let mut host = TestHost::new(&world);
        host.native = true;
        host.primitive_faults = true;
        let resolver = CapabilityResolver::new(Arc::new(host), Routes::default());

        let caps = resolver.resolve();
        assert!(caps.has(Capability::NativeBuffer));
        assert!(!caps.has(Capability::BufferPrimitive));
        assert!(caps.has(Capability::DirectChannel));
        assert!(!caps.has(Capability::StructuredHandle));
    }

    #[test]
    fn test_empty_environment_resolves_to_empty_set() {
        let world = TestWorld::new();
        let resolver = CapabilityResolver::new(Arc::new(TestHost::new(&world)), Routes::default());
        assert!(resolver.resolve().is_empty());
    }

    // ── Dispatch tiers ────────────────────────────────────────────────────────

    #[test]
    fn test_structured_handle_wins_without_touching_later_tiers() {
        let world = TestWorld::new();
        let log = new_log();
        let net = world.path(&["Shared", "Net"]);
        world.add_channel(net, RecordingChannel::new("Command", true, false, &log));
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, false, &log));
        world.add_channel(shared, RecordingChannel::new("Request", false, false, &log));

        let rig = rig(world);
        let report = rig.dispatcher.send(Opcode::OPEN_CONTAINER, "CONTAINER_abc").unwrap();

        assert_eq!(report.tier, DispatchTier::StructuredHandle);
        assert_eq!(report.channel, "Command");
        assert_eq!(*log.lock().unwrap(), vec!["Command:pair"]);
    }

    #[test]
    fn test_named_channels_exhausted_before_request_tier() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        let remotes = world.path(&["Shared", "Remotes"]);
        world.add_channel(shared, RecordingChannel::new("RemoteEvent", true, true, &log));
        world.add_channel(remotes, RecordingChannel::new("Network", true, false, &log));
        world.add_channel(remotes, RecordingChannel::new("Packet", true, false, &log));
        world.add_channel(shared, RecordingChannel::new("Request", false, false, &log));

        let rig = rig(world);
        let report = rig.dispatcher.send(Opcode::PICKUP_ITEM, "ITEM_1").unwrap();

        assert_eq!(report.tier, DispatchTier::NamedChannel);
        assert_eq!(report.channel, "Network");
        // The failing named channel is tried first, the first success ends the
        // search, and neither Packet nor Request is invoked.
        assert_eq!(*log.lock().unwrap(), vec!["RemoteEvent:pair", "Network:pair"]);
    }

    #[test]
    fn test_failing_direct_channel_is_not_retried_as_named() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, true, &log));
        world.add_channel(shared, RecordingChannel::new("Request", false, false, &log));

        let rig = rig(world);
        let report = rig.dispatcher.send(Opcode::PICKUP_ORB, "ORB_1").unwrap();

        assert_eq!(report.tier, DispatchTier::GenericRequest);
        assert_eq!(*log.lock().unwrap(), vec!["Remote:pair", "Request:msg"]);
    }

    #[test]
    fn test_broadcast_isolates_failing_target() {
        let world = TestWorld::new();
        let log = new_log();
        let misc = world.path(&["Shared", "Misc"]);
        world.add_channel(misc, RecordingChannel::new("Broken", false, true, &log));
        world.add_channel(misc, RecordingChannel::new("Listener", false, false, &log));

        let rig = rig(world);
        let report = rig.dispatcher.send(Opcode::PICKUP_ITEM, "ITEM_9").unwrap();

        assert_eq!(report.tier, DispatchTier::Broadcast);
        assert_eq!(report.channel, "Listener");
        assert_eq!(report.delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["Broken:msg", "Listener:msg"]);
    }

    #[test]
    fn test_all_tiers_failing_reports_exhaustion() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, true, &log));

        let rig = rig(world);
        match rig.dispatcher.send(Opcode::OPEN_CONTAINER, "CONTAINER_x") {
            Err(TetherError::TransportExhausted { reason }) => {
                assert!(reason.contains("direct-channel 'Remote'"), "reason: {reason}");
                assert!(reason.contains("broadcast 'Remote'"), "reason: {reason}");
            }
            other => panic!("expected TransportExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_no_channels_at_all_reports_exhaustion() {
        let rig = rig(TestWorld::new());
        match rig.dispatcher.send(Opcode::OPEN_CONTAINER, "CONTAINER_x") {
            Err(TetherError::TransportExhausted { reason }) => {
                assert_eq!(reason, "no transport channel found");
            }
            other => panic!("expected TransportExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_identifier_is_rejected_before_dispatch() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, false, &log));

        let rig = rig(world);
        let result = rig.dispatcher.send(Opcode::PICKUP_ITEM, "");
        assert!(matches!(result, Err(TetherError::MissingIdentifier { .. })));
        assert!(log.lock().unwrap().is_empty());
        assert!(!rig.resolver.is_resolved());
    }

    #[test]
    fn test_native_capability_reaches_payload() {
        let world = TestWorld::new();
        let log = new_log();
        let shared = world.path(&["Shared"]);
        world.add_channel(shared, RecordingChannel::new("Remote", true, false, &log));
        let mut host = TestHost::new(&world);
        host.native = true;

        let rig = rig_with(world, host);
        let report = rig.dispatcher.send(Opcode::PICKUP_ITEM, "ITEM_1").unwrap();
        assert_eq!(report.encoding, PayloadEncoding::Native);

        rig.context
            .update_settings(|s| s.set_value("preferNativeEncoder", toml::Value::Boolean(false)))
            .unwrap();
        let report = rig.dispatcher.send(Opcode::PICKUP_ITEM, "ITEM_1").unwrap();
        assert_eq!(report.encoding, PayloadEncoding::Raw);
    }

    // ── Locator ───────────────────────────────────────────────────────────────

    #[test]
    fn test_typed_name_prefers_exact_match() {
        let world = TestWorld::new();
        let region = world.path(&["Plots", "Mine"]);
        world.add_entity(region, Entity::new("ITEM_abc", EntityKind::Item, Vec3::new(9.0, 0.0, 0.0)));
        world.add_entity(region, Entity::new("ITEM_Abc", EntityKind::Item, Vec3::ZERO));

        let locator = EntityLocator::new(world.clone());
        let exact = locator.find_by_typed_name(EntityKind::Item, "Abc", Some(region)).unwrap();
        assert_eq!(exact.position, Vec3::ZERO);

        let folded = locator.find_by_typed_name(EntityKind::Item, "ABC", Some(region)).unwrap();
        assert_eq!(folded.name, "ITEM_abc");

        assert!(locator.find_by_typed_name(EntityKind::Orb, "abc", None).is_none());
    }

    #[test]
    fn test_typed_name_respects_scope() {
        let world = TestWorld::new();
        let mine = world.path(&["Plots", "Mine"]);
        let theirs = world.path(&["Plots", "Theirs"]);
        world.add_entity(theirs, Entity::new("CONTAINER_c1", EntityKind::Container, Vec3::ZERO));

        let locator = EntityLocator::new(world.clone());
        assert!(locator.find_by_typed_name(EntityKind::Container, "c1", Some(mine)).is_none());
        assert!(locator.find_by_typed_name(EntityKind::Container, "c1", None).is_some());
    }

    #[test]
    fn test_containment_against_oriented_volume() {
        let world = TestWorld::new();
        let region = world.path(&["Plots", "Mine"]);
        world.add_entity(region, Entity::new("ITEM_in", EntityKind::Item, Vec3::new(1.0, 1.0, 1.0)));
        world.add_entity(region, Entity::new("ITEM_out", EntityKind::Item, Vec3::new(3.0, 0.0, 0.0)));
        world.add_entity(region, Entity::new("ORB_in", EntityKind::Orb, Vec3::new(-1.0, 0.0, 0.5)));

        let locator = EntityLocator::new(world.clone());
        let volume = ReferenceVolume::Oriented(OrientedBox::axis_aligned(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)));

        let names: Vec<String> = locator
            .find_contained(&volume, &[EntityKind::Item, EntityKind::Orb], Some(region))
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["ITEM_in", "ORB_in"]);

        let items_only = locator.find_contained(&volume, &[EntityKind::Item], Some(region));
        assert_eq!(items_only.len(), 1);
    }

    // ── Scheduler ─────────────────────────────────────────────────────────────

    /// Region with a 2x2x2 half-extent container at the origin, three items
    /// inside it, one outside, and a working structured channel.
    fn scan_world(log: &Arc<Mutex<Vec<String>>>, working_channel: bool) -> (Arc<TestWorld>, NodeId, Entity) {
        let world = TestWorld::new();
        if working_channel {
            let net = world.path(&["Shared", "Net"]);
            world.add_channel(net, RecordingChannel::new("Command", true, false, log));
        }
        let region = world.path(&["Plots", "Mine"]);
        let container = Entity::new("CONTAINER_abc", EntityKind::Container, Vec3::ZERO)
            .with_volume(OrientedBox::axis_aligned(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)));
        world.add_entity(region, container.clone());
        world.add_entity(region, Entity::new("ITEM_1", EntityKind::Item, Vec3::new(0.5, 0.0, 0.0)));
        world.add_entity(region, Entity::new("ITEM_2", EntityKind::Item, Vec3::new(-0.5, 1.0, 0.0)));
        world.add_entity(region, Entity::new("ORB_3", EntityKind::Orb, Vec3::new(0.0, 0.0, 1.5)));
        world.add_entity(region, Entity::new("ITEM_far", EntityKind::Item, Vec3::new(30.0, 0.0, 0.0)));
        (world, region, container)
    }

    #[test]
    fn test_scan_picks_in_discovery_order_and_runs_full_window() {
        let log = new_log();
        let (world, region, container) = scan_world(&log, true);
        let rig = rig(world);
        let sched = scheduler(&rig, &[]);

        let start = rig.clock.now();
        let result = sched.scan_for(&container, Some(region), Duration::from_secs(1));

        assert_eq!(result.picked, vec!["ITEM_1", "ITEM_2", "ORB_3"]);
        assert!(result.skipped.is_empty());
        assert!(result.errors.is_empty());
        assert!(result.finished_at.is_some());
        assert!(rig.clock.now() - start > Duration::from_secs(1));
        assert_eq!(log.lock().unwrap().len(), 3, "each candidate dispatched exactly once");
    }

    #[test]
    fn test_scan_near_clock_limit_ends_without_overflow() {
        let log = new_log();
        let (world, region, container) = scan_world(&log, true);
        let rig = rig(world);
        let sched = scheduler(&rig, &[]);
        rig.clock.advance(Duration::MAX - Duration::from_secs(2));

        let result = sched.scan_for(&container, Some(region), Duration::MAX);

        assert_eq!(result.picked, vec!["ITEM_1", "ITEM_2", "ORB_3"]);
        assert!(result.finished_at.is_some());
        assert!(result.ticks >= 1);
        assert!(rig.clock.now() > Duration::MAX - Duration::from_secs(1));
    }

    #[test]
    fn test_scan_of_unsized_container_uses_fallback_radius() {
        let log = new_log();
        let world = TestWorld::new();
        let net = world.path(&["Shared", "Net"]);
        world.add_channel(net, RecordingChannel::new("Command", true, false, &log));
        let region = world.path(&["Plots", "Mine"]);
        let container = Entity::new("CONTAINER_bare", EntityKind::Container, Vec3::ZERO);
        world.add_entity(region, container.clone());
        world.add_entity(region, Entity::new("ITEM_near", EntityKind::Item, Vec3::new(1.0, 0.0, 1.0)));
        world.add_entity(region, Entity::new("ITEM_away", EntityKind::Item, Vec3::new(9.0, 0.0, 0.0)));

        let rig = rig(world);
        let result = scheduler(&rig, &[]).scan_for(&container, Some(region), Duration::from_millis(300));

        assert_eq!(result.picked, vec!["ITEM_near"]);
    }

    #[test]
    fn test_manual_clock_saturates() {
        let clock = ManualClock::starting_at(Duration::MAX - Duration::from_millis(10));
        clock.sleep(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::MAX);
    }

    #[test]
    fn test_scan_records_rejections_once() {
        let log = new_log();
        let (world, region, container) = scan_world(&log, true);
        let rig = rig(world);
        let sched = scheduler(&rig, &["ITEM_2"]);

        let result = sched.scan_for(&container, Some(region), Duration::from_secs(1));

        assert!(result.ticks > 1);
        assert_eq!(result.picked, vec!["ITEM_1", "ORB_3"]);
        assert_eq!(result.skipped, vec!["ITEM_2"]);
    }

    #[test]
    fn test_scan_accumulates_dispatch_errors_without_aborting() {
        let log = new_log();
        let (world, region, container) = scan_world(&log, false);
        let rig = rig(world);
        let sched = scheduler(&rig, &[]);

        let result = sched.scan_for(&container, Some(region), Duration::from_millis(500));

        assert!(result.picked.is_empty());
        assert_eq!(result.errors.len(), 3 * result.ticks as usize);
        assert_eq!(result.errors[0].identifier, "ITEM_1");
        assert!(result.errors[0].reason.contains("transport exhausted"));
    }

    #[test]
    fn test_cooldown_is_shared_across_scans() {
        let log = new_log();
        let (world, region, container) = scan_world(&log, true);
        let rig = rig(world);
        rig.context
            .update_settings(|s| s.set_value("pickupCooldown", toml::Value::Integer(60)))
            .unwrap();
        let sched = scheduler(&rig, &[]);

        let first = sched.scan_for(&container, Some(region), Duration::from_secs(1));
        let second = sched.scan_for(&container, Some(region), Duration::from_secs(1));

        assert_eq!(first.picked.len(), 3);
        assert!(second.picked.is_empty());
        assert_eq!(second.skipped, vec!["ITEM_1", "ITEM_2", "ORB_3"]);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_settings_from_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            verbose = true
            postOpenPollWindow = 3
            pollInterval = 0.5
            selectionPolicy = "Whitelist"
            whitelist = ["sword", "shield"]
        "#,
        )
        .unwrap();

        assert!(settings.verbose);
        assert_eq!(settings.post_open_poll_window, Duration::from_secs(3));
        assert_eq!(settings.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.whitelist.len(), 2);
        assert_eq!(settings.open_cooldown, Duration::from_secs(2));
        assert_eq!(settings.container_search_radius_multiplier, 1.5);
    }

    #[test]
    fn test_settings_toml_parse_error() {
        match Settings::from_toml_str("pollInterval = [[[") {
            Err(TetherError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse settings TOML"), "got: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_set_value_accepts_both_key_styles() {
        let mut settings = Settings::default();
        settings.set_value("open_cooldown", toml::Value::Float(0.5)).unwrap();
        settings.set_value("rarityThreshold", toml::Value::String("Epic".into())).unwrap();
        settings.set_value("whitelist", toml::Value::String("a, b ,c".into())).unwrap();
        settings.set_value("selection_policy", toml::Value::String("rarity".into())).unwrap();

        assert_eq!(settings.open_cooldown, Duration::from_millis(500));
        assert_eq!(settings.rarity_threshold, "Epic");
        assert_eq!(settings.whitelist.iter().cloned().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(settings.policy_config().mode, tether_contracts::policy::SelectionMode::Rarity);
    }

    #[test]
    fn test_set_value_rejects_bad_input_and_keeps_state() {
        let mut settings = Settings::default();
        let before = settings.clone();

        assert!(settings.set_value("nope", toml::Value::Boolean(true)).is_err());
        assert!(settings.set_value("verbose", toml::Value::Integer(1)).is_err());
        assert!(settings.set_value("pollInterval", toml::Value::Integer(0)).is_err());
        assert!(settings.set_value("openCooldown", toml::Value::Float(-1.0)).is_err());
        assert!(settings.set_value("selectionPolicy", toml::Value::String("best".into())).is_err());
        assert!(matches!(
            settings.set_value("postOpenPollWindow", toml::Value::Float(18446744073709549568.0)),
            Err(TetherError::ConfigError { .. })
        ));
        assert!(settings.set_value("postOpenPollWindow", toml::Value::Integer(3601)).is_err());

        assert_eq!(settings, before);
    }

    #[test]
    fn test_apply_overrides_is_all_or_nothing() {
        let mut settings = Settings::default();
        let overrides: toml::Table = toml::from_str(
            r#"
            verbose = true
            pickupCooldown = "soon"
        "#,
        )
        .unwrap();

        assert!(settings.apply_overrides(&overrides).is_err());
        assert!(!settings.verbose);
    }
}
