//! # tether-session
//!
//! The public operations of the tether command layer, bound to one host.
//!
//! ## Overview
//!
//! [`Session`] wires the shared context, capability resolver, transport
//! dispatcher, entity locator, and pickup scheduler from `tether-core`
//! together with a policy engine (by default the
//! [`SelectionPolicyEngine`](tether_policy::SelectionPolicyEngine)).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tether_session::Session;
//!
//! let session = Session::new(host);
//! session.initialize(&toml::Table::new())?;
//! let result = session.open_and_collect("abc")?;
//! println!("picked {:?}", result.picked);
//! ```

pub mod session;

pub use session::{Session, SessionBuilder};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tether_contracts::{
        command::GenericMessage,
        dataset::{ContainerDefinition, DatasetBundle, ItemDefinition, RankTable},
        entity::{Entity, EntityKind},
        error::{HostFault, TetherError},
        geometry::{OrientedBox, Vec3},
    };
    use tether_core::{
        traits::{BufferPrimitive, BufferUtility, Channel, Host, NodeId, WorldTree},
        Capability, Clock, ManualClock, TransportPayload,
    };

    use crate::Session;

    // ── Mock world ────────────────────────────────────────────────────────────

    struct Node {
        name: String,
        children: Vec<NodeId>,
        entity: Option<Entity>,
        channel: Option<Arc<dyn Channel>>,
    }

    struct World {
        nodes: Mutex<Vec<Node>>,
    }

    impl World {
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

        fn add(&self, parent: NodeId, name: &str, entity: Option<Entity>, channel: Option<Arc<dyn Channel>>) -> NodeId {
            let mut nodes = self.nodes.lock().unwrap();
            let id = NodeId(nodes.len() as u64);
            nodes.push(Node { name: name.to_string(), children: vec![], entity, channel });
            nodes[parent.0 as usize].children.push(id);
            id
        }
    }

    impl WorldTree for World {
        fn root(&self) -> NodeId {
            NodeId(0)
        }

        fn children(&self, node: NodeId) -> Vec<NodeId> {
            self.nodes.lock().unwrap().get(node.0 as usize).map(|n| n.children.clone()).unwrap_or_default()
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

    /// Counts pair sends; optionally fails every call.
    struct CountingChannel {
        sends: Mutex<u32>,
        fail: bool,
    }

    impl Channel for CountingChannel {
        fn name(&self) -> &str {
            "Remote"
        }

        fn supports_pair_send(&self) -> bool {
            true
        }

        fn send_pair(&self, _first: &TransportPayload, _second: &TransportPayload) -> Result<(), HostFault> {
            *self.sends.lock().unwrap() += 1;
            if self.fail {
                Err(HostFault::new("endpoint rejected call"))
            } else {
                Ok(())
            }
        }

        fn send_message(&self, _message: &GenericMessage) -> Result<(), HostFault> {
            Err(HostFault::new("unsupported"))
        }
    }

    struct MockHost {
        world: Arc<World>,
        region: Option<NodeId>,
        datasets: Option<DatasetBundle>,
        dataset_loads: Mutex<u32>,
    }

    impl Host for MockHost {
        fn native_buffer(&self) -> Result<Option<Arc<dyn BufferUtility>>, HostFault> {
            Ok(None)
        }

        fn buffer_primitive(&self) -> Result<Option<Arc<dyn BufferPrimitive>>, HostFault> {
            Ok(None)
        }

        fn world(&self) -> Arc<dyn WorldTree> {
            self.world.clone()
        }

        fn owned_region(&self) -> Result<Option<NodeId>, HostFault> {
            Ok(self.region)
        }

        fn load_datasets(&self) -> Result<DatasetBundle, HostFault> {
            *self.dataset_loads.lock().unwrap() += 1;
            self.datasets.clone().ok_or_else(|| HostFault::new("dataset service offline"))
        }
    }

    // ── Wiring helpers ────────────────────────────────────────────────────────

    struct Fixture {
        world: Arc<World>,
        host: Arc<MockHost>,
        channel: Arc<CountingChannel>,
        clock: Arc<ManualClock>,
        region: NodeId,
        session: Session,
    }

    fn fixture_with(fail: bool, with_region: bool, datasets: Option<DatasetBundle>) -> Fixture {
        let world = World::new();
        let channel = Arc::new(CountingChannel { sends: Mutex::new(0), fail });
        let shared = world.add(world.root(), "Shared", None, None);
        world.add(shared, "Remote", None, Some(channel.clone()));
        let region = world.add(world.root(), "Plot_7", None, None);

        let host = Arc::new(MockHost {
            world: world.clone(),
            region: with_region.then_some(region),
            datasets,
            dataset_loads: Mutex::new(0),
        });
        let clock = Arc::new(ManualClock::new());
        let session = Session::builder(host.clone()).clock(clock.clone()).build();
        Fixture { world, host, channel, clock, region, session }
    }

    fn fixture() -> Fixture {
        fixture_with(false, true, None)
    }

    fn container(uuid: &str) -> Entity {
        Entity::new(EntityKind::Container.typed_name(uuid), EntityKind::Container, Vec3::ZERO)
            .with_size(Vec3::new(2.0, 2.0, 2.0))
            .with_volume(OrientedBox::axis_aligned(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)))
    }

    fn item(uuid: &str, at: Vec3) -> Entity {
        Entity::new(EntityKind::Item.typed_name(uuid), EntityKind::Item, at)
    }

    fn sends(f: &Fixture) -> u32 {
        *f.channel.sends.lock().unwrap()
    }

    // ── Single-shot operations ────────────────────────────────────────────────

    #[test]
    fn test_open_container_dispatches_and_stamps_cooldown() {
        let f = fixture();
        let report = f.session.open_container("abc").unwrap();
        assert_eq!(report.channel, "Remote");
        assert_eq!(sends(&f), 1);

        // A second call inside the window never reaches the transport.
        let err = f.session.open_container("abc").unwrap_err();
        assert_eq!(err, TetherError::CooldownActive { name: "CONTAINER_abc".into(), remaining_ms: 2000 });
        assert_eq!(sends(&f), 1);

        f.clock.advance(Duration::from_millis(1500));
        match f.session.open_container("abc") {
            Err(TetherError::CooldownActive { remaining_ms, .. }) => assert_eq!(remaining_ms, 500),
            other => panic!("expected cooldown, got {other:?}"),
        }

        f.clock.advance(Duration::from_millis(500));
        assert!(f.session.open_container("abc").is_ok());
        assert_eq!(sends(&f), 2);
    }

    #[test]
    fn test_empty_identifier_is_rejected_before_dispatch() {
        let f = fixture();
        assert!(matches!(f.session.open_container(""), Err(TetherError::MissingIdentifier { .. })));
        assert!(matches!(f.session.buy_container("  "), Err(TetherError::MissingIdentifier { .. })));
        assert!(matches!(f.session.pickup_entity(""), Err(TetherError::MissingIdentifier { .. })));
        assert_eq!(sends(&f), 0);
    }

    #[test]
    fn test_failed_dispatch_does_not_stamp_cooldown() {
        let f = fixture_with(true, true, None);
        let err = f.session.open_container("abc").unwrap_err();
        assert!(matches!(err, TetherError::TransportExhausted { .. }));
        // No cooldown recorded, so the retry reaches the channel again.
        assert!(f.session.open_container("abc").is_err());
        assert_eq!(sends(&f), 2);
    }

    #[test]
    fn test_buy_checks_loaded_catalog() {
        let bundle = DatasetBundle {
            containers: vec![ContainerDefinition { id: "crate_basic".into(), display_name: None, price: Some(100) }],
            ..DatasetBundle::default()
        };
        let f = fixture_with(false, true, Some(bundle));

        // Without a catalog any identifier is forwarded.
        assert!(f.session.buy_container("crate_gold").is_ok());

        f.session.load_reference_datasets().unwrap();
        assert_eq!(
            f.session.buy_container("crate_unknown"),
            Err(TetherError::EntityNotFound { name: "crate_unknown".into() })
        );
        assert!(f.session.buy_container("crate_basic").is_ok());
        assert!(matches!(f.session.buy_container("crate_basic"), Err(TetherError::CooldownActive { .. })));
    }

    #[test]
    fn test_pickup_falls_back_to_orb() {
        let f = fixture();
        f.world.add(f.region, "ORB_9", Some(Entity::new("ORB_9", EntityKind::Orb, Vec3::ZERO)), None);

        let report = f.session.pickup_entity("9").unwrap();
        assert_eq!(report.channel, "Remote");
        assert_eq!(
            f.session.pickup_entity("404"),
            Err(TetherError::EntityNotFound { name: "ITEM_404 / ORB_404".into() })
        );
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    #[test]
    fn test_region_and_typed_name_lookup() {
        let f = fixture();
        f.world.add(f.region, "CONTAINER_abc", Some(container("abc")), None);

        assert_eq!(f.session.find_owned_region().unwrap(), f.region);
        let found = f.session.find_entity_by_typed_name(EntityKind::Container, "abc", Some(f.region)).unwrap();
        assert_eq!(found.name, "CONTAINER_abc");
        assert!(f.session.find_entity_by_typed_name(EntityKind::Container, "abc", None).is_ok());
        assert!(matches!(
            f.session.find_entity_by_typed_name(EntityKind::Container, "zzz", None),
            Err(TetherError::EntityNotFound { .. })
        ));

        let orphan = fixture_with(false, false, None);
        assert!(matches!(orphan.session.find_owned_region(), Err(TetherError::RegionNotFound { .. })));
        assert!(matches!(orphan.session.open_and_collect("abc"), Err(TetherError::RegionNotFound { .. })));
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    #[test]
    fn test_open_and_collect_picks_items_inside_container() {
        let f = fixture();
        f.world.add(f.region, "CONTAINER_abc", Some(container("abc")), None);
        f.world.add(f.region, "ITEM_1", Some(item("1", Vec3::new(0.5, 0.0, 0.0))), None);
        f.world.add(f.region, "ITEM_2", Some(item("2", Vec3::new(0.0, 0.9, -0.5))), None);
        f.world.add(f.region, "ITEM_far", Some(item("far", Vec3::new(10.0, 0.0, 0.0))), None);

        let result = f.session.open_and_collect("abc").unwrap();
        assert_eq!(result.picked, vec!["ITEM_1", "ITEM_2"]);
        assert!(result.errors.is_empty());
        assert!(result.finished_at.is_some());
        // One open plus two pickups.
        assert_eq!(sends(&f), 3);
        // The scan ran its full window on the manual clock.
        assert!(f.clock.now() >= Duration::from_secs(6));
    }

    #[test]
    fn test_rarity_scan_loads_datasets_once() {
        let mut ranks = RankTable::default();
        ranks.insert("Common", 1);
        ranks.insert("Rare", 3);
        let mut bundle = DatasetBundle { ranks, ..DatasetBundle::default() };
        bundle.items.insert("gem".into(), ItemDefinition { rarity: Some("Rare".into()), display_name: None });
        bundle.items.insert("pebble".into(), ItemDefinition { rarity: Some("Common".into()), display_name: None });

        let f = fixture_with(false, true, Some(bundle));
        f.world.add(f.region, "ITEM_a", Some(item("a", Vec3::ZERO).with_item_id("gem")), None);
        f.world.add(f.region, "ITEM_b", Some(item("b", Vec3::ZERO).with_item_id("pebble")), None);
        f.session.set_config_value("selectionPolicy", toml::Value::String("Rarity".into())).unwrap();

        let result = f.session.scan_and_collect(&container("abc")).unwrap();
        assert_eq!(result.picked, vec!["ITEM_a"]);
        assert_eq!(result.skipped, vec!["ITEM_b"]);

        f.session.scan_and_collect(&container("abc")).unwrap();
        assert_eq!(*f.host.dataset_loads.lock().unwrap(), 1);
    }

    #[test]
    fn test_rarity_scan_without_datasets_rejects_everything() {
        let f = fixture();
        f.world.add(f.region, "ITEM_a", Some(item("a", Vec3::ZERO).with_item_id("gem")), None);
        f.session.set_config_value("selection_policy", toml::Value::String("rarity".into())).unwrap();

        let result = f.session.scan_and_collect(&container("abc")).unwrap();
        assert!(result.picked.is_empty());
        assert_eq!(result.skipped, vec!["ITEM_a"]);
        assert_eq!(sends(&f), 0);
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn test_initialize_applies_overrides_and_resolves() {
        let f = fixture();
        let overrides: toml::Table = toml::from_str("verbose = true\nopenCooldown = 5.0").unwrap();
        f.session.initialize(&overrides).unwrap();

        let settings = f.session.settings();
        assert!(settings.verbose);
        assert_eq!(settings.open_cooldown, Duration::from_secs(5));
        assert!(f.session.capabilities().has(Capability::DirectChannel));

        f.session.open_container("abc").unwrap();
        f.clock.advance(Duration::from_secs(3));
        assert!(matches!(f.session.open_container("abc"), Err(TetherError::CooldownActive { .. })));
    }

    #[test]
    fn test_invalid_overrides_leave_settings_untouched() {
        let f = fixture();
        let overrides: toml::Table = toml::from_str("verbose = true\npollInterval = 0.0").unwrap();
        assert!(matches!(f.session.initialize(&overrides), Err(TetherError::ConfigError { .. })));
        assert!(!f.session.settings().verbose);

        assert!(f.session.set_config_value("noSuchKey", toml::Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_oversized_poll_window_is_refused_and_scan_still_ends() {
        let f = fixture();
        f.world.add(f.region, "ITEM_1", Some(item("1", Vec3::ZERO)), None);
        f.clock.advance(Duration::from_secs(3600));

        let huge = toml::Value::Float(18446744073709549568.0);
        assert!(matches!(
            f.session.set_config_value("postOpenPollWindow", huge),
            Err(TetherError::ConfigError { .. })
        ));
        assert_eq!(f.session.settings().post_open_poll_window, Duration::from_secs(6));

        let result = f.session.scan_and_collect(&container("abc")).unwrap();
        assert_eq!(result.picked, vec!["ITEM_1"]);
        assert!(f.clock.now() > Duration::from_secs(3606));
    }

    #[test]
    fn test_dataset_load_failure_is_reported() {
        let f = fixture();
        assert!(matches!(f.session.load_reference_datasets(), Err(TetherError::DatasetUnavailable { .. })));
    }
}
