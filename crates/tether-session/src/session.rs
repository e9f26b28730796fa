//! The public operation surface.
//!
//! A `Session` owns the shared context (settings, cooldowns, datasets), the
//! capability resolver, dispatcher, locator, and scheduler for one host.
//! Every operation returns a `TetherResult`; none of them can abort the
//! caller.
//!
//! Single-shot operations follow `Requested → (CooldownRejected | Dispatched)`.
//! The cooldown is stamped only after a successful dispatch, and nothing
//! waits for the world to confirm the command.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tether_contracts::{
    command::{ActionKind, Command, Opcode},
    dataset::DatasetBundle,
    entity::{Entity, EntityKind},
    error::{TetherError, TetherResult},
    policy::SelectionMode,
    scan::ScanResult,
};
use tether_core::{
    clock::{Clock, SystemClock},
    config::{Routes, Settings},
    context::SharedContext,
    dispatch::{DispatchReport, TransportDispatcher},
    locate::EntityLocator,
    scheduler::PickupScheduler,
    traits::{Host, NodeId, PolicyEngine},
    CapabilityResolver, CapabilitySet,
};
use tether_policy::SelectionPolicyEngine;

pub struct Session {
    host: Arc<dyn Host>,
    context: Arc<SharedContext>,
    resolver: Arc<CapabilityResolver>,
    dispatcher: Arc<TransportDispatcher>,
    locator: Arc<EntityLocator>,
    scheduler: PickupScheduler,
}

/// Builder for `Session`; every part has a default.
pub struct SessionBuilder {
    host: Arc<dyn Host>,
    settings: Settings,
    routes: Routes,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn PolicyEngine>,
}

impl SessionBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn PolicyEngine>) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Session {
        let world = self.host.world();
        let context = Arc::new(SharedContext::new(self.settings, self.clock));
        let resolver = Arc::new(CapabilityResolver::new(self.host.clone(), self.routes.clone()));
        let dispatcher = Arc::new(TransportDispatcher::new(
            resolver.clone(),
            world.clone(),
            context.clone(),
            self.routes,
        ));
        let locator = Arc::new(EntityLocator::new(world));
        let scheduler =
            PickupScheduler::new(context.clone(), locator.clone(), dispatcher.clone(), self.policy);

        Session { host: self.host, context, resolver, dispatcher, locator, scheduler }
    }
}

impl Session {
    pub fn builder(host: Arc<dyn Host>) -> SessionBuilder {
        SessionBuilder {
            host,
            settings: Settings::default(),
            routes: Routes::default(),
            clock: Arc::new(SystemClock::new()),
            policy: Arc::new(SelectionPolicyEngine::new()),
        }
    }

    /// A session with default settings, routes, wall clock, and policy engine.
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::builder(host).build()
    }

    /// Apply `overrides` and re-resolve capabilities.
    pub fn initialize(&self, overrides: &toml::Table) -> TetherResult<()> {
        self.context.update_settings(|s| s.apply_overrides(overrides))?;
        self.resolver.reset();
        let capabilities = self.resolver.resolve();
        info!(capabilities = ?capabilities, overrides = overrides.len(), "session initialized");
        Ok(())
    }

    pub fn set_config_value(&self, key: &str, value: toml::Value) -> TetherResult<()> {
        self.context.update_settings(|s| s.set_value(key, value))?;
        debug!(key, "configuration updated");
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.context.settings()
    }

    pub fn capabilities(&self) -> Arc<CapabilitySet> {
        self.resolver.resolve()
    }

    pub fn context(&self) -> &Arc<SharedContext> {
        &self.context
    }

    pub fn find_owned_region(&self) -> TetherResult<NodeId> {
        match self.host.owned_region() {
            Ok(Some(region)) => Ok(region),
            Ok(None) => Err(TetherError::RegionNotFound {
                reason: "host reported no owned region".to_string(),
            }),
            Err(fault) => Err(TetherError::RegionNotFound { reason: fault.to_string() }),
        }
    }

    /// Look up `<KIND>_<uuid>` below `region`, or across the whole world.
    pub fn find_entity_by_typed_name(
        &self,
        kind: EntityKind,
        uuid: &str,
        region: Option<NodeId>,
    ) -> TetherResult<Entity> {
        require_identifier(uuid, "find entity")?;
        self.locator
            .find_by_typed_name(kind, uuid, region)
            .ok_or_else(|| TetherError::EntityNotFound { name: kind.typed_name(uuid) })
    }

    pub fn open_container(&self, uuid: &str) -> TetherResult<DispatchReport> {
        require_identifier(uuid, "open container")?;
        let name = EntityKind::Container.typed_name(uuid);
        self.single_shot(ActionKind::Open, Command::new(Opcode::OPEN_CONTAINER, name))
    }

    /// Buy a container type. When a non-empty container catalog is loaded the
    /// identifier must appear in it.
    pub fn buy_container(&self, catalog_id: &str) -> TetherResult<DispatchReport> {
        require_identifier(catalog_id, "buy container")?;
        let datasets = self.context.datasets();
        if !datasets.containers.is_empty() && !datasets.knows_container(catalog_id) {
            return Err(TetherError::EntityNotFound { name: catalog_id.to_string() });
        }
        self.single_shot(ActionKind::Buy, Command::new(Opcode::BUY_CONTAINER, catalog_id))
    }

    /// Pick up `ITEM_<uuid>` or, failing that, `ORB_<uuid>`.
    pub fn pickup_entity(&self, uuid: &str) -> TetherResult<DispatchReport> {
        require_identifier(uuid, "pickup")?;
        let entity = [EntityKind::Item, EntityKind::Orb]
            .into_iter()
            .find_map(|kind| self.locator.find_by_typed_name(kind, uuid, None))
            .ok_or_else(|| TetherError::EntityNotFound {
                name: format!("ITEM_{uuid} / ORB_{uuid}"),
            })?;
        let opcode = Opcode::pickup_for(entity.kind).ok_or_else(|| TetherError::EntityNotFound {
            name: entity.name.clone(),
        })?;
        self.single_shot(ActionKind::Pickup, Command::new(opcode, entity.name))
    }

    /// Poll the owned region for pickable entities inside `container` for the
    /// configured window.
    pub fn scan_and_collect(&self, container: &Entity) -> TetherResult<ScanResult> {
        let region = self.find_owned_region()?;
        self.ensure_datasets_for_policy();
        Ok(self.scheduler.scan(container, Some(region)))
    }

    /// Find the container in the owned region, open it, then scan it.
    pub fn open_and_collect(&self, uuid: &str) -> TetherResult<ScanResult> {
        require_identifier(uuid, "open and collect")?;
        let region = self.find_owned_region()?;
        let container = self.find_entity_by_typed_name(EntityKind::Container, uuid, Some(region))?;
        self.open_container(uuid)?;
        self.ensure_datasets_for_policy();
        Ok(self.scheduler.scan(&container, Some(region)))
    }

    /// Load the reference datasets from the host and make them the ones the
    /// policy engine ranks against.
    pub fn load_reference_datasets(&self) -> TetherResult<Arc<DatasetBundle>> {
        let bundle = self
            .host
            .load_datasets()
            .map_err(|fault| TetherError::DatasetUnavailable { reason: fault.to_string() })?;
        info!(
            ranks = bundle.ranks.0.len(),
            items = bundle.items.len(),
            containers = bundle.containers.len(),
            "reference datasets loaded"
        );
        Ok(self.context.set_datasets(bundle))
    }

    fn single_shot(&self, action: ActionKind, command: Command) -> TetherResult<DispatchReport> {
        if let Some(remaining) = self.context.cooldown_remaining(action, &command.identifier) {
            debug!(identifier = %command.identifier, ?action, "cooldown rejected");
            return Err(TetherError::CooldownActive {
                name: command.identifier,
                remaining_ms: remaining.as_millis() as u64,
            });
        }
        let report = self.dispatcher.send_command(&command)?;
        self.context.record_action(action, &command.identifier);
        Ok(report)
    }

    /// Rarity mode ranks against datasets; load them on first need. A load
    /// failure only means every candidate is rejected.
    fn ensure_datasets_for_policy(&self) {
        if self.context.settings().selection_policy != SelectionMode::Rarity {
            return;
        }
        if !self.context.datasets().ranks.is_empty() {
            return;
        }
        if let Err(e) = self.load_reference_datasets() {
            warn!(error = %e, "rarity policy active without reference datasets");
        }
    }
}

fn require_identifier(identifier: &str, operation: &str) -> TetherResult<()> {
    if identifier.trim().is_empty() {
        return Err(TetherError::MissingIdentifier { operation: operation.to_string() });
    }
    Ok(())
}
