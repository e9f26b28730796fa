//! The simulated authoritative side: decodes what the channels receive and
//! applies its effect to the world.
//!
//! - `OPEN_CONTAINER` schedules the container's loot table around it.
//! - `PICKUP_ITEM` / `PICKUP_ORB` remove the entity.
//! - `BUY_CONTAINER` is only recorded.
//!
//! Frame pairs arrive as raw bytes, generic messages as JSON.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use tether_contracts::{
    command::{GenericMessage, Opcode},
    entity::Entity,
    error::HostFault,
};
use tether_core::{frame::HEADER_MAGIC, traits::WorldTree, Clock};

use crate::world::SimWorld;

/// How a command arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pair,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCommand {
    pub channel: String,
    pub delivery: Delivery,
    pub opcode: Opcode,
    pub identifier: String,
}

/// One drop in a container's loot table. The entity's position is an offset
/// from the container; it appears `delay` after the open lands.
#[derive(Debug, Clone)]
pub struct LootDrop {
    pub entity: Entity,
    pub delay: Duration,
}

pub struct SimServer {
    world: Weak<SimWorld>,
    loot: Mutex<HashMap<String, Vec<LootDrop>>>,
    received: Mutex<Vec<ReceivedCommand>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decode the two-frame form back into `(opcode, identifier)`.
pub fn decode_pair(first: &[u8], second: &[u8]) -> Result<(u8, String), HostFault> {
    let [opcode] = first else {
        return Err(HostFault::new(format!("opcode frame must be 1 byte, got {}", first.len())));
    };
    let body = second
        .strip_prefix(HEADER_MAGIC.as_slice())
        .ok_or_else(|| HostFault::new("header frame is missing the protocol magic"))?;
    let (&len, identifier) = body
        .split_first()
        .ok_or_else(|| HostFault::new("header frame is missing the length byte"))?;
    if identifier.len() != len as usize {
        return Err(HostFault::new(format!(
            "header declares {} identifier bytes but carries {}",
            len,
            identifier.len()
        )));
    }
    Ok((*opcode, String::from_utf8_lossy(identifier).into_owned()))
}

impl SimServer {
    pub fn new(world: &Arc<SimWorld>) -> Arc<Self> {
        Arc::new(Self {
            world: Arc::downgrade(world),
            loot: Mutex::new(HashMap::new()),
            received: Mutex::new(vec![]),
        })
    }

    /// Register what opening `container` drops. The drops' positions are
    /// offsets from the container.
    pub fn set_loot(&self, container: &str, drops: Vec<LootDrop>) {
        lock(&self.loot).insert(container.to_string(), drops);
    }

    pub fn received(&self) -> Vec<ReceivedCommand> {
        lock(&self.received).clone()
    }

    /// Identifiers received with `opcode`, in arrival order.
    pub fn received_for(&self, opcode: Opcode) -> Vec<String> {
        lock(&self.received)
            .iter()
            .filter(|c| c.opcode == opcode)
            .map(|c| c.identifier.clone())
            .collect()
    }

    /// Take a generic message in its JSON wire form.
    pub fn deliver_json(&self, channel: &str, json: &str) -> Result<(), HostFault> {
        let message = GenericMessage::from_json(json)?;
        self.accept(channel, Delivery::Message, message.opcode, &message.identifier);
        Ok(())
    }

    pub(crate) fn accept(&self, channel: &str, delivery: Delivery, opcode: u8, identifier: &str) {
        let command = ReceivedCommand {
            channel: channel.to_string(),
            delivery,
            opcode: Opcode(opcode),
            identifier: identifier.to_string(),
        };
        trace!(channel, ?delivery, opcode, identifier, "server received command");
        lock(&self.received).push(command);

        let Some(world) = self.world.upgrade() else {
            return;
        };
        match Opcode(opcode) {
            Opcode::OPEN_CONTAINER => self.spawn_loot(&world, identifier),
            Opcode::PICKUP_ITEM | Opcode::PICKUP_ORB => {
                let removed = world.remove_named(identifier);
                debug!(identifier, removed, "pickup applied");
            }
            _ => {}
        }
    }

    fn spawn_loot(&self, world: &SimWorld, container: &str) {
        let Some(drops) = lock(&self.loot).remove(container) else {
            return;
        };
        let root = world.root();
        let Some((node, entity)) = world
            .descendants(root)
            .into_iter()
            .find_map(|n| world.entity(n).filter(|e| e.name == container).map(|e| (n, e)))
        else {
            return;
        };
        let parent = world.parent(node).unwrap_or(root);
        let now = world.clock().now();
        debug!(container, drops = drops.len(), "container opened, loot scheduled");
        for drop in drops {
            let mut loot = drop.entity;
            loot.position = entity.position + loot.position;
            world.schedule_entity(parent, loot, now.saturating_add(drop.delay));
        }
    }
}
