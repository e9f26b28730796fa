//! Read-side entity queries: typed-name lookup and geometric containment.
//!
//! The locator never mutates the world. Every call walks a fresh snapshot.

use std::sync::Arc;

use tracing::debug;

use tether_contracts::{
    entity::{Entity, EntityKind},
    geometry::ReferenceVolume,
};

use crate::traits::{NodeId, WorldTree};

pub struct EntityLocator {
    world: Arc<dyn WorldTree>,
}

impl EntityLocator {
    pub fn new(world: Arc<dyn WorldTree>) -> Self {
        Self { world }
    }

    /// Every entity below `scope` (the whole world when `None`), breadth first.
    pub fn entities(&self, scope: Option<NodeId>) -> Vec<(NodeId, Entity)> {
        let world = self.world.as_ref();
        let root = scope.unwrap_or_else(|| world.root());
        world
            .descendants(root)
            .into_iter()
            .filter_map(|node| world.entity(node).map(|e| (node, e)))
            .collect()
    }

    /// Find `<KIND>_<uuid>`: an exact, case-sensitive match first, then a
    /// case-insensitive one.
    pub fn find_by_typed_name(&self, kind: EntityKind, uuid: &str, scope: Option<NodeId>) -> Option<Entity> {
        self.find_node_by_typed_name(kind, uuid, scope).map(|(_, e)| e)
    }

    pub fn find_node_by_typed_name(
        &self,
        kind: EntityKind,
        uuid: &str,
        scope: Option<NodeId>,
    ) -> Option<(NodeId, Entity)> {
        let target = kind.typed_name(uuid);
        let entities = self.entities(scope);

        if let Some(hit) = entities.iter().find(|(_, e)| e.name == target) {
            return Some(hit.clone());
        }
        let hit = entities
            .into_iter()
            .find(|(_, e)| e.name.eq_ignore_ascii_case(&target));
        if hit.is_some() {
            debug!(name = %target, "typed name matched case-insensitively");
        }
        hit
    }

    /// Entities of any of `kinds` inside `volume`, in discovery order.
    pub fn find_contained(
        &self,
        volume: &ReferenceVolume,
        kinds: &[EntityKind],
        scope: Option<NodeId>,
    ) -> Vec<Entity> {
        self.entities(scope)
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| kinds.contains(&e.kind) && volume.contains(e.position))
            .collect()
    }
}
