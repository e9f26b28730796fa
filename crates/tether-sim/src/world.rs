//! An in-memory world tree whose contents change over simulated time.
//!
//! Every node carries the instant it becomes visible. Nodes scheduled for the
//! future and removed nodes are invisible to `WorldTree` queries, which is how
//! loot "replicates" in after a container opens.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tether_contracts::entity::Entity;
use tether_core::{
    traits::{Channel, NodeId, WorldTree},
    Clock,
};

struct SimNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    entity: Option<Entity>,
    channel: Option<Arc<dyn Channel>>,
    visible_from: Duration,
    removed: bool,
}

pub struct SimWorld {
    clock: Arc<dyn Clock>,
    nodes: Mutex<Vec<SimNode>>,
}

impl SimWorld {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            nodes: Mutex::new(vec![SimNode {
                name: "game".to_string(),
                parent: None,
                children: vec![],
                entity: None,
                channel: None,
                visible_from: Duration::ZERO,
                removed: false,
            }]),
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn nodes(&self) -> MutexGuard<'_, Vec<SimNode>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(
        &self,
        parent: NodeId,
        name: &str,
        entity: Option<Entity>,
        channel: Option<Arc<dyn Channel>>,
        visible_from: Duration,
    ) -> NodeId {
        let mut nodes = self.nodes();
        let id = NodeId(nodes.len() as u64);
        nodes.push(SimNode {
            name: name.to_string(),
            parent: Some(parent),
            children: vec![],
            entity,
            channel,
            visible_from,
            removed: false,
        });
        if let Some(p) = nodes.get_mut(parent.0 as usize) {
            p.children.push(id);
        }
        id
    }

    pub fn add_folder(&self, parent: NodeId, name: &str) -> NodeId {
        self.insert(parent, name, None, None, Duration::ZERO)
    }

    /// Create every missing folder along `path` and return the last one.
    pub fn folder_path(&self, path: &[&str]) -> NodeId {
        path.iter().fold(self.root(), |node, segment| {
            self.find_child(node, segment).unwrap_or_else(|| self.add_folder(node, segment))
        })
    }

    pub fn add_channel(&self, parent: NodeId, channel: Arc<dyn Channel>) -> NodeId {
        let name = channel.name().to_string();
        self.insert(parent, &name, None, Some(channel), Duration::ZERO)
    }

    pub fn add_entity(&self, parent: NodeId, entity: Entity) -> NodeId {
        let name = entity.name.clone();
        self.insert(parent, &name, Some(entity), None, Duration::ZERO)
    }

    /// Add an entity that only becomes visible once the clock reaches
    /// `visible_from`.
    pub fn schedule_entity(&self, parent: NodeId, entity: Entity, visible_from: Duration) -> NodeId {
        let name = entity.name.clone();
        self.insert(parent, &name, Some(entity), None, visible_from)
    }

    /// Remove the first visible node named `name`. Returns whether one was found.
    pub fn remove_named(&self, name: &str) -> bool {
        let now = self.clock.now();
        let mut nodes = self.nodes();
        match nodes.iter_mut().find(|n| n.name == name && !n.removed && n.visible_from <= now) {
            Some(node) => {
                node.removed = true;
                true
            }
            None => false,
        }
    }

    /// Names of the visible entities below `node`, breadth first.
    pub fn entity_names(&self, node: NodeId) -> Vec<String> {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.entity(n).map(|e| e.name))
            .collect()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes().get(node.0 as usize)?.parent
    }

    fn visible(node: &SimNode, now: Duration) -> bool {
        !node.removed && node.visible_from <= now
    }
}

impl WorldTree for SimWorld {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let now = self.clock.now();
        let nodes = self.nodes();
        let Some(parent) = nodes.get(node.0 as usize) else {
            return vec![];
        };
        parent
            .children
            .iter()
            .copied()
            .filter(|c| nodes.get(c.0 as usize).is_some_and(|n| Self::visible(n, now)))
            .collect()
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.nodes().get(node.0 as usize).map(|n| n.name.clone())
    }

    fn entity(&self, node: NodeId) -> Option<Entity> {
        let now = self.clock.now();
        let nodes = self.nodes();
        let n = nodes.get(node.0 as usize)?;
        if Self::visible(n, now) {
            n.entity.clone()
        } else {
            None
        }
    }

    fn channel(&self, node: NodeId) -> Option<Arc<dyn Channel>> {
        self.nodes().get(node.0 as usize)?.channel.clone()
    }
}
