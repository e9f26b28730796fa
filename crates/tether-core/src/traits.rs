//! Collaborator interfaces the command layer is written against.
//!
//! The live world, its transport channels, and the optional native encoding
//! utilities are all external. The core only sees them through these traits:
//!
//! - `Host`: capability probes, the world, the owned region, datasets
//! - `WorldTree`: typed tree lookup over the world's object hierarchy
//! - `Channel`: one transport endpoint
//! - `BufferUtility` / `BufferPrimitive`: optional payload encoders
//! - `PolicyEngine`: the candidate selection gate used by the scheduler

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tether_contracts::{
    command::{ActionKind, GenericMessage},
    cooldown::CooldownTable,
    dataset::DatasetBundle,
    entity::Entity,
    error::HostFault,
    policy::{PolicyConfig, PolicyVerdict},
};

use crate::frame::TransportPayload;

/// Opaque handle to a node in the world tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// One transport endpoint reachable in the world.
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// True when the channel accepts the two-frame `send_pair` call.
    fn supports_pair_send(&self) -> bool;

    /// Send the opcode frame and the header frame as one call.
    fn send_pair(&self, first: &TransportPayload, second: &TransportPayload) -> Result<(), HostFault>;

    /// Send the generic `{opcode, identifier}` form.
    fn send_message(&self, message: &GenericMessage) -> Result<(), HostFault>;
}

/// Read-only view of the world's object hierarchy.
///
/// Every lookup returns an absent value on a missing segment rather than
/// failing.
pub trait WorldTree: Send + Sync {
    fn root(&self) -> NodeId;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn name(&self, node: NodeId) -> Option<String>;

    /// Snapshot of the entity at `node`, if the node is one.
    fn entity(&self, node: NodeId) -> Option<Entity>;

    /// The transport endpoint at `node`, if the node is one.
    fn channel(&self, node: NodeId) -> Option<Arc<dyn Channel>>;

    fn find_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.children(node)
            .into_iter()
            .find(|child| self.name(*child).as_deref() == Some(name))
    }

    /// Walk `path` from the root, one child name per segment.
    fn lookup(&self, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root(), |node, segment| self.find_child(node, segment))
    }

    /// All nodes below `node`, breadth first, excluding `node` itself.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue: VecDeque<NodeId> = self.children(node).into();
        while let Some(next) = queue.pop_front() {
            out.push(next);
            queue.extend(self.children(next));
        }
        out
    }
}

/// A native buffer-producing utility. Two call shapes are conventional and
/// neither is authoritative, so both are exposed.
pub trait BufferUtility: Send + Sync {
    /// Factory shape: build a buffer directly from bytes.
    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault>;

    /// Allocate-then-write shape.
    fn create_and_write(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault>;
}

/// A generic low-level buffer primitive.
pub trait BufferPrimitive: Send + Sync {
    fn wrap(&self, bytes: &[u8]) -> Result<Vec<u8>, HostFault>;
}

/// The environment the command layer runs in.
///
/// Probe methods may fail; callers absorb the fault and treat the capability
/// as absent.
pub trait Host: Send + Sync {
    fn native_buffer(&self) -> Result<Option<Arc<dyn BufferUtility>>, HostFault>;

    fn buffer_primitive(&self) -> Result<Option<Arc<dyn BufferPrimitive>>, HostFault>;

    fn world(&self) -> Arc<dyn WorldTree>;

    /// The caller's own workspace region.
    fn owned_region(&self) -> Result<Option<NodeId>, HostFault>;

    fn load_datasets(&self) -> Result<DatasetBundle, HostFault>;
}

/// Everything a policy engine reads to decide on one candidate.
pub struct PolicyContext<'a> {
    pub action: ActionKind,
    pub config: &'a PolicyConfig,
    pub cooldowns: &'a CooldownTable,
    pub datasets: &'a DatasetBundle,
    /// Current time on the scheduler's clock.
    pub now: Duration,
}

/// Decides whether a discovered entity should be acted on.
///
/// Implementations are pure: they never write the cooldown table. The caller
/// stamps cooldowns after a successful dispatch.
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, entity: &Entity, ctx: &PolicyContext<'_>) -> PolicyVerdict;

    fn should_act(&self, entity: &Entity, ctx: &PolicyContext<'_>) -> bool {
        self.evaluate(entity, ctx).is_accept()
    }
}
