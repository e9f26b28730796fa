//! Capability discovery.
//!
//! `CapabilityResolver` probes the environment once for the optional encoding
//! utilities and the preferred transport endpoints, then caches the result
//! for the life of the process (or until `reset`). Each probe is isolated: a
//! failing probe is logged and its capability recorded as absent. An empty
//! set is a valid result; it just sends the dispatcher down its fallback
//! tiers.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::{
    config::{segments, Routes},
    context::lock,
    traits::{BufferPrimitive, BufferUtility, Channel, Host, NodeId, WorldTree},
};

/// Names of the individually probed capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    NativeBuffer,
    BufferPrimitive,
    StructuredHandle,
    DirectChannel,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::NativeBuffer => "native-buffer",
            Capability::BufferPrimitive => "buffer-primitive",
            Capability::StructuredHandle => "structured-handle",
            Capability::DirectChannel => "direct-channel",
        }
    }
}

/// A transport endpoint together with the node it was found at.
#[derive(Clone)]
pub struct ChannelHandle {
    pub node: NodeId,
    pub channel: Arc<dyn Channel>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("node", &self.node)
            .field("channel", &self.channel.name())
            .finish()
    }
}

/// The resolved capabilities. Immutable once built.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    native_buffer: Option<Arc<dyn BufferUtility>>,
    buffer_primitive: Option<Arc<dyn BufferPrimitive>>,
    structured: Option<ChannelHandle>,
    direct: Option<ChannelHandle>,
}

impl CapabilitySet {
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::NativeBuffer => self.native_buffer.is_some(),
            Capability::BufferPrimitive => self.buffer_primitive.is_some(),
            Capability::StructuredHandle => self.structured.is_some(),
            Capability::DirectChannel => self.direct.is_some(),
        }
    }

    /// Every capability present, in probe order.
    pub fn present(&self) -> Vec<Capability> {
        [
            Capability::NativeBuffer,
            Capability::BufferPrimitive,
            Capability::StructuredHandle,
            Capability::DirectChannel,
        ]
        .into_iter()
        .filter(|c| self.has(*c))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    pub fn native_buffer(&self) -> Option<&Arc<dyn BufferUtility>> {
        self.native_buffer.as_ref()
    }

    pub fn buffer_primitive(&self) -> Option<&Arc<dyn BufferPrimitive>> {
        self.buffer_primitive.as_ref()
    }

    pub fn structured(&self) -> Option<&ChannelHandle> {
        self.structured.as_ref()
    }

    pub fn direct(&self) -> Option<&ChannelHandle> {
        self.direct.as_ref()
    }

    pub fn with_native_buffer(mut self, utility: Arc<dyn BufferUtility>) -> Self {
        self.native_buffer = Some(utility);
        self
    }

    pub fn with_buffer_primitive(mut self, primitive: Arc<dyn BufferPrimitive>) -> Self {
        self.buffer_primitive = Some(primitive);
        self
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.present().into_iter().map(Capability::as_str).collect();
        f.debug_struct("CapabilitySet").field("present", &names).finish()
    }
}

/// Resolves and caches the `CapabilitySet` for one host.
pub struct CapabilityResolver {
    host: Arc<dyn Host>,
    routes: Routes,
    cached: Mutex<Option<Arc<CapabilitySet>>>,
}

impl CapabilityResolver {
    pub fn new(host: Arc<dyn Host>, routes: Routes) -> Self {
        Self { host, routes, cached: Mutex::new(None) }
    }

    /// Return the cached set, probing the environment on first use.
    pub fn resolve(&self) -> Arc<CapabilitySet> {
        let mut cached = lock(&self.cached);
        if let Some(set) = cached.as_ref() {
            return set.clone();
        }
        let set = Arc::new(self.probe());
        debug!(capabilities = ?set, "capabilities resolved");
        *cached = Some(set.clone());
        set
    }

    /// Drop the cached set; the next `resolve` probes again.
    pub fn reset(&self) {
        *lock(&self.cached) = None;
    }

    pub fn is_resolved(&self) -> bool {
        lock(&self.cached).is_some()
    }

    fn probe(&self) -> CapabilitySet {
        let world = self.host.world();

        let native_buffer = match self.host.native_buffer() {
            Ok(found) => found,
            Err(fault) => {
                warn!(capability = Capability::NativeBuffer.as_str(), %fault, "capability probe failed");
                None
            }
        };

        let buffer_primitive = match self.host.buffer_primitive() {
            Ok(found) => found,
            Err(fault) => {
                warn!(capability = Capability::BufferPrimitive.as_str(), %fault, "capability probe failed");
                None
            }
        };

        CapabilitySet {
            native_buffer,
            buffer_primitive,
            structured: self.probe_structured(world.as_ref()),
            direct: self.probe_direct(world.as_ref()),
        }
    }

    /// First sub-channel of the structured handle that takes a frame pair.
    fn probe_structured(&self, world: &dyn WorldTree) -> Option<ChannelHandle> {
        let handle = world.lookup(&segments(&self.routes.structured_path))?;
        self.routes.structured_channels.iter().find_map(|name| {
            let node = world.find_child(handle, name)?;
            pair_capable(world, node)
        })
    }

    fn probe_direct(&self, world: &dyn WorldTree) -> Option<ChannelHandle> {
        let node = world.lookup(&segments(&self.routes.direct_path))?;
        pair_capable(world, node)
    }
}

pub(crate) fn pair_capable(world: &dyn WorldTree, node: NodeId) -> Option<ChannelHandle> {
    let channel = world.channel(node)?;
    channel.supports_pair_send().then_some(ChannelHandle { node, channel })
}
