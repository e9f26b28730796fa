//! The multi-tier transport dispatcher.
//!
//! `send` walks the tiers below in strict order and stops at the first
//! success:
//!
//!   1. structured handle sub-channel (frame pair)
//!   2. direct channel (frame pair)
//!   3. well-known channel names under the search roots (frame pair)
//!   4. generic request channels (`{opcode, identifier}` message)
//!   5. broadcast of the generic message to every channel under the
//!      broadcast root (degraded mode)
//!
//! Every channel fault is caught, logged, and folded into the next tier.
//! Only when all tiers fail does the caller see `TransportExhausted`. Each
//! call is one best-effort attempt; there is no acknowledgement and no retry.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use tether_contracts::{
    command::{Command, Opcode},
    error::{TetherError, TetherResult},
};

use crate::{
    capability::{pair_capable, CapabilityResolver, ChannelHandle},
    config::{segments, Routes},
    context::SharedContext,
    frame::{EncodedCommand, FrameEncoder, PayloadEncoding},
    traits::{NodeId, WorldTree},
};

/// The dispatch tiers, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DispatchTier {
    StructuredHandle,
    DirectChannel,
    NamedChannel,
    GenericRequest,
    Broadcast,
}

impl DispatchTier {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchTier::StructuredHandle => "structured-handle",
            DispatchTier::DirectChannel => "direct-channel",
            DispatchTier::NamedChannel => "named-channel",
            DispatchTier::GenericRequest => "generic-request",
            DispatchTier::Broadcast => "broadcast",
        }
    }
}

/// How a successful send was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub tier: DispatchTier,
    /// Name of the delivering channel; for broadcasts, the first target that
    /// accepted.
    pub channel: String,
    pub encoding: PayloadEncoding,
    /// Channels that accepted the command (more than one only on broadcast).
    pub delivered: usize,
}

pub struct TransportDispatcher {
    resolver: Arc<CapabilityResolver>,
    world: Arc<dyn WorldTree>,
    context: Arc<SharedContext>,
    routes: Routes,
}

impl TransportDispatcher {
    pub fn new(
        resolver: Arc<CapabilityResolver>,
        world: Arc<dyn WorldTree>,
        context: Arc<SharedContext>,
        routes: Routes,
    ) -> Self {
        Self { resolver, world, context, routes }
    }

    pub fn send(&self, opcode: Opcode, identifier: &str) -> TetherResult<DispatchReport> {
        self.send_command(&Command::new(opcode, identifier))
    }

    pub fn send_command(&self, command: &Command) -> TetherResult<DispatchReport> {
        if command.identifier.is_empty() {
            return Err(TetherError::MissingIdentifier {
                operation: format!("dispatch opcode {}", command.opcode),
            });
        }

        let settings = self.context.settings();
        let capabilities = self.resolver.resolve();
        let encoded = FrameEncoder::new(settings.prefer_native_encoder).encode(command, &capabilities);
        let mut attempt = Attempt::new(command, &encoded);

        debug!(
            opcode = %command.opcode,
            identifier = %command.identifier,
            encoding = ?encoded.encoding(),
            "dispatch starting"
        );

        let report = capabilities
            .structured()
            .and_then(|h| attempt.pair(DispatchTier::StructuredHandle, h))
            .or_else(|| {
                capabilities
                    .direct()
                    .and_then(|h| attempt.pair(DispatchTier::DirectChannel, h))
            })
            .or_else(|| {
                self.named_channels()
                    .iter()
                    .find_map(|h| attempt.pair(DispatchTier::NamedChannel, h))
            })
            .or_else(|| {
                self.request_channels()
                    .iter()
                    .find_map(|h| attempt.message(DispatchTier::GenericRequest, h))
            })
            .or_else(|| attempt.broadcast(&self.broadcast_targets()));

        match report {
            Some(report) => {
                if settings.verbose {
                    info!(
                        opcode = %command.opcode,
                        identifier = %command.identifier,
                        tier = report.tier.as_str(),
                        channel = %report.channel,
                        "command dispatched"
                    );
                } else {
                    debug!(
                        opcode = %command.opcode,
                        identifier = %command.identifier,
                        tier = report.tier.as_str(),
                        channel = %report.channel,
                        "command dispatched"
                    );
                }
                Ok(report)
            }
            None => {
                let reason = attempt.summary();
                warn!(
                    opcode = %command.opcode,
                    identifier = %command.identifier,
                    %reason,
                    "every dispatch tier failed"
                );
                Err(TetherError::TransportExhausted { reason })
            }
        }
    }

    /// Pair-capable channels with a well-known name under any search root, in
    /// (name, root) order, without duplicates.
    fn named_channels(&self) -> Vec<ChannelHandle> {
        let world = self.world.as_ref();
        let roots = self.roots();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in &self.routes.channel_names {
            for root in &roots {
                if let Some(node) = world.find_child(*root, name) {
                    if seen.insert(node) {
                        out.extend(pair_capable(world, node));
                    }
                }
            }
        }
        out
    }

    fn request_channels(&self) -> Vec<ChannelHandle> {
        let world = self.world.as_ref();
        let roots = self.roots();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in &self.routes.request_names {
            for root in &roots {
                let Some(node) = world.find_child(*root, name) else { continue };
                if !seen.insert(node) {
                    continue;
                }
                if let Some(channel) = world.channel(node) {
                    out.push(ChannelHandle { node, channel });
                }
            }
        }
        out
    }

    fn broadcast_targets(&self) -> Vec<ChannelHandle> {
        let world = self.world.as_ref();
        let Some(root) = world.lookup(&segments(&self.routes.broadcast_root)) else {
            return Vec::new();
        };
        world
            .descendants(root)
            .into_iter()
            .filter_map(|node| world.channel(node).map(|channel| ChannelHandle { node, channel }))
            .collect()
    }

    fn roots(&self) -> Vec<NodeId> {
        self.routes
            .search_roots
            .iter()
            .filter_map(|path| self.world.lookup(&segments(path)))
            .collect()
    }
}

/// Bookkeeping for one `send` call: which nodes already took a frame pair and
/// why each attempt failed.
struct Attempt<'a> {
    command: &'a Command,
    encoded: &'a EncodedCommand,
    tried_pair: HashSet<NodeId>,
    failures: Vec<String>,
}

impl<'a> Attempt<'a> {
    fn new(command: &'a Command, encoded: &'a EncodedCommand) -> Self {
        Self { command, encoded, tried_pair: HashSet::new(), failures: Vec::new() }
    }

    fn pair(&mut self, tier: DispatchTier, handle: &ChannelHandle) -> Option<DispatchReport> {
        if !self.tried_pair.insert(handle.node) {
            return None;
        }
        let result = handle.channel.send_pair(&self.encoded.opcode, &self.encoded.header);
        self.settle(tier, handle, result)
    }

    fn message(&mut self, tier: DispatchTier, handle: &ChannelHandle) -> Option<DispatchReport> {
        let result = handle.channel.send_message(&self.command.to_message());
        self.settle(tier, handle, result)
    }

    /// Send the generic message to every target. One failing target never
    /// stops the rest; the broadcast succeeds if any target accepted.
    fn broadcast(&mut self, targets: &[ChannelHandle]) -> Option<DispatchReport> {
        if targets.is_empty() {
            return None;
        }
        warn!(
            identifier = %self.command.identifier,
            targets = targets.len(),
            "falling back to broadcast"
        );

        let message = self.command.to_message();
        let mut first_accepting: Option<String> = None;
        let mut delivered = 0;
        for handle in targets {
            match handle.channel.send_message(&message) {
                Ok(()) => {
                    delivered += 1;
                    first_accepting.get_or_insert_with(|| handle.channel.name().to_string());
                }
                Err(fault) => {
                    debug!(channel = handle.channel.name(), %fault, "broadcast target failed");
                    self.failures.push(format!(
                        "{} '{}': {}",
                        DispatchTier::Broadcast.as_str(),
                        handle.channel.name(),
                        fault
                    ));
                }
            }
        }

        first_accepting.map(|channel| DispatchReport {
            tier: DispatchTier::Broadcast,
            channel,
            encoding: PayloadEncoding::Raw,
            delivered,
        })
    }

    fn settle(
        &mut self,
        tier: DispatchTier,
        handle: &ChannelHandle,
        result: Result<(), tether_contracts::error::HostFault>,
    ) -> Option<DispatchReport> {
        match result {
            Ok(()) => Some(DispatchReport {
                tier,
                channel: handle.channel.name().to_string(),
                encoding: match tier {
                    DispatchTier::GenericRequest | DispatchTier::Broadcast => PayloadEncoding::Raw,
                    _ => self.encoded.encoding(),
                },
                delivered: 1,
            }),
            Err(fault) => {
                warn!(
                    tier = tier.as_str(),
                    channel = handle.channel.name(),
                    %fault,
                    "dispatch tier failed"
                );
                self.failures
                    .push(format!("{} '{}': {}", tier.as_str(), handle.channel.name(), fault));
                None
            }
        }
    }

    fn summary(&self) -> String {
        if self.failures.is_empty() {
            "no transport channel found".to_string()
        } else {
            self.failures.join("; ")
        }
    }
}
