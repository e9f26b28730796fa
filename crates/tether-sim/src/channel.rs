//! Simulated transport endpoints.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tether_contracts::{command::GenericMessage, error::HostFault};
use tether_core::{traits::Channel, TransportPayload};

use crate::server::{decode_pair, Delivery, SimServer};

/// A channel that forwards what it receives to a `SimServer`.
///
/// A channel without a server accepts and drops everything. A failing
/// channel counts the call and then returns a fault.
pub struct SimChannel {
    name: String,
    pair: bool,
    failing: AtomicBool,
    calls: AtomicU32,
    server: Option<Arc<SimServer>>,
}

impl SimChannel {
    pub fn new(name: &str, server: Option<Arc<SimServer>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            pair: true,
            failing: AtomicBool::new(false),
            calls: AtomicU32::new(0),
            server,
        })
    }

    /// A channel that only takes the generic message form.
    pub fn message_only(name: &str, server: Option<Arc<SimServer>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            pair: false,
            failing: AtomicBool::new(false),
            calls: AtomicU32::new(0),
            server,
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), HostFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(HostFault::new(format!("{} is unreachable", self.name)));
        }
        Ok(())
    }
}

impl Channel for SimChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_pair_send(&self) -> bool {
        self.pair
    }

    fn send_pair(&self, first: &TransportPayload, second: &TransportPayload) -> Result<(), HostFault> {
        if !self.pair {
            return Err(HostFault::new(format!("{} does not accept frame pairs", self.name)));
        }
        self.begin()?;
        let (opcode, identifier) = decode_pair(&first.bytes, &second.bytes)?;
        if let Some(server) = &self.server {
            server.accept(&self.name, Delivery::Pair, opcode, &identifier);
        }
        Ok(())
    }

    fn send_message(&self, message: &GenericMessage) -> Result<(), HostFault> {
        self.begin()?;
        match &self.server {
            Some(server) => server.deliver_json(&self.name, &message.to_json()),
            None => Ok(()),
        }
    }
}
