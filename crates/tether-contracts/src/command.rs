//! Command and wire constant definitions.
//!
//! A `Command` is transient: built per call, encoded into two frames and
//! handed to the dispatcher. Nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::error::HostFault;

/// Small integer tag identifying the requested server-side action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opcode(pub u8);

impl Opcode {
    /// Open a container by typed name.
    pub const OPEN_CONTAINER: Opcode = Opcode(56);
    /// Buy a container type by catalog identifier.
    pub const BUY_CONTAINER: Opcode = Opcode(54);
    /// Pick up an item by typed name.
    pub const PICKUP_ITEM: Opcode = Opcode(15);
    /// Pick up an orb by typed name.
    pub const PICKUP_ORB: Opcode = Opcode(33);

    /// The opcode used to pick up an entity of `kind`, if it can be picked up.
    pub fn pickup_for(kind: EntityKind) -> Option<Opcode> {
        match kind {
            EntityKind::Item => Some(Self::PICKUP_ITEM),
            EntityKind::Orb => Some(Self::PICKUP_ORB),
            EntityKind::Container => None,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The action families that carry their own cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Open,
    Buy,
    Pickup,
}

/// One outbound request: an opcode plus the identifier it applies to.
///
/// Identifiers are typed names (`ITEM_<uuid>`) for entity commands, or free-form
/// catalog identifiers for purchases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub opcode: Opcode,
    pub identifier: String,
}

impl Command {
    pub fn new(opcode: Opcode, identifier: impl Into<String>) -> Self {
        Self { opcode, identifier: identifier.into() }
    }

    /// The generic structured form used by the request and broadcast tiers.
    pub fn to_message(&self) -> GenericMessage {
        GenericMessage {
            opcode: self.opcode.0,
            identifier: self.identifier.clone(),
        }
    }
}

/// Structured `{opcode, identifier}` message for channels that do not accept
/// binary frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericMessage {
    pub opcode: u8,
    pub identifier: String,
}

impl GenericMessage {
    /// Serialize to compact JSON, the form generic channels consume.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "opcode": self.opcode, "identifier": self.identifier }).to_string()
    }

    /// Parse the JSON form back, as a receiving endpoint does.
    pub fn from_json(json: &str) -> Result<Self, HostFault> {
        serde_json::from_str(json).map_err(|e| HostFault::new(format!("malformed generic message: {}", e)))
    }
}
