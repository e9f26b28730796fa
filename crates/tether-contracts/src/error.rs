//! Error types for the tether command layer.
//!
//! Every public operation returns `TetherResult<T>`. Nothing in the workspace
//! is allowed to abort the caller: collaborator faults are absorbed into
//! fallback tiers and only exhaustion becomes a caller-visible `TetherError`.

use thiserror::Error;

/// The unified error type for the tether crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TetherError {
    /// A required identifier argument was empty.
    #[error("missing identifier for {operation}")]
    MissingIdentifier { operation: String },

    /// A typed-name lookup found nothing.
    #[error("entity '{name}' not found")]
    EntityNotFound { name: String },

    /// The action was suppressed by the per-target cooldown.
    #[error("cooldown active for '{name}' ({remaining_ms} ms remaining)")]
    CooldownActive { name: String, remaining_ms: u64 },

    /// Every channel in the dispatch chain failed.
    #[error("transport exhausted: {reason}")]
    TransportExhausted { reason: String },

    /// An optional encoding path is absent.
    ///
    /// Internal only: the encoder falls through to the next tier instead of
    /// surfacing this.
    #[error("capability '{capability}' unavailable")]
    CapabilityUnavailable { capability: String },

    /// The caller's owned region could not be resolved.
    #[error("owned region not found: {reason}")]
    RegionNotFound { reason: String },

    /// A policy declined the candidate. Recorded under `skipped`, never an abort.
    #[error("policy rejected '{identifier}': {reason}")]
    PolicyReject { identifier: String, reason: String },

    /// A configuration key or value is invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Reference datasets could not be loaded.
    #[error("reference datasets unavailable: {reason}")]
    DatasetUnavailable { reason: String },
}

/// Convenience alias used throughout the tether crates.
pub type TetherResult<T> = Result<T, TetherError>;

/// A fault reported by an external collaborator (environment probe, channel,
/// dataset source).
///
/// Host faults never cross a component boundary on their own; they are logged
/// and folded into the next fallback tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostFault(pub String);

impl HostFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
