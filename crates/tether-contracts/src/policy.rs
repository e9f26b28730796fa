//! Selection policy configuration and verdict types.
//!
//! The policy engine consumes a `PolicyConfig` snapshot and emits a
//! `PolicyVerdict` per candidate. Rarity mode fails closed: anything that
//! cannot be ranked is rejected.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{TetherError, TetherResult};

/// Which candidates a scan acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Every candidate outside its cooldown.
    #[default]
    All,
    /// Candidates whose rarity ranks at or above the threshold.
    Rarity,
    /// Candidates whose base name is whitelisted.
    Whitelist,
}

impl std::str::FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SelectionMode::All),
            "rarity" => Ok(SelectionMode::Rarity),
            "whitelist" => Ok(SelectionMode::Whitelist),
            other => Err(format!("unknown selection policy '{other}'")),
        }
    }
}

/// Runtime-mutable policy settings. Scans take a clone at start and read only
/// that snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub mode: SelectionMode,
    pub rarity_threshold: String,
    pub whitelist: BTreeSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::All,
            rarity_threshold: "Rare".to_string(),
            whitelist: BTreeSet::new(),
        }
    }
}

/// The decision for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    Accept,
    Reject { reason: String },
}

impl PolicyVerdict {
    pub fn reject(reason: impl Into<String>) -> Self {
        PolicyVerdict::Reject { reason: reason.into() }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, PolicyVerdict::Accept)
    }

    /// `Ok` on accept, `PolicyReject` naming `identifier` otherwise.
    pub fn into_result(self, identifier: &str) -> TetherResult<()> {
        match self {
            PolicyVerdict::Accept => Ok(()),
            PolicyVerdict::Reject { reason } => Err(TetherError::PolicyReject {
                identifier: identifier.to_string(),
                reason,
            }),
        }
    }
}
