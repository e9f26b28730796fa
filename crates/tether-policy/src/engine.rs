//! Selection policy engine implementation.
//!
//! `SelectionPolicyEngine` implements the `PolicyEngine` trait from
//! tether-core.
//!
//! Evaluation algorithm:
//!
//! 1. Cooldown: reject while the candidate's name is inside the action's
//!    cooldown window.
//! 2. `All`: accept.
//! 3. `Whitelist`: accept iff the candidate's base name is whitelisted.
//! 4. `Rarity`: resolve the candidate's rarity (definition map, then bucketed
//!    index), rank it and the threshold through the rank table, and accept iff
//!    `rank(candidate) >= rank(threshold)`. Anything unresolved is rejected.

use tracing::debug;

use tether_contracts::{
    entity::Entity,
    policy::{PolicyVerdict, SelectionMode},
};
use tether_core::traits::{PolicyContext, PolicyEngine};

#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionPolicyEngine;

impl SelectionPolicyEngine {
    pub fn new() -> Self {
        Self
    }

    fn evaluate_rarity(entity: &Entity, ctx: &PolicyContext<'_>) -> PolicyVerdict {
        let base = entity.base_name();
        let Some(rarity) = ctx.datasets.rarity_of(base) else {
            return PolicyVerdict::reject(format!("rarity of '{}' is unknown", base));
        };

        let threshold = ctx.config.rarity_threshold.as_str();
        let ranks = &ctx.datasets.ranks;
        let (Some(rank), Some(required)) = (ranks.rank(rarity), ranks.rank(threshold)) else {
            return PolicyVerdict::reject(format!(
                "cannot rank '{}' against threshold '{}'",
                rarity, threshold
            ));
        };

        if rank >= required {
            PolicyVerdict::Accept
        } else {
            PolicyVerdict::reject(format!(
                "rarity '{}' ({}) is below threshold '{}' ({})",
                rarity, rank, threshold, required
            ))
        }
    }
}

impl PolicyEngine for SelectionPolicyEngine {
    fn evaluate(&self, entity: &Entity, ctx: &PolicyContext<'_>) -> PolicyVerdict {
        if let Some(remaining) = ctx.cooldowns.remaining(ctx.action, &entity.name, ctx.now) {
            return PolicyVerdict::reject(format!(
                "cooldown active ({} ms remaining)",
                remaining.as_millis()
            ));
        }

        let verdict = match ctx.config.mode {
            SelectionMode::All => PolicyVerdict::Accept,
            SelectionMode::Whitelist => {
                if ctx.config.whitelist.contains(entity.base_name()) {
                    PolicyVerdict::Accept
                } else {
                    PolicyVerdict::reject(format!("'{}' is not whitelisted", entity.base_name()))
                }
            }
            SelectionMode::Rarity => Self::evaluate_rarity(entity, ctx),
        };

        debug!(
            identifier = %entity.name,
            mode = ?ctx.config.mode,
            accepted = verdict.is_accept(),
            "policy evaluated"
        );
        verdict
    }
}
