//! # tether-policy
//!
//! A fail-closed selection policy engine for the tether pickup scheduler.
//!
//! ## Overview
//!
//! This crate provides [`SelectionPolicyEngine`], which implements the
//! [`PolicyEngine`](tether_core::traits::PolicyEngine) trait, and TOML
//! loading for the reference datasets the `Rarity` mode ranks against.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tether_policy::{datasets, SelectionPolicyEngine};
//!
//! let bundle = datasets::from_toml_str(include_str!("datasets.toml"))?;
//! let engine = SelectionPolicyEngine::new();
//! ```
//!
//! ## Fail-closed ranking
//!
//! In `Rarity` mode an item whose rarity cannot be resolved, or whose rarity
//! or the threshold is missing from the rank table, is rejected.

pub mod datasets;
pub mod engine;

pub use datasets::TomlDatasetSource;
pub use engine::SelectionPolicyEngine;

// ── Tests ─────────────────────────────────────────────────────────────────────
