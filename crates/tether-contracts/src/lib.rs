//! # tether-contracts
//!
//! Shared types, wire constants, and error contracts for the tether command
//! layer.
//!
//! Every crate in the workspace imports from here. No dispatch or polling
//! logic lives in this crate, only data definitions, small pure helpers, and
//! the error type.

pub mod command;
pub mod cooldown;
pub mod dataset;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod policy;
pub mod scan;
