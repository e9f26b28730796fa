//! # tether-sim
//!
//! A simulated world and server for exercising the tether command layer end
//! to end, without a live environment.
//!
//! - [`world::SimWorld`]: a world tree whose nodes appear and disappear over
//!   simulated time
//! - [`server::SimServer`]: decodes received commands and applies them
//!   (opening spawns loot, picking up removes it)
//! - [`channel::SimChannel`]: transport endpoints that can be made to fault
//! - [`host::SimHost`]: a `Host` with switchable encoders and a TOML dataset
//!   source
//!
//! Three scenarios under [`scenarios`] drive a real `Session` against it. All
//! data is fictional.

pub mod channel;
pub mod host;
pub mod mock_data;
pub mod scenarios;
pub mod server;
pub mod world;

// ── Tests ─────────────────────────────────────────────────────────────────────
