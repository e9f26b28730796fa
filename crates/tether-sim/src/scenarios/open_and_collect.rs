//! Scenario 1: Open and Collect
//!
//! A healthy environment: native encoding and a direct `Shared/Remote`
//! channel. The session opens `CONTAINER_demo`, the server drops its loot
//! over the next 1.5 s, and the scheduler picks everything up under the
//! `All` policy. A second open inside the cooldown is refused locally.

use std::sync::Arc;

use tether_contracts::{
    command::Opcode,
    error::{TetherError, TetherResult},
};
use tether_core::ManualClock;
use tether_session::Session;

use crate::mock_data::SimGame;
use crate::scenarios::{print_report, print_scan};

const CONTAINER: &str = "demo";

pub fn run_scenario() -> TetherResult<()> {
    println!("=== Scenario 1: Open and Collect ===");
    println!();

    let clock = Arc::new(ManualClock::new());
    let game = SimGame::standard(clock.clone(), CONTAINER);
    let session = Session::builder(game.host.clone()).clock(clock).build();
    session.initialize(&toml::Table::new())?;

    let capabilities = session.capabilities();
    println!("  Capabilities: {:?}", capabilities.present());
    println!();

    let result = session.open_and_collect(CONTAINER)?;
    print_scan(&result);
    println!();

    match session.open_container(CONTAINER) {
        Err(TetherError::CooldownActive { name, remaining_ms }) => {
            println!("  Re-open {} refused: {} ms of cooldown left", name, remaining_ms);
        }
        Ok(report) => print_report("Re-open dispatched:", &report),
        Err(e) => return Err(e),
    }

    println!();
    println!(
        "  Server saw {} open(s), {} item pickup(s), {} orb pickup(s)",
        game.server.received_for(Opcode::OPEN_CONTAINER).len(),
        game.server.received_for(Opcode::PICKUP_ITEM).len(),
        game.server.received_for(Opcode::PICKUP_ORB).len(),
    );
    println!("  Left in plot: {:?}", game.world.entity_names(game.plot));
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}
