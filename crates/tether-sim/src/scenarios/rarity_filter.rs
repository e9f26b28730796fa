//! Scenario 3: Rarity Filter
//!
//! Same healthy environment as scenario 1, but the selection policy is
//! switched to `Rarity` with a `Rare` threshold. The reference datasets are
//! loaded on the first scan. Commons and items whose rarity cannot be
//! resolved stay on the floor.

use std::sync::Arc;

use tether_contracts::error::TetherResult;
use tether_core::ManualClock;
use tether_session::Session;

use crate::mock_data::SimGame;
use crate::scenarios::{print_report, print_scan};

const CONTAINER: &str = "vault";

pub fn run_scenario() -> TetherResult<()> {
    println!("=== Scenario 3: Rarity Filter ===");
    println!();

    let clock = Arc::new(ManualClock::new());
    let game = SimGame::standard(clock.clone(), CONTAINER);
    let session = Session::builder(game.host.clone()).clock(clock).build();

    let mut overrides = toml::Table::new();
    overrides.insert("selectionPolicy".into(), toml::Value::String("Rarity".into()));
    overrides.insert("rarityThreshold".into(), toml::Value::String("Rare".into()));
    session.initialize(&overrides)?;
    println!("  Policy: Rarity, threshold Rare");
    println!();

    match session.buy_container("crate_mystery") {
        Ok(report) => print_report("Buy dispatched:", &report),
        Err(e) => println!("  Buy crate_mystery:     {}", e),
    }

    let result = session.open_and_collect(CONTAINER)?;
    print_scan(&result);

    let datasets = session.context().datasets();
    println!();
    println!("  Ranked rarities loaded: {}", datasets.ranks.0.len());
    match session.buy_container("crate_mystery") {
        Ok(report) => print_report("Buy dispatched:", &report),
        Err(e) => println!("  Buy crate_mystery:     {}", e),
    }
    let report = session.buy_container("crate_gilded")?;
    print_report("Buy crate_gilded:", &report);

    println!("  Left in plot: {:?}", game.world.entity_names(game.plot));
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}
