//! Scenario 2: Degraded Transport
//!
//! No encoders, no structured handle, no direct channel. The well-known
//! named channel and the request endpoint both fault, so every command
//! falls through to the broadcast tier, where one healthy channel among
//! failing ones is enough.

use std::sync::Arc;

use tether_contracts::{command::Opcode, entity::EntityKind, error::TetherResult};
use tether_core::ManualClock;
use tether_session::Session;

use crate::{
    channel::SimChannel,
    host::{SimCapabilities, SimHost},
    mock_data::{SimGame, DATASETS_TOML},
    scenarios::{print_report, print_scan},
};

const CONTAINER: &str = "cellar";

pub fn run_scenario() -> TetherResult<()> {
    println!("=== Scenario 2: Degraded Transport ===");
    println!();

    let clock = Arc::new(ManualClock::new());
    let game = SimGame::empty(clock.clone());
    game.place_container(CONTAINER);

    let remotes = game.world.folder_path(&["Shared", "Remotes"]);
    let packet = SimChannel::new("Packet", Some(game.server.clone()));
    packet.set_failing(true);
    let request = SimChannel::message_only("Request", Some(game.server.clone()));
    request.set_failing(true);
    let lobby = game.world.folder_path(&["Shared", "Lobby"]);
    let chat = SimChannel::message_only("Chat", Some(game.server.clone()));
    game.world.add_channel(remotes, packet.clone());
    game.world.add_channel(game.shared, request.clone());
    game.world.add_channel(lobby, chat.clone());

    let host = SimHost::new(game.world.clone(), Some(game.plot))
        .with_capabilities(SimCapabilities { native_buffer: false, buffer_primitive: false })
        .with_datasets(DATASETS_TOML);
    let session = Session::builder(Arc::new(host)).clock(clock).build();

    let capabilities = session.capabilities();
    println!("  Capabilities: {:?}", capabilities.present());
    println!("  Channels: Packet [FAULTING], Request [FAULTING], Lobby/Chat [OK]");
    println!();

    let report = session.open_container(CONTAINER)?;
    print_report("Open dispatched:", &report);

    let container = session.find_entity_by_typed_name(EntityKind::Container, CONTAINER, Some(game.plot))?;
    let result = session.scan_and_collect(&container)?;
    print_scan(&result);
    println!();

    println!(
        "  Calls: Packet={} Request={} Chat={}",
        packet.calls(),
        request.calls(),
        chat.calls()
    );
    println!(
        "  Server saw {} open(s), {} pickup(s)",
        game.server.received_for(Opcode::OPEN_CONTAINER).len(),
        game.server.received_for(Opcode::PICKUP_ITEM).len()
            + game.server.received_for(Opcode::PICKUP_ORB).len(),
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}
