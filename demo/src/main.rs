//! tether simulated world demo CLI
//!
//! Runs one or all of the three simulated scenarios. Each scenario drives a
//! real `Session` (capability resolution, tiered dispatch, pickup scheduling,
//! selection policy) against the in-memory world and server from `tether-sim`.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- open-and-collect
//!   cargo run -p demo -- degraded-transport
//!   cargo run -p demo -- --verbose rarity-filter

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tether_contracts::error::TetherResult;
use tether_sim::scenarios::{degraded_transport, open_and_collect, rarity_filter};

// ── CLI definition ────────────────────────────────────────────────────────────

/// tether: resilient command dispatch and pickup scheduling demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "tether simulated world demo",
    long_about = "Runs tether scenarios against a simulated world showing tiered\n\
                  transport fallback, cooldowns, and policy-gated pickup."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: Open and Collect (healthy transport, All policy).
    OpenAndCollect,
    /// Scenario 2: Degraded Transport (everything falls through to broadcast).
    DegradedTransport,
    /// Scenario 3: Rarity Filter (dataset-ranked selection).
    RarityFilter,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    debug!(verbose = cli.verbose, "logging initialized");
    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::OpenAndCollect => open_and_collect::run_scenario(),
        Command::DegradedTransport => degraded_transport::run_scenario(),
        Command::RarityFilter => rarity_filter::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> TetherResult<()> {
    open_and_collect::run_scenario()?;
    degraded_transport::run_scenario()?;
    rarity_filter::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("tether: resilient command dispatch");
    println!("Simulated World Demo");
    println!("==================================");
    println!();
    println!("Per command:");
    println!("  [1] Cooldown check; a command inside its window never leaves the process");
    println!("  [2] Encode opcode + header frames (native, primitive, or raw payloads)");
    println!("  [3] Try structured handle, direct channel, named channels, request endpoint");
    println!("  [4] Broadcast to every channel as a last resort");
    println!();
}
