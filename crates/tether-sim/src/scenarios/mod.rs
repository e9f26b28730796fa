//! Simulated end-to-end scenarios.
//!
//! Each scenario builds a `SimGame` on a manual clock, drives a real
//! `Session` against it, and prints what the server observed. The manual
//! clock makes every poll window finish instantly.

pub mod degraded_transport;
pub mod open_and_collect;
pub mod rarity_filter;

use tether_contracts::scan::ScanResult;
use tether_core::DispatchReport;

pub(crate) fn print_report(label: &str, report: &DispatchReport) {
    println!(
        "  {:<22} tier={} channel={} encoding={:?} delivered={}",
        label,
        report.tier.as_str(),
        report.channel,
        report.encoding,
        report.delivered
    );
}

pub(crate) fn print_scan(result: &ScanResult) {
    println!("  Polls:    {}", result.ticks);
    println!("  Picked:   {}", join_or_dash(&result.picked));
    println!("  Skipped:  {}", join_or_dash(&result.skipped));
    if result.errors.is_empty() {
        println!("  Errors:   -");
    } else {
        for error in &result.errors {
            println!("  Error:    {} ({})", error.identifier, error.reason);
        }
    }
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
