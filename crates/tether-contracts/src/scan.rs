//! Scan results returned by the pickup scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A per-candidate dispatch failure. Never aborts the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    pub identifier: String,
    pub reason: String,
}

/// The outcome of one bounded polling pass. Built fresh per scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Identifiers picked up, in dispatch order.
    pub picked: Vec<String>,
    /// Identifiers the policy declined, each listed once.
    pub skipped: Vec<String>,
    pub errors: Vec<ScanError>,
    /// Number of candidate passes performed.
    pub ticks: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self {
            picked: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            ticks: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_picked(&self, identifier: &str) -> bool {
        self.picked.iter().any(|p| p == identifier)
    }

    /// Record a successful pickup. A name picked after an earlier skip is no
    /// longer listed as skipped.
    pub fn record_picked(&mut self, identifier: &str) {
        self.skipped.retain(|s| s != identifier);
        self.picked.push(identifier.to_string());
    }

    /// Record a policy rejection. Each identifier is listed at most once.
    pub fn record_skipped(&mut self, identifier: &str) {
        if !self.skipped.iter().any(|s| s == identifier) {
            self.skipped.push(identifier.to_string());
        }
    }

    /// Stamp the completion time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_error(&mut self, identifier: &str, reason: impl Into<String>) {
        self.errors.push(ScanError {
            identifier: identifier.to_string(),
            reason: reason.into(),
        });
    }
}

impl Default for ScanResult {
    fn default() -> Self {
        Self::new()
    }
}
