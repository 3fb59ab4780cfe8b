//! Status snapshot exposed to external monitoring.

use serde::{Deserialize, Serialize};

/// Point-in-time view of a bidder's serving knobs and counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub throttle_percent: u8,
    pub stopped: bool,
    pub bid_count: u64,
    pub no_bid_count: u64,
    pub campaigns: Vec<String>,
    pub uptime_ms: u64,
    pub version: String,
}
