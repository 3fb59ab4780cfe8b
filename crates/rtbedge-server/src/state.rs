// Copyright 2025 rtbedge Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide serving state
//!
//! The knobs every dispatch reads (throttle, stop flag) and the counters it
//! bumps. One instance lives for the life of the process and is shared by
//! `Arc` between the dispatcher and the admin routes.

use rand::Rng;
use rtbedge_common::{Result, RtbError, StatusSnapshot};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

/// Throttle value meaning "admit everything".
pub const NO_THROTTLE: u8 = 100;

/// Probabilistic admission gate.
///
/// `percent == 100` always admits and never touches `rng`. Otherwise a value
/// is drawn uniformly from `0..=100` (101 outcomes) and the opportunity is
/// admitted iff the draw is strictly below `percent`.
pub fn admit<R: Rng + ?Sized>(percent: u8, rng: &mut R) -> bool {
    if percent >= NO_THROTTLE {
        return true;
    }
    rng.gen_range(0..=100u8) < percent
}

/// Mutable serving knobs and cumulative counters.
#[derive(Debug)]
pub struct ServingState {
    throttle_percent: AtomicU8,
    stopped: AtomicBool,
    bid_count: AtomicU64,
    no_bid_count: AtomicU64,
    started_at: Instant,
}

impl Default for ServingState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServingState {
    /// Unthrottled, running, zero counters.
    pub fn new() -> Self {
        Self {
            throttle_percent: AtomicU8::new(NO_THROTTLE),
            stopped: AtomicBool::new(false),
            bid_count: AtomicU64::new(0),
            no_bid_count: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn throttle_percent(&self) -> u8 {
        self.throttle_percent.load(Ordering::Relaxed)
    }

    /// Sets the admitted share of traffic, in percent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidThrottle` for values above 100; the current value is
    /// left untouched.
    pub fn set_throttle(&self, percent: u8) -> Result<()> {
        if percent > NO_THROTTLE {
            return Err(RtbError::InvalidThrottle(percent));
        }
        self.throttle_percent.store(percent, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::Relaxed);
    }

    /// Runs the throttle gate against the current setting.
    pub fn admit(&self) -> bool {
        admit(self.throttle_percent(), &mut rand::thread_rng())
    }

    pub fn record_bid(&self) {
        self.bid_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_bid(&self) {
        self.no_bid_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bid_count(&self) -> u64 {
        self.bid_count.load(Ordering::Relaxed)
    }

    pub fn no_bid_count(&self) -> u64 {
        self.no_bid_count.load(Ordering::Relaxed)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Snapshot for the ops surface. `campaigns` comes from the selector.
    pub fn snapshot(&self, campaigns: Vec<String>) -> StatusSnapshot {
        StatusSnapshot {
            throttle_percent: self.throttle_percent(),
            stopped: self.is_stopped(),
            bid_count: self.bid_count(),
            no_bid_count: self.no_bid_count(),
            campaigns,
            uptime_ms: self.uptime_ms(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::sync::Arc;

    /// Rng that fails the test if it is ever consulted.
    struct UntouchableRng;

    impl RngCore for UntouchableRng {
        fn next_u32(&mut self) -> u32 {
            panic!("rng consulted")
        }

        fn next_u64(&mut self) -> u64 {
            panic!("rng consulted")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("rng consulted")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            panic!("rng consulted")
        }
    }

    #[test]
    fn test_full_throttle_never_draws() {
        let mut rng = UntouchableRng;
        for _ in 0..100 {
            assert!(admit(100, &mut rng));
        }
    }

    #[test]
    fn test_zero_throttle_never_admits() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..10_000).all(|_| !admit(0, &mut rng)));
    }

    #[test]
    fn test_throttle_rate_uses_inclusive_draw() {
        // 50 admitting outcomes out of 101
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 101_000;
        let admitted = (0..trials).filter(|_| admit(50, &mut rng)).count();
        let rate = admitted as f64 / trials as f64;
        assert!((rate - 50.0 / 101.0).abs() < 0.01, "rate was {}", rate);
    }

    #[test]
    fn test_set_throttle_rejects_out_of_range() {
        let state = ServingState::new();
        state.set_throttle(30).unwrap();

        assert!(matches!(state.set_throttle(101), Err(RtbError::InvalidThrottle(101))));
        assert_eq!(state.throttle_percent(), 30);
    }

    #[test]
    fn test_defaults() {
        let state = ServingState::default();
        assert_eq!(state.throttle_percent(), 100);
        assert!(!state.is_stopped());
        assert_eq!(state.bid_count(), 0);
        assert_eq!(state.no_bid_count(), 0);
        assert!(state.admit());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let state = ServingState::new();
        state.set_stopped(true);
        state.set_throttle(10).unwrap();
        state.record_bid();
        state.record_no_bid();
        state.record_no_bid();

        let snapshot = state.snapshot(vec!["c1".into()]);
        assert!(snapshot.stopped);
        assert_eq!(snapshot.throttle_percent, 10);
        assert_eq!(snapshot.bid_count, 1);
        assert_eq!(snapshot.no_bid_count, 2);
        assert_eq!(snapshot.campaigns, vec!["c1"]);
        assert_eq!(snapshot.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_counters_are_not_lost_under_contention() {
        let state = Arc::new(ServingState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        state.record_bid();
                        state.record_no_bid();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.bid_count(), 8000);
        assert_eq!(state.no_bid_count(), 8000);
    }
}
