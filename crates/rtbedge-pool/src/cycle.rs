//! One heartbeat/sweep pass of the membership protocol.
//!
//! The pass is a plain function of the store, the config, the node's name and
//! the current time, so the protocol can be exercised with explicit clocks.

use rtbedge_common::Result;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::store::MembershipStore;

/// What a single pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Time the pass ran at, in epoch millis
    pub now: i64,
    /// Members scored at or below this were considered dead
    pub stale_before: i64,
    /// Names returned by the stale range query
    pub stale: Vec<String>,
    /// Number of members the range delete removed
    pub removed: u64,
}

/// Runs one pass: heartbeat (workers only), then sweep stale members.
///
/// 1. A named node upserts its own record with score `now`.
/// 2. Members scored in `[0, now - 2*interval]` are listed, then removed in
///    one range delete.
///
/// Errors are returned untouched; the caller decides they are fatal.
pub async fn run_cycle(
    store: &dyn MembershipStore,
    config: &PoolConfig,
    name: Option<&str>,
    now: i64,
) -> Result<CycleReport> {
    let pool = config.pool_name.as_str();

    if let Some(name) = name {
        store.upsert_score(pool, name, now).await?;
        debug!(member = name, score = now, "heartbeat");
    }

    let stale_before = config.stale_before(now);
    let stale = store.range_by_score(pool, 0, stale_before).await?;
    let removed = store.remove_range_by_score(pool, 0, stale_before).await?;

    if removed > 0 {
        info!(
            node = name.unwrap_or("coordinator"),
            "Removed stale bidders: {:?}", stale
        );
    }

    Ok(CycleReport {
        now,
        stale_before,
        stale,
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use std::time::Duration;

    fn config() -> PoolConfig {
        PoolConfig {
            pool_name: "pool".into(),
            interval: Duration::from_millis(1000),
            pause: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_worker_heartbeat_records_now() {
        let store = InMemoryStore::new();
        let report = run_cycle(&store, &config(), Some("a"), 50_000).await.unwrap();

        assert_eq!(store.score("pool", "a").await, Some(50_000));
        assert_eq!(report.stale_before, 48_000);
        assert_eq!(report.removed, 0);
    }

    #[tokio::test]
    async fn test_coordinator_never_registers() {
        let store = InMemoryStore::new();
        run_cycle(&store, &config(), None, 50_000).await.unwrap();
        assert!(store.is_empty("pool").await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_members() {
        let store = InMemoryStore::new();
        store.upsert_score("pool", "dead", 47_999).await.unwrap();
        store.upsert_score("pool", "edge", 48_000).await.unwrap();
        store.upsert_score("pool", "alive", 48_001).await.unwrap();

        let report = run_cycle(&store, &config(), None, 50_000).await.unwrap();

        assert_eq!(report.stale, vec!["dead", "edge"]);
        assert_eq!(report.removed, 2);
        assert_eq!(store.range_by_score("pool", 0, i64::MAX).await.unwrap(), vec!["alive"]);
    }

    #[tokio::test]
    async fn test_noop_sweeps_leave_live_scores_untouched() {
        let store = InMemoryStore::new();
        store.upsert_score("pool", "a", 49_000).await.unwrap();
        store.upsert_score("pool", "b", 49_500).await.unwrap();

        for _ in 0..10 {
            let report = run_cycle(&store, &config(), None, 50_000).await.unwrap();
            assert_eq!(report.removed, 0);
        }

        assert_eq!(store.score("pool", "a").await, Some(49_000));
        assert_eq!(store.score("pool", "b").await, Some(49_500));
    }

    #[tokio::test]
    async fn test_member_heartbeating_faster_than_half_interval_survives() {
        let store = InMemoryStore::new();
        let config = config();
        let period = 400; // < interval / 2

        let mut now = 100_000;
        for _ in 0..50 {
            run_cycle(&store, &config, Some("steady"), now).await.unwrap();
            // a coordinator sweeping just before the next heartbeat
            run_cycle(&store, &config, None, now + period - 1).await.unwrap();
            now += period;
        }

        assert!(store.score("pool", "steady").await.is_some());
    }

    #[tokio::test]
    async fn test_silent_member_purged_after_two_intervals() {
        let store = InMemoryStore::new();
        let config = config();

        run_cycle(&store, &config, Some("quiet"), 100_000).await.unwrap();

        run_cycle(&store, &config, None, 101_999).await.unwrap();
        assert_eq!(store.score("pool", "quiet").await, Some(100_000));

        let report = run_cycle(&store, &config, None, 102_000).await.unwrap();
        assert_eq!(report.stale, vec!["quiet"]);
        assert!(store.is_empty("pool").await);
    }

    #[tokio::test]
    async fn test_racing_sweeps_over_same_stale_entry() {
        let store = InMemoryStore::new();
        store.upsert_score("pool", "gone", 1_000).await.unwrap();
        let config = config();

        let (first, second) = tokio::join!(
            run_cycle(&store, &config, None, 50_000),
            run_cycle(&store, &config, Some("b"), 50_000),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.removed + second.removed, 1);
        assert_eq!(store.range_by_score("pool", 0, i64::MAX).await.unwrap(), vec!["b"]);
    }
}
