use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How far into the future `list_members` looks when querying scores.
///
/// Heartbeat scores are wall-clock millis of the writing host, so a small
/// amount of clock skew between hosts must not hide a live member.
pub const LIST_HORIZON: Duration = Duration::from_secs(100);

/// Membership pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Name of the score-ordered set holding the members
    pub pool_name: String,
    /// TTL window; members older than twice this are swept
    pub interval: Duration,
    /// Time between heartbeat/sweep cycles
    pub pause: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_name: "bidderspool".to_string(),
            interval: Duration::from_secs(30),
            pause: Duration::from_secs(5),
        }
    }
}

impl PoolConfig {
    /// Staleness threshold for a cycle running at `now`.
    pub fn stale_before(&self, now: i64) -> i64 {
        now - 2 * self.interval.as_millis() as i64
    }
}

/// Milliseconds since the Unix epoch.
///
/// A clock set before the epoch reads as 0, which makes every member look
/// fresh instead of making every member look stale.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.pool_name, "bidderspool");
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.pause, Duration::from_secs(5));
    }

    #[test]
    fn test_stale_before_is_two_intervals() {
        let config = PoolConfig::default();
        assert_eq!(config.stale_before(100_000), 40_000);
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_millis() > 1_577_836_800_000);
    }
}
