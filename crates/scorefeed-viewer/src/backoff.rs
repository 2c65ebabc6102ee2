//! Reconnect policy: bounded exponential backoff with jitter.

use std::time::Duration;

/// Backoff schedule for push-channel reconnect attempts.
///
/// After `max_attempts` consecutive failures the client stops retrying the
/// push channel and falls back to polling the pull endpoint.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Base delay for the first retry.
    pub base_delay_ms: u64,
    /// Cap on the computed delay.
    pub max_delay_ms: u64,
    /// Attempts before falling back to polling.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-based): `base * 2^(attempt-1)`,
    /// capped, plus jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        let delay = delay.min(self.max_delay_ms);
        Duration::from_millis(delay + rand_jitter())
    }

    /// Whether the attempt budget is spent.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

/// Random jitter (0-500ms) to avoid synchronized reconnect storms when a
/// whole gym full of displays loses the same server.
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 500) as u64
}
