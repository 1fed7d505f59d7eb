//! Per-host request spacing.
//!
//! Each host has a "next free slot" instant. A caller reserves the slot under
//! the lock, advances it by the configured gap and sleeps until its own slot
//! outside the lock, so concurrent callers for one host are serialized while
//! different hosts never wait on each other.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct HostRateLimiter {
    min_gap: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostRateLimiter {
    #[must_use]
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a request to `host` may be sent.
    pub async fn acquire(&self, host: &str) {
        if self.min_gap.is_zero() {
            return;
        }
        let slot = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots
                .get(host)
                .copied()
                .filter(|reserved| *reserved > now)
                .unwrap_or(now);
            slots.insert(host.to_owned(), slot + self.min_gap);
            slot
        };
        if slot > Instant::now() {
            let wait = slot.saturating_duration_since(Instant::now());
            tracing::debug!(host, wait = ?wait, "rate limit: waiting for host slot");
            tokio::time::sleep_until(slot).await;
        }
    }
}
