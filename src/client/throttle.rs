//! Fixed-interval request throttle
//!
//! Enforces a minimum gap between consecutive outbound requests. Each caller
//! reserves the next free slot under the lock and sleeps outside it, so
//! concurrent callers are spaced out instead of all firing at once.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct Throttle {
    interval: Duration,
    last_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until this caller may send its request
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut last_slot = self.last_slot.lock().await;
            let now = Instant::now();
            let slot = match *last_slot {
                // an interval too large to represent spaces nothing out
                Some(previous) => previous
                    .checked_add(self.interval)
                    .map_or(now, |next| next.max(now)),
                None => now,
            };
            *last_slot = Some(slot);
            slot
        };

        if slot > Instant::now() {
            tracing::trace!(
                delay_ms = slot.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Throttling outbound request"
            );
            tokio::time::sleep_until(slot).await;
        }
    }
}
