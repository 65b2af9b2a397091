//! Process-global connect-throttle shared by every bot.
//!
//! Unlike a per-key rate limiter, there is exactly one timer here: the
//! platform's connection manager pool penalizes bursts of connects from the
//! same process regardless of which account they're for, so every bot in the
//! process waits on the same clock.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

pub struct ConnectThrottle {
    min_spacing: Duration,
    last_connect: Mutex<Option<Instant>>,
}

impl ConnectThrottle {
    pub fn new(min_spacing: Duration) -> Arc<Self> {
        Arc::new(Self {
            min_spacing,
            last_connect: Mutex::new(None),
        })
    }

    /// Block until at least `min_spacing` has elapsed since the last permit
    /// was granted, then record this moment as the new baseline.
    pub async fn wait_turn(&self) {
        let mut last = self.last_connect.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_spacing {
                tokio::time::sleep(self.min_spacing - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
