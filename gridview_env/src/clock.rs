//! Time abstraction for the playback driver.
//!
//! Production uses [`TokioClock`]; the sim harness substitutes a virtual
//! clock so playback runs deterministically and instantly.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Monotonic time plus cooperative sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since clock creation.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by Tokio timers.
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokio_clock_advances() {
        let clock = TokioClock::new();
        let t1 = clock.now();
        clock.sleep(Duration::from_millis(10)).await;
        let t2 = clock.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }
}
