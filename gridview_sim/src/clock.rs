//! Virtual clock: playback runs take zero wall time.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use gridview_env::Clock;

/// Clock whose `sleep` just advances a counter. Deterministic and instant.
#[derive(Debug, Default)]
pub struct VirtualClock {
    elapsed: Mutex<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        *self.elapsed.lock().expect("clock mutex poisoned")
    }

    async fn sleep(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().expect("clock mutex poisoned");
        *elapsed += duration;
    }
}
