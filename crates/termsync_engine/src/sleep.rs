//! Injectable waiting.

use parking_lot::Mutex;
use std::time::Duration;

/// Blocks the caller for a duration.
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps without waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates a sleeper with no recorded sleeps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Returns the sum of requested sleeps.
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
