//! Minimum spacing between edit attempts on one message.

use tokio::time::{Duration, Instant};

/// Tracks the last edit attempt. An attempt counts whether or not the platform accepted it.
#[derive(Debug)]
pub struct EditThrottle {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl EditThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// True when at least `interval` has passed since the last attempt (or none was made yet).
    pub fn ready(&self) -> bool {
        match self.last_attempt {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        }
    }

    pub fn mark_attempt(&mut self) {
        self.last_attempt = Some(Instant::now());
    }
}
