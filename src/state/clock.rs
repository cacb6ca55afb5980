//! Time source for phase deadlines and answer timestamps.

use tokio::time::Instant;

use crate::state::game::Millis;

/// Millisecond clock read by the session runners and the lobby.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Millis;
}

/// Clock backed by tokio's monotonic time, so paused-time tests drive it too.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Convert a clock reading back into a tokio instant, for `sleep_until`.
    pub fn instant_at(&self, at: Millis) -> Instant {
        self.origin + std::time::Duration::from_millis(at)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_tokio_time() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.now(), 0);

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now(), 1_500);
        assert_eq!(clock.instant_at(1_500), Instant::now());
    }
}
