use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic clock used for reconnect backoff scheduling.
///
/// Only `now` is required; deadlines are compared through `until`.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Time left until `deadline`, zero once it has passed.
    fn until(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

/// Real-time clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset; advance(d) moves the offset forward.
/// Clones share the same offset, so a test can keep a handle while the
/// link manager owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let t0 = a.now();
        b.advance(Duration::from_millis(250));
        assert_eq!(a.now() - t0, Duration::from_millis(250));
    }

    #[test]
    fn until_saturates_after_deadline() {
        let c = ManualClock::new();
        let deadline = c.now() + Duration::from_secs(2);
        assert_eq!(c.until(deadline), Duration::from_secs(2));
        c.advance(Duration::from_secs(3));
        assert_eq!(c.until(deadline), Duration::ZERO);
    }
}
