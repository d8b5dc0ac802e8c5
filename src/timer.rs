//! Fall timer: a cancellable repeating deadline driven by the caller's clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FallTimer {
    interval: Duration,
    /// `None` while cancelled.
    due: Option<Instant>,
}

impl FallTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            due: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Starts a fresh interval from `now`, discarding any partial one.
    pub fn arm(&mut self, now: Instant) {
        self.due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// Fires at most once per call; the next deadline counts from `now` so a
    /// stalled loop never produces a burst of catch-up ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timer = FallTimer::new(500 * MS);
        let t0 = Instant::now();
        assert!(!timer.is_armed());
        assert!(!timer.poll(t0 + 10_000 * MS));
    }

    #[test]
    fn test_fires_once_per_interval() {
        let mut timer = FallTimer::new(500 * MS);
        let t0 = Instant::now();
        timer.arm(t0);
        assert!(!timer.poll(t0 + 499 * MS));
        assert!(timer.poll(t0 + 500 * MS));
        assert!(!timer.poll(t0 + 500 * MS));
        assert!(!timer.poll(t0 + 999 * MS));
        assert!(timer.poll(t0 + 1000 * MS));
    }

    #[test]
    fn test_late_poll_does_not_burst() {
        let mut timer = FallTimer::new(100 * MS);
        let t0 = Instant::now();
        timer.arm(t0);
        assert!(timer.poll(t0 + 1000 * MS));
        assert!(!timer.poll(t0 + 1000 * MS));
        assert!(!timer.poll(t0 + 1099 * MS));
    }

    #[test]
    fn test_rearm_restarts_interval() {
        let mut timer = FallTimer::new(500 * MS);
        let t0 = Instant::now();
        timer.arm(t0);
        timer.cancel();
        assert!(!timer.poll(t0 + 600 * MS));
        timer.arm(t0 + 600 * MS);
        assert!(!timer.poll(t0 + 1000 * MS));
        assert!(timer.poll(t0 + 1100 * MS));
    }
}
