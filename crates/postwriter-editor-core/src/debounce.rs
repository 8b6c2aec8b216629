//! Trailing-edge debounce for preview renders.

use web_time::{Duration, Instant};

/// Holds at most one pending deadline. Each `schedule` supersedes the last.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Push the deadline out to `now + delay`.
    pub fn schedule(&mut self, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per schedule, when `now` has reached the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_quiet_period() {
        let mut d = Debouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        d.schedule(t0);
        assert!(!d.fire_if_due(t0 + Duration::from_millis(199)));
        assert!(d.fire_if_due(t0 + Duration::from_millis(200)));
        assert!(!d.fire_if_due(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn reschedule_supersedes_pending() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.schedule(t0);
        d.schedule(t0 + Duration::from_millis(80));
        assert!(!d.fire_if_due(t0 + Duration::from_millis(120)));
        assert!(d.fire_if_due(t0 + Duration::from_millis(180)));
    }

    #[test]
    fn cancel_clears_deadline() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        d.schedule(t0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.fire_if_due(t0 + Duration::from_secs(1)));
    }
}
