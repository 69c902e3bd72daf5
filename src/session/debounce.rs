use std::time::{Duration, Instant};

/// Single shared debounce timer.
///
/// Every trigger replaces the pending deadline, so at most one flush is ever
/// scheduled. The owner's event loop asks for the deadline and reports time
/// passing; nothing here sleeps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and start a new quiet period at `now`.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once when the quiet period has elapsed; the deadline is consumed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(2000);

    #[test]
    fn test_not_due_before_interval() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(INTERVAL);
        debouncer.trigger(start);

        assert!(!debouncer.take_due(start + Duration::from_millis(1999)));
        assert_eq!(debouncer.deadline(), Some(start + INTERVAL));
        assert!(debouncer.take_due(start + INTERVAL));
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.take_due(start + INTERVAL * 2));
    }

    #[test]
    fn test_retrigger_pushes_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(INTERVAL);
        debouncer.trigger(start);
        debouncer.trigger(start + Duration::from_millis(1500));

        assert!(!debouncer.take_due(start + INTERVAL));
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(3500))
        );
        assert!(debouncer.take_due(start + Duration::from_millis(3500)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(INTERVAL);
        debouncer.trigger(start);
        debouncer.cancel();
        assert!(!debouncer.take_due(start + INTERVAL));
    }
}
