use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time and blocking sleep.
///
/// Every delay in the agent (camera warm-up, actuator dwell, cycle interval)
/// goes through a clock so the loop's timing can be checked without waiting.
pub trait Clock {
    /// Time since the clock's origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<T: Clock + ?Sized> Clock for Rc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock backed by `Instant` and `thread::sleep`.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Virtual clock: `sleep` advances time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    slept: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without counting it as sleep, e.g. simulated work.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Total time spent in `sleep`.
    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.slept.set(self.slept.get() + duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_separates_work_from_sleep() {
        let clock = Rc::new(ManualClock::new());
        let shared = clock.clone();
        shared.advance(Duration::from_secs(5));
        shared.sleep(Duration::from_secs(60));
        assert_eq!(clock.now(), Duration::from_secs(65));
        assert_eq!(clock.slept(), Duration::from_secs(60));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        clock.sleep(Duration::from_millis(1));
        assert!(clock.now() > a);
    }
}
