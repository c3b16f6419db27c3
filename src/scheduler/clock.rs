use std::sync::Mutex;
use chrono::{Duration, NaiveDateTime, Utc};

// Clock supplies the engine's notion of now; expiry checks are time-based,
// not timer-based, so every comparison goes through this seam.
pub trait Clock: Sync + Send {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

// ManualClock is settable for deterministic expiry tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use crate::scheduler::clock::{Clock, ManualClock, SystemClock};

    #[tokio::test]
    async fn test_should_read_system_clock() {
        let clock = SystemClock;
        let before = Utc::now().naive_utc();
        let now = clock.now();
        assert!(now >= before - Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_should_advance_manual_clock() {
        let start = Utc::now().naive_utc();
        let clock = ManualClock::new(start);
        assert_eq!(start, clock.now());
        clock.advance(Duration::hours(49));
        assert_eq!(start + Duration::hours(49), clock.now());
    }
}
