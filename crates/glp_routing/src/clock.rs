use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;

/// Source of "current time" for temporal obstacles and order urgency.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock driven by the caller, used for simulations and tests.
pub struct SimulatedClock {
    now: RwLock<Timestamp>,
}

impl SimulatedClock {
    pub fn new(start: Timestamp) -> Self {
        SimulatedClock {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.write() = now;
    }

    pub fn advance(&self, duration: SignedDuration) {
        let mut now = self.now.write();
        *now = now.saturating_add(duration).unwrap_or(*now);
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_clock_advance() {
        let start: Timestamp = "2025-06-10T08:00:00Z".parse().unwrap();
        let clock = SimulatedClock::new(start);
        clock.advance(SignedDuration::from_mins(90));

        let expected: Timestamp = "2025-06-10T09:30:00Z".parse().unwrap();
        assert_eq!(clock.now(), expected);
    }
}
