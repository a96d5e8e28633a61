use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Source of monotonic time for every timeout-driven component.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;
}

/// The wall-clock provider used outside tests.
#[derive(Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manual time provider for deterministic tests.
#[derive(Debug)]
pub struct ManualTimeProvider {
    instant: RwLock<Instant>,
}

impl ManualTimeProvider {
    pub fn new(start: Instant) -> Self {
        Self {
            instant: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: Instant) {
        *self.instant.write().unwrap() = instant;
    }

    pub fn advance(&self, duration: Duration) {
        *self.instant.write().unwrap() += duration;
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Instant {
        *self.instant.read().unwrap()
    }
}
