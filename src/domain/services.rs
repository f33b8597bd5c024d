//! External services for the event source.
//!
//! Services provide external dependencies (like time) to the execution pipeline
//! without coupling it to specific implementations.

use crate::domain::types::TimestampUtc;
use std::sync::{Arc, Mutex};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> TimestampUtc;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampUtc {
        TimestampUtc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Arc<Mutex<TimestampUtc>>,
}

impl ManualClock {
    pub fn new(start: TimestampUtc) -> Self {
        Self {
            instant: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: u32) {
        if let Ok(mut instant) = self.instant.lock() {
            if let Ok(next) = instant.plus_seconds(seconds) {
                *instant = next;
            }
        }
    }

    pub fn set(&self, to: TimestampUtc) {
        if let Ok(mut instant) = self.instant.lock() {
            *instant = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampUtc {
        match self.instant.lock() {
            Ok(instant) => *instant,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
