use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplier of the current time as Unix seconds, injectable so tests can
/// control the sliding window deterministically (spec §4.1: "production
/// binds it to the wall clock, tests inject a mock").
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// Production clock, backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Test clock that reports a manually-advanced timestamp.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Mutex<i64>,
}

impl MockClock {
    pub fn new(start: i64) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, t: i64) {
        *self.now.lock().expect("mock clock poisoned") = t;
    }
}

impl Clock for MockClock {
    fn now_secs(&self) -> i64 {
        *self.now.lock().expect("mock clock poisoned")
    }
}
