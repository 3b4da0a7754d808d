//! Test utilities for the commerce crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests
//! or when the `test-support` feature is enabled.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

pub mod memory;

pub use memory::InMemoryCommerceStore;

/// Instant used by every fixture clock: 2026-02-24T10:00:00Z.
pub fn fixture_timestamp() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 2, 24, 10, 0, 0).single() {
        Some(timestamp) => timestamp,
        None => panic!("fixture timestamp must be unambiguous"),
    }
}

/// Clock pinned to [`fixture_timestamp`] that tests may advance.
pub struct FixtureClock(Mutex<DateTime<Utc>>);

impl FixtureClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Default for FixtureClock {
    fn default() -> Self {
        Self::new(fixture_timestamp())
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Shared clock handle as injected into services.
pub fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock::default())
}
