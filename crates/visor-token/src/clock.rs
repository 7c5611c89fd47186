//! # Clocks
//!
//! The codec reads time through [`Clock`] so issuance and expiry can be
//! exercised deterministically. Timestamps are whole seconds since the Unix
//! epoch, UTC.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in seconds since the Unix epoch.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in whole seconds since the epoch.
    fn now(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and by tooling that needs to reason about a credential at
/// a specific instant.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `at`.
    pub fn new(at: i64) -> Self {
        Self {
            now: AtomicI64::new(at),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: i64) {
        self.now.store(at, Ordering::SeqCst);
    }

    /// Move the clock by `secs` (negative moves it backwards).
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
