// ChatLog - app/clock.rs
//
// Time source for message timestamps and change versions.
// The store reads the clock while holding its lock, so implementations must
// not block.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Deterministic clock: returns the current value, then advances it by `step`.
///
/// A step of 0 simulates many appends landing in the same millisecond.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// A clock frozen at `at`.
    pub fn fixed(at: i64) -> Self {
        Self::stepping(at, 0)
    }

    /// A clock starting at `start` that advances `step` ms per reading.
    pub fn stepping(start: i64, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }

    /// Jump to an absolute time (may go backwards).
    pub fn set(&self, at: i64) {
        self.now.store(at, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}
