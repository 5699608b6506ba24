//! Time sources for the scheduler.
//!
//! Timer due times are plain milliseconds since the clock's origin. The
//! production clock follows tokio's time driver (so `start_paused` tests are
//! deterministic); [`VirtualClock`] is moved by hand.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_ms(&self) -> u64;

    /// Moves a manual clock forward to `ms`. Clocks that follow real time
    /// ignore it.
    fn advance_to(&self, _ms: u64) {}
}

/// Clock driven by tokio's timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced clock for deterministic tests and replays.
///
/// Time never moves backwards: [`VirtualClock::set`] to an earlier instant is
/// ignored.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        Self {
            now: AtomicU64::new(ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::AcqRel);
    }

    pub fn advance(&self, ms: u64) -> u64 {
        self.now.fetch_add(ms, Ordering::AcqRel) + ms
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }

    fn advance_to(&self, ms: u64) {
        self.set(ms);
    }
}
