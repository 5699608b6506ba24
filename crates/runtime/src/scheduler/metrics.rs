//! Scheduler counters.
use std::sync::atomic::{AtomicU64, Ordering};

/// Timer statistics tracked by the engine.
///
/// Uses atomics for lock-free access across workers.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Timers that reached a live effect
    fired: AtomicU64,

    /// Timers discarded because their effect was gone or refreshed
    stale: AtomicU64,

    /// Periodic timers queued again after a tick
    rescheduled: AtomicU64,

    /// Effects that left the list from a timer (expiry or fault)
    ended: AtomicU64,

    peak_queue_depth: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rescheduled(&self) {
        self.rescheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ended(&self) {
        self.ended.fetch_add(1, Ordering::Relaxed);
    }

    /// Tracks the deepest queue seen so far.
    pub fn observe_queue_depth(&self, depth: u64) {
        self.peak_queue_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub fn stale(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    pub fn rescheduled(&self) -> u64 {
        self.rescheduled.load(Ordering::Relaxed)
    }

    pub fn ended(&self) -> u64 {
        self.ended.load(Ordering::Relaxed)
    }

    pub fn peak_queue_depth(&self) -> u64 {
        self.peak_queue_depth.load(Ordering::Relaxed)
    }
}
