//! Global atomic counters for compile requests.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    builds_started: AtomicU64,
    builds_failed: AtomicU64,
    sentinels_emitted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            builds_started: AtomicU64::new(0),
            builds_failed: AtomicU64::new(0),
            sentinels_emitted: AtomicU64::new(0),
        }
    }

    pub fn inc_builds_started(&self) {
        self.builds_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "builds_started", "counter incremented");
    }

    /// Count a hard-tier failure.
    pub fn inc_builds_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "builds_failed", "counter incremented");
    }

    /// Count extraction misses that were rendered as sentinels.
    pub fn add_sentinels(&self, n: u64) {
        self.sentinels_emitted.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "sentinels_emitted", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            builds_started = self.builds_started(),
            builds_failed = self.builds_failed(),
            sentinels_emitted = self.sentinels_emitted(),
        );
    }

    pub fn builds_started(&self) -> u64 {
        self.builds_started.load(Ordering::Relaxed)
    }

    pub fn builds_failed(&self) -> u64 {
        self.builds_failed.load(Ordering::Relaxed)
    }

    pub fn sentinels_emitted(&self) -> u64 {
        self.sentinels_emitted.load(Ordering::Relaxed)
    }
}
