//! Batch timing and the statistics derived from it.
//!
//! Timing is always taken around the whole batch: the start instant before the
//! first worker is spawned, the end instant after the last one has joined.
//! Per-worker clocks are never summed or averaged.
use std::time::{Duration, Instant};

/// Start and end instants of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub start: Instant,
    pub end: Instant,
}

impl Timing {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            end: now,
        }
    }

    pub fn stop(mut self) -> Self {
        self.end = Instant::now();
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

/// `achieved / elapsed` in operations per second.
///
/// A zero elapsed time gives `f64::INFINITY` when work was done and `0.0`
/// when none was.
pub fn ops_per_second(achieved: u64, elapsed: Duration) -> f64 {
    if elapsed.is_zero() {
        return if achieved == 0 { 0.0 } else { f64::INFINITY };
    }
    achieved as f64 / elapsed.as_secs_f64()
}

/// `elapsed / achieved`, or zero when nothing was achieved.
pub fn average_latency(elapsed: Duration, achieved: u64) -> Duration {
    if achieved == 0 {
        return Duration::ZERO;
    }
    let nanos = elapsed.as_nanos() / u128::from(achieved);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
