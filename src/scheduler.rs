//! Dual-interval scheduling of sample and flush events.
//!
//! The engine ticks at a short fixed period; this scheduler decides, per
//! tick, whether a sample event and/or a flush event is due. Checks are
//! elapsed-time based, so loop jitter never causes an event to fire twice
//! for one elapsed interval.

use std::time::{Duration, Instant};

/// Events due on a single engine tick.
///
/// Both may be set on the same tick; the engine handles the sample before
/// the flush so the just-taken reading lands in the flushed window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub sample_due: bool,
    pub flush_due: bool,
}

/// Tracks two independent fixed intervals and fires each exactly once per
/// elapsed interval.
///
/// `flush_interval` is typically an integer multiple of `sample_interval`,
/// but this is not required; a non-multiple merely yields flush windows
/// with varying sample counts.
#[derive(Debug)]
pub struct Scheduler {
    sample_interval: Duration,
    flush_interval: Duration,
    last_sample_at: Instant,
    last_flush_at: Instant,
}

impl Scheduler {
    /// Create a scheduler with both intervals anchored at `start`.
    pub fn new(start: Instant, sample_interval: Duration, flush_interval: Duration) -> Self {
        Self {
            sample_interval,
            flush_interval,
            last_sample_at: start,
            last_flush_at: start,
        }
    }

    /// Report which events are due at `now`, resetting the anchor of each
    /// event that fires.
    pub fn tick(&mut self, now: Instant) -> TickEvents {
        let mut events = TickEvents::default();

        if now.duration_since(self.last_sample_at) >= self.sample_interval {
            self.last_sample_at = now;
            events.sample_due = true;
        }

        if now.duration_since(self.last_flush_at) >= self.flush_interval {
            self.last_flush_at = now;
            events.flush_due = true;
        }

        events
    }
}
