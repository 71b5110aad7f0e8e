//! Tick scheduling
//!
//! The host owns the timer loop. A [`TickScheduler`] decides how long to wait
//! between ticks; the monitor itself never sleeps.

use std::time::{Duration, Instant};

pub trait TickScheduler {
    /// Block until the next tick boundary
    fn wait_for_next_tick(&mut self);
}

/// Fixed-interval wall-time scheduler.
///
/// Boundaries are anchored to the first wait, so time spent inside a tick is
/// subtracted from the following sleep. A tick that overruns its slot starts
/// the next one immediately.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    interval: Duration,
    next_boundary: Option<Instant>,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_boundary: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl TickScheduler for IntervalScheduler {
    fn wait_for_next_tick(&mut self) {
        let now = Instant::now();
        let boundary = self.next_boundary.unwrap_or(now + self.interval);
        if boundary > now {
            std::thread::sleep(boundary - now);
            self.next_boundary = Some(boundary + self.interval);
        } else {
            self.next_boundary = Some(now + self.interval);
        }
    }
}

/// Scheduler that never waits; counts how often it was asked
#[derive(Debug, Clone, Default)]
pub struct ImmediateScheduler {
    pub waits: u64,
}

impl TickScheduler for ImmediateScheduler {
    fn wait_for_next_tick(&mut self) {
        self.waits += 1;
    }
}
