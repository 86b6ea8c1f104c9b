//! Fixed-interval repetition of the billing check

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::info;

use super::cycle::CheckCycle;

/// Upper bound on a single sleep. The scheduler wakes at least this often,
/// so shutdown (and a due check) is noticed within about a minute.
const POLL_GRANULARITY: Duration = Duration::from_secs(60);

/// Repeats a [`CheckCycle`] forever at a fixed interval
pub struct Scheduler {
    cycle: CheckCycle,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler running `cycle` every `interval`
    pub fn new(cycle: CheckCycle, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Run forever: one check immediately, then one per interval. The cycle
    /// is awaited inline, so checks are serialized; an overrunning check
    /// delays the next one instead of overlapping it. The next deadline is
    /// measured from cycle start.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "scheduler started; first check runs now");

        loop {
            let started = Instant::now();
            self.cycle.run_once().await;

            let next_due = started + self.interval;
            loop {
                let now = Instant::now();
                if now >= next_due {
                    break;
                }
                sleep(POLL_GRANULARITY.min(next_due - now)).await;
            }
        }
    }
}
