//! ---
//! sl_section: "05-daemon"
//! sl_subsection: "binary"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Wall-clock pacing for the simulation loop."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Ticks once per simulation step. A late tick delays the following ones
/// instead of bursting to catch up.
pub struct StepPacer {
    interval: tokio::time::Interval,
}

impl StepPacer {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
