//! ---
//! sl_section: "01-core-functionality"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Shared primitives and utilities for the bridge runtime."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::time::Duration;

/// Convert simulated milliseconds into a wall-clock duration.
pub fn step_duration(step_ms: u32) -> Duration {
    Duration::from_millis(u64::from(step_ms))
}

/// Convert simulated milliseconds into seconds.
pub fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

/// Device sampling period aligned to the simulation step.
///
/// Returns the largest `basic_step * 2^k` that does not exceed
/// `publish_interval_ms`, and never less than one basic step. A zero base step
/// is treated as one millisecond.
pub fn synced_sampling_period_ms(basic_step: u32, publish_interval_ms: u32) -> u32 {
    let mut period = basic_step.max(1);
    while let Some(next) = period.checked_mul(2) {
        if next > publish_interval_ms {
            break;
        }
        period = next;
    }
    period
}

/// Whether at least `interval_ms` has passed between `last_ms` and `now_ms`.
pub fn interval_elapsed(last_ms: Option<u64>, now_ms: u64, interval_ms: u32) -> bool {
    match last_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= u64::from(interval_ms),
    }
}
