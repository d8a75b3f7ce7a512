//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Device adapters, one per device kind.

pub mod distance_sensor;
pub mod led;

pub use distance_sensor::{
    DistanceSensorAdapter, DistanceSensorParams, ResolvedDistanceSensorParams, RANGE_QOS,
};
pub use led::{LedAdapter, LedParams, ResolvedLedParams, LED_QUEUE_DEPTH};
