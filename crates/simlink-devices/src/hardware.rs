//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Capabilities adapters require from devices. Implemented by the simulated
//! devices in [`crate::robot`] and by test doubles.

/// Device with a single integer setting, such as an LED colour index.
pub trait Led: Send + Sync {
    /// Device name as declared on the robot.
    fn name(&self) -> &str;

    /// Write a new value. No return value is consulted.
    fn set(&self, value: i32);
}

/// Ranging sensor that must be enabled before it produces readings.
pub trait DistanceSensor: Send + Sync {
    fn name(&self) -> &str;

    /// Start sampling every `period_ms` milliseconds of simulated time.
    fn enable(&self, period_ms: u32);

    fn disable(&self);

    fn is_enabled(&self) -> bool;

    /// Latest reading in metres.
    fn value(&self) -> f64;

    fn min_range(&self) -> f64;

    fn max_range(&self) -> f64;
}
