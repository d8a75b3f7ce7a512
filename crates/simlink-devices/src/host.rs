//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---

use simlink_msg::TopicBus;

use crate::robot::SimClock;

/// Environment an adapter is built in: simulation timing and the bus it
/// creates subscriptions and publishers on.
pub trait Host {
    /// Base simulation step in milliseconds.
    fn basic_time_step(&self) -> u32;

    fn clock(&self) -> SimClock;

    fn bus(&self) -> &TopicBus;
}

/// Bridge between one device and one topic.
pub trait DeviceAdapter: Send {
    fn device_name(&self) -> &str;

    /// Device kind label, e.g. `led`.
    fn kind(&self) -> &'static str;

    /// Topic in use, `None` when the binding is disabled.
    fn topic(&self) -> Option<&str>;

    /// Called once per simulation step after inbound messages are dispatched.
    fn step(&mut self);
}
