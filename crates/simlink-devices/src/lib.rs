//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Simulated robot devices and the adapters that bind them to bus topics.
//!
//! A [`Robot`] owns named devices and a simulated clock. A [`DeviceNode`]
//! builds one [`DeviceAdapter`] per device and drives the per-step loop:
//! inbound messages are dispatched first, then time advances, then every
//! adapter's `step` hook runs.

pub mod adapters;
pub mod hardware;
pub mod host;
pub mod naming;
pub mod node;
pub mod robot;

use simlink_msg::MessagingError;

/// Shared result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors raised while building or binding devices.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("device {device} is a {found}, not a {expected}")]
    WrongKind {
        device: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

pub use adapters::{
    DistanceSensorAdapter, DistanceSensorParams, LedAdapter, LedParams,
    ResolvedDistanceSensorParams, ResolvedLedParams, LED_QUEUE_DEPTH, RANGE_QOS,
};
pub use hardware::{DistanceSensor, Led};
pub use host::{DeviceAdapter, Host};
pub use naming::{default_topic_name, fixed_name};
pub use node::{Binding, DeviceNode, StepReport};
pub use robot::{Robot, RobotDevice, SimClock, SimDistanceSensor, SimLed};
