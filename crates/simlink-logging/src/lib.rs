//! ---
//! sl_section: "03-logging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Structured logging context and event helpers."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Robot the event belongs to.
    pub robot: Option<&'a str>,
    /// Device name associated with the log event.
    pub device: Option<&'a str>,
    /// Topic the device is bound to.
    pub topic: Option<&'a str>,
    /// Simulation step counter.
    pub step: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a robot name.
    pub fn with_robot(mut self, robot: &'a str) -> Self {
        self.robot = Some(robot);
        self
    }

    /// Attach a device name.
    pub fn with_device(mut self, device: &'a str) -> Self {
        self.device = Some(device);
        self
    }

    /// Attach a topic name.
    pub fn with_topic(mut self, topic: &'a str) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Attach a step counter.
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = Some(step);
        self
    }
}

/// High-level outcome used when emitting binding lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was intentionally not performed (e.g. a disabled device).
    Skipped,
    /// The operation failed or was aborted.
    Fault,
}

impl EventOutcome {
    /// Lowercase label recorded in the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Success => "success",
            EventOutcome::Skipped => "skipped",
            EventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized binding event with an outcome.
pub fn log_binding_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: EventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let robot = ctx.robot.unwrap_or("");
    let device = ctx.device.unwrap_or("");
    let topic = ctx.topic.unwrap_or("");
    let step = ctx.step.unwrap_or_default();
    match outcome {
        EventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            robot,
            device,
            topic,
            step,
            message = %message
        ),
        EventOutcome::Skipped => tracing::info!(
            event,
            outcome = outcome.as_str(),
            robot,
            device,
            topic,
            step,
            message = %message
        ),
        EventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            robot,
            device,
            topic,
            step,
            message = %message
        ),
    }
}
