//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Device node: owns the robot, the bus and one adapter per device, and
//! drives the per-step loop.

use indexmap::IndexMap;
use simlink_common::config::{AppConfig, DeviceParams};
use simlink_logging::{sl_info, sl_warn, LogContext};
use simlink_msg::TopicBus;

use crate::adapters::{DistanceSensorAdapter, DistanceSensorParams, LedAdapter, LedParams};
use crate::host::{DeviceAdapter, Host};
use crate::robot::{Robot, RobotDevice, SimClock};
use crate::Result;

/// Resolved device-to-topic binding, as reported by [`DeviceNode::bindings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub device: String,
    pub kind: &'static str,
    /// `None` when the binding is disabled.
    pub topic: Option<String>,
}

/// Outcome of one [`DeviceNode::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Steps completed so far, including this one.
    pub step: u64,
    /// Simulated time after the step, in milliseconds.
    pub time_ms: u64,
    /// Messages delivered to callbacks during this step.
    pub delivered: usize,
}

pub struct DeviceNode {
    robot: Robot,
    bus: TopicBus,
    adapters: Vec<Box<dyn DeviceAdapter>>,
}

impl DeviceNode {
    /// Build one adapter per robot device, in declaration order.
    ///
    /// `overrides` is keyed by device name; devices without an entry use
    /// adapter defaults.
    pub fn new(
        robot: Robot,
        bus: TopicBus,
        overrides: &IndexMap<String, DeviceParams>,
    ) -> Result<Self> {
        let mut node = Self {
            robot,
            bus,
            adapters: Vec::new(),
        };
        let devices: Vec<RobotDevice> = node.robot.devices().cloned().collect();
        for device in devices {
            let params = overrides.get(device.name()).cloned().unwrap_or_default();
            let adapter: Box<dyn DeviceAdapter> = match device {
                RobotDevice::Led(led) => Box::new(LedAdapter::new(
                    &node,
                    led,
                    Some(LedParams::from(&params)),
                )?),
                RobotDevice::DistanceSensor(sensor) => Box::new(DistanceSensorAdapter::new(
                    &node,
                    sensor,
                    Some(DistanceSensorParams::from(&params)),
                )?),
            };
            node.add_adapter(adapter);
        }

        sl_info!(
            context = node.log_context(),
            "device node ready with {} adapters",
            node.adapters.len()
        );
        Ok(node)
    }

    /// Build the robot described by `config` and bind its devices.
    pub fn from_config(config: &AppConfig, bus: TopicBus) -> Result<Self> {
        Self::new(Robot::from_config(&config.robot), bus, &config.devices)
    }

    /// Append an adapter. Warns when its topic is already used by another one.
    pub fn add_adapter(&mut self, adapter: Box<dyn DeviceAdapter>) {
        if let Some(topic) = adapter.topic() {
            for existing in &self.adapters {
                if existing.topic() == Some(topic) {
                    sl_warn!(
                        context = self
                            .log_context()
                            .with_device(adapter.device_name())
                            .with_topic(topic),
                        "topic already bound by device {}",
                        existing.device_name()
                    );
                }
            }
        }
        self.adapters.push(adapter);
    }

    /// Dispatch pending messages, advance time one basic step, then run
    /// every adapter's `step` hook.
    pub fn step(&mut self) -> StepReport {
        let delivered = self.bus.spin_some();
        let time_ms = self.robot.step();
        for adapter in &mut self.adapters {
            adapter.step();
        }
        StepReport {
            step: self.robot.step_count(),
            time_ms,
            delivered,
        }
    }

    /// Run `steps` steps and return the total number of delivered messages.
    pub fn run_steps(&mut self, steps: u64) -> usize {
        (0..steps).map(|_| self.step().delivered).sum()
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.adapters
            .iter()
            .map(|adapter| Binding {
                device: adapter.device_name().to_owned(),
                kind: adapter.kind(),
                topic: adapter.topic().map(str::to_owned),
            })
            .collect()
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn adapters(&self) -> &[Box<dyn DeviceAdapter>] {
        &self.adapters
    }

    pub fn step_count(&self) -> u64 {
        self.robot.step_count()
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_robot(self.robot.name())
            .with_step(self.robot.step_count())
    }
}

impl Host for DeviceNode {
    fn basic_time_step(&self) -> u32 {
        self.robot.basic_time_step()
    }

    fn clock(&self) -> SimClock {
        self.robot.clock()
    }

    fn bus(&self) -> &TopicBus {
        &self.bus
    }
}
