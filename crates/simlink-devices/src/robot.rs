//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! In-process robot model: a millisecond clock and a set of named devices.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use simlink_common::config::{DeviceSpec, RobotConfig};
use tracing::{debug, trace};

use crate::hardware::{DistanceSensor, Led};
use crate::{DeviceError, Result};

/// Shared simulated time in milliseconds plus the number of steps taken.
/// Clones observe the same clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    millis: Arc<AtomicU64>,
    steps: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }

    pub fn now_secs(&self) -> f64 {
        simlink_common::time::millis_to_secs(self.now_ms())
    }

    /// Steps completed so far; the first step is `1`.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Advance by `step_ms` and return the new time.
    pub fn advance(&self, step_ms: u32) -> u64 {
        self.steps.fetch_add(1, Ordering::AcqRel);
        self.millis.fetch_add(u64::from(step_ms), Ordering::AcqRel) + u64::from(step_ms)
    }
}

/// LED whose last written value can be inspected.
#[derive(Debug)]
pub struct SimLed {
    name: String,
    value: AtomicI32,
    writes: AtomicU64,
}

impl SimLed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicI32::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Last value written, `0` before the first write.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }
}

impl Led for SimLed {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, value: i32) {
        self.value.store(value, Ordering::Release);
        self.writes.fetch_add(1, Ordering::AcqRel);
        trace!(device = %self.name, value, "led set");
    }
}

#[derive(Debug, Default)]
struct SensorState {
    sampling_period: Option<u32>,
    reading: f64,
}

/// Distance sensor fed by [`SimDistanceSensor::set_reading`].
///
/// Readings are held inside `[min_range, max_range]`; a disabled sensor
/// reports `max_range`. Bounds are not checked here, so an inverted or NaN
/// range yields `max_range` instead of panicking.
#[derive(Debug)]
pub struct SimDistanceSensor {
    name: String,
    min_range: f64,
    max_range: f64,
    state: Mutex<SensorState>,
}

impl SimDistanceSensor {
    pub fn new(name: impl Into<String>, min_range: f64, max_range: f64) -> Self {
        Self {
            name: name.into(),
            min_range,
            max_range,
            state: Mutex::new(SensorState {
                sampling_period: None,
                reading: max_range,
            }),
        }
    }

    /// Place an obstacle at `distance` metres.
    pub fn set_reading(&self, distance: f64) {
        self.state.lock().reading = distance;
    }

    pub fn sampling_period(&self) -> Option<u32> {
        self.state.lock().sampling_period
    }
}

impl DistanceSensor for SimDistanceSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self, period_ms: u32) {
        self.state.lock().sampling_period = Some(period_ms);
        debug!(device = %self.name, period_ms, "distance sensor enabled");
    }

    fn disable(&self) {
        self.state.lock().sampling_period = None;
        debug!(device = %self.name, "distance sensor disabled");
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().sampling_period.is_some()
    }

    fn value(&self) -> f64 {
        let state = self.state.lock();
        match state.sampling_period {
            Some(_) => state.reading.max(self.min_range).min(self.max_range),
            None => self.max_range,
        }
    }

    fn min_range(&self) -> f64 {
        self.min_range
    }

    fn max_range(&self) -> f64 {
        self.max_range
    }
}

/// Device owned by a [`Robot`].
#[derive(Debug, Clone)]
pub enum RobotDevice {
    Led(Arc<SimLed>),
    DistanceSensor(Arc<SimDistanceSensor>),
}

impl RobotDevice {
    pub fn name(&self) -> &str {
        match self {
            RobotDevice::Led(led) => Led::name(led.as_ref()),
            RobotDevice::DistanceSensor(sensor) => DistanceSensor::name(sensor.as_ref()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RobotDevice::Led(_) => "led",
            RobotDevice::DistanceSensor(_) => "distance_sensor",
        }
    }
}

/// Simulated robot: named devices in declaration order plus a clock that
/// advances one basic step per [`Robot::step`].
#[derive(Debug)]
pub struct Robot {
    name: String,
    basic_time_step: u32,
    clock: SimClock,
    devices: IndexMap<String, RobotDevice>,
}

impl Robot {
    pub fn new(name: impl Into<String>, basic_time_step: u32) -> Self {
        Self {
            name: name.into(),
            basic_time_step,
            clock: SimClock::new(),
            devices: IndexMap::new(),
        }
    }

    /// Build a robot carrying every device in `config`.
    pub fn from_config(config: &RobotConfig) -> Self {
        let mut robot = Self::new(config.name.clone(), config.basic_time_step);
        for spec in &config.devices {
            match spec {
                DeviceSpec::Led { name } => {
                    robot.add_led(name.clone());
                }
                DeviceSpec::DistanceSensor {
                    name,
                    min_range,
                    max_range,
                } => {
                    robot.add_distance_sensor(name.clone(), *min_range, *max_range);
                }
            }
        }
        robot
    }

    /// Add an LED, replacing any device with the same name.
    pub fn add_led(&mut self, name: impl Into<String>) -> Arc<SimLed> {
        let name = name.into();
        let led = Arc::new(SimLed::new(name.clone()));
        self.devices.insert(name, RobotDevice::Led(Arc::clone(&led)));
        led
    }

    /// Add a distance sensor, replacing any device with the same name.
    pub fn add_distance_sensor(
        &mut self,
        name: impl Into<String>,
        min_range: f64,
        max_range: f64,
    ) -> Arc<SimDistanceSensor> {
        let name = name.into();
        let sensor = Arc::new(SimDistanceSensor::new(name.clone(), min_range, max_range));
        self.devices
            .insert(name, RobotDevice::DistanceSensor(Arc::clone(&sensor)));
        sensor
    }

    pub fn led(&self, name: &str) -> Result<Arc<SimLed>> {
        match self.device(name)? {
            RobotDevice::Led(led) => Ok(Arc::clone(led)),
            other => Err(DeviceError::WrongKind {
                device: name.to_owned(),
                expected: "led",
                found: other.kind(),
            }),
        }
    }

    pub fn distance_sensor(&self, name: &str) -> Result<Arc<SimDistanceSensor>> {
        match self.device(name)? {
            RobotDevice::DistanceSensor(sensor) => Ok(Arc::clone(sensor)),
            other => Err(DeviceError::WrongKind {
                device: name.to_owned(),
                expected: "distance_sensor",
                found: other.kind(),
            }),
        }
    }

    pub fn device(&self, name: &str) -> Result<&RobotDevice> {
        self.devices
            .get(name)
            .ok_or_else(|| DeviceError::UnknownDevice(name.to_owned()))
    }

    pub fn devices(&self) -> impl Iterator<Item = &RobotDevice> {
        self.devices.values()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basic_time_step(&self) -> u32 {
        self.basic_time_step
    }

    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    pub fn step_count(&self) -> u64 {
        self.clock.steps()
    }

    /// Advance simulated time by one basic step and return the new time.
    pub fn step(&mut self) -> u64 {
        self.clock.advance(self.basic_time_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_shared_between_clones() {
        let clock = SimClock::new();
        let view = clock.clone();
        assert_eq!(clock.advance(32), 32);
        assert_eq!(clock.advance(32), 64);
        assert_eq!(view.now_ms(), 64);
        assert_eq!(view.steps(), 2);
        assert!((view.now_secs() - 0.064).abs() < f64::EPSILON);
    }

    #[test]
    fn robot_step_advances_by_basic_time_step() {
        let mut robot = Robot::new("bot", 16);
        robot.step();
        assert_eq!(robot.step(), 32);
        assert_eq!(robot.step_count(), 2);
        assert_eq!(robot.clock().now_ms(), 32);
    }

    #[test]
    fn from_config_keeps_declaration_order() {
        let config = RobotConfig {
            name: "bot".into(),
            basic_time_step: 32,
            devices: vec![
                DeviceSpec::DistanceSensor {
                    name: "ds0".into(),
                    min_range: 0.0,
                    max_range: 2.0,
                },
                DeviceSpec::Led {
                    name: "led_front".into(),
                },
            ],
        };
        let robot = Robot::from_config(&config);
        let names: Vec<_> = robot.devices().map(RobotDevice::name).collect();
        assert_eq!(names, ["ds0", "led_front"]);
        assert_eq!(robot.basic_time_step(), 32);
    }

    #[test]
    fn lookup_reports_missing_and_wrong_kind() {
        let mut robot = Robot::new("bot", 32);
        robot.add_led("led0");
        assert!(matches!(robot.led("nope"), Err(DeviceError::UnknownDevice(_))));
        assert!(matches!(
            robot.distance_sensor("led0"),
            Err(DeviceError::WrongKind { found: "led", .. })
        ));
        assert!(robot.led("led0").is_ok());
    }

    #[test]
    fn sim_led_records_writes() {
        let led = SimLed::new("led0");
        assert_eq!(led.value(), 0);
        led.set(3);
        led.set(-1);
        assert_eq!(led.value(), -1);
        assert_eq!(led.write_count(), 2);
    }

    #[test]
    fn distance_sensor_clamps_and_reports_max_when_disabled() {
        let sensor = SimDistanceSensor::new("ds0", 0.1, 1.0);
        sensor.set_reading(0.5);
        assert_eq!(sensor.value(), 1.0);

        sensor.enable(64);
        assert!(sensor.is_enabled());
        assert_eq!(sensor.sampling_period(), Some(64));
        assert_eq!(sensor.value(), 0.5);
        sensor.set_reading(4.0);
        assert_eq!(sensor.value(), 1.0);
        sensor.set_reading(0.0);
        assert_eq!(sensor.value(), 0.1);

        sensor.disable();
        assert!(!sensor.is_enabled());
    }

    #[test]
    fn malformed_ranges_do_not_panic() {
        let inverted = SimDistanceSensor::new("ds0", 2.0, 1.0);
        inverted.enable(32);
        inverted.set_reading(1.5);
        assert_eq!(inverted.value(), 1.0);

        let open = SimDistanceSensor::new("ds1", 0.0, f64::NAN);
        open.enable(32);
        open.set_reading(0.5);
        assert_eq!(open.value(), 0.5);

        let sensor = SimDistanceSensor::new("ds2", 0.1, 1.0);
        sensor.enable(32);
        sensor.set_reading(f64::NAN);
        assert_eq!(sensor.value(), 1.0);
    }
}
