//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Distance sensor binding: publishes `Range` samples while someone listens.

use std::sync::Arc;

use simlink_common::config::DeviceParams;
use simlink_common::time::{interval_elapsed, synced_sampling_period_ms};
use simlink_logging::{log_binding_event, sl_debug, sl_warn, EventOutcome, LogContext};
use simlink_msg::{Publisher, QosProfile, Range, Reliability};

use crate::hardware::DistanceSensor;
use crate::host::{DeviceAdapter, Host};
use crate::naming::{default_topic_name, fixed_name};
use crate::robot::SimClock;
use crate::Result;

/// Range samples keep the shallow sensor-data history but are offered
/// reliably, so default (reliable) subscribers are served too.
pub const RANGE_QOS: QosProfile = QosProfile::sensor_data().with_reliability(Reliability::Reliable);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistanceSensorParams {
    pub update_interval: Option<u32>,
    pub topic_name: Option<String>,
    /// Keep sampling and publishing with no subscribers.
    pub always_publish: bool,
    pub disable: bool,
    /// `frame_id` stamped on every sample; defaults to the fixed device name.
    pub frame_name: Option<String>,
}

impl From<&DeviceParams> for DistanceSensorParams {
    fn from(params: &DeviceParams) -> Self {
        Self {
            update_interval: params.update_interval,
            topic_name: params.topic_name.clone(),
            always_publish: params.always_publish,
            disable: !params.enabled,
            frame_name: params.frame_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDistanceSensorParams {
    pub update_interval: u32,
    pub topic_name: String,
    pub always_publish: bool,
    pub disable: bool,
    pub frame_name: String,
    /// Device sampling period aligned to the basic time step.
    pub sampling_period: u32,
}

/// Publishes one `Range` per `update_interval` while the topic has
/// subscribers or `always_publish` is set. The sensor is enabled only while
/// publishing.
pub struct DistanceSensorAdapter {
    device: Arc<dyn DistanceSensor>,
    clock: SimClock,
    params: ResolvedDistanceSensorParams,
    publisher: Option<Publisher<Range>>,
    last_update: Option<u64>,
    enabled: bool,
}

impl DistanceSensorAdapter {
    pub fn new(
        host: &dyn Host,
        device: Arc<dyn DistanceSensor>,
        params: Option<DistanceSensorParams>,
    ) -> Result<Self> {
        let params = params.unwrap_or_default();
        let update_interval = params
            .update_interval
            .unwrap_or_else(|| host.basic_time_step());
        let params = ResolvedDistanceSensorParams {
            update_interval,
            topic_name: params
                .topic_name
                .unwrap_or_else(|| default_topic_name(device.name())),
            always_publish: params.always_publish,
            disable: params.disable,
            frame_name: params
                .frame_name
                .unwrap_or_else(|| fixed_name(device.name())),
            sampling_period: synced_sampling_period_ms(host.basic_time_step(), update_interval),
        };
        let context = LogContext::new()
            .with_device(device.name())
            .with_topic(&params.topic_name)
            .with_step(host.clock().steps());

        let publisher = if params.disable {
            log_binding_event(
                Some(&context),
                "distance_sensor.bind",
                "binding disabled; no publisher created",
                EventOutcome::Skipped,
            );
            None
        } else {
            match host
                .bus()
                .create_publisher::<Range>(&params.topic_name, RANGE_QOS)
            {
                Ok(publisher) => {
                    log_binding_event(
                        Some(&context),
                        "distance_sensor.bind",
                        "publisher created",
                        EventOutcome::Success,
                    );
                    Some(publisher)
                }
                Err(err) => {
                    log_binding_event(
                        Some(&context),
                        "distance_sensor.bind",
                        &err.to_string(),
                        EventOutcome::Fault,
                    );
                    return Err(err.into());
                }
            }
        };

        Ok(Self {
            device,
            clock: host.clock(),
            params,
            publisher,
            last_update: None,
            enabled: false,
        })
    }

    pub fn params(&self) -> &ResolvedDistanceSensorParams {
        &self.params
    }

    /// Simulated time of the last publish decision, if any.
    pub fn last_update(&self) -> Option<u64> {
        self.last_update
    }

    fn log_context(&self) -> LogContext<'_> {
        let context = LogContext::new()
            .with_device(self.device.name())
            .with_step(self.clock.steps());
        match self.topic() {
            Some(topic) => context.with_topic(topic),
            None => context,
        }
    }
}

impl std::fmt::Debug for DistanceSensorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceSensorAdapter")
            .field("device", &self.device.name())
            .field("params", &self.params)
            .field("last_update", &self.last_update)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl DeviceAdapter for DistanceSensorAdapter {
    fn device_name(&self) -> &str {
        self.device.name()
    }

    fn kind(&self) -> &'static str {
        "distance_sensor"
    }

    fn topic(&self) -> Option<&str> {
        self.publisher.as_ref().map(Publisher::topic)
    }

    fn step(&mut self) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let now = self.clock.now_ms();
        if !interval_elapsed(self.last_update, now, self.params.update_interval) {
            return;
        }
        self.last_update = Some(now);

        let wanted = self.params.always_publish || publisher.subscription_count() > 0;
        let toggled = wanted != self.enabled;
        if toggled {
            if wanted {
                self.device.enable(self.params.sampling_period);
            } else {
                self.device.disable();
            }
            self.enabled = wanted;
        }
        let context = self.log_context();
        if toggled {
            sl_debug!(context = context, "sensor {}", if wanted { "enabled" } else { "disabled" });
        }
        if !wanted {
            return;
        }

        let sample = Range {
            frame_id: self.params.frame_name.clone(),
            range: self.device.value(),
            min_range: self.device.min_range(),
            max_range: self.device.max_range(),
        };
        if let Err(err) = publisher.publish(sample) {
            sl_warn!(context = context, "range publish failed: {err}");
        }
    }
}
