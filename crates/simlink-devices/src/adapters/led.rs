//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! LED binding: subscribes to an `Int32` topic and writes every delivered
//! value straight into the device.

use std::sync::Arc;

use simlink_common::config::DeviceParams;
use simlink_logging::{log_binding_event, EventOutcome, LogContext};
use simlink_msg::{Int32, QosProfile, Subscription};

use crate::hardware::Led;
use crate::host::{DeviceAdapter, Host};
use crate::naming::default_topic_name;
use crate::Result;

/// Pending messages kept per LED subscription before the oldest is dropped.
pub const LED_QUEUE_DEPTH: usize = 10;

/// Optional LED binding settings. Unset fields are derived at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedParams {
    /// Milliseconds; defaults to the host's basic time step.
    pub update_interval: Option<u32>,
    pub topic_name: Option<String>,
    /// Accepted for parity with publishing adapters; an LED only consumes.
    pub always_publish: bool,
    /// Skip the subscription entirely.
    pub disable: bool,
}

impl From<&DeviceParams> for LedParams {
    fn from(params: &DeviceParams) -> Self {
        Self {
            update_interval: params.update_interval,
            topic_name: params.topic_name.clone(),
            always_publish: params.always_publish,
            disable: !params.enabled,
        }
    }
}

/// LED settings after defaults are applied. Fixed for the adapter's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLedParams {
    pub update_interval: u32,
    pub topic_name: String,
    pub always_publish: bool,
    pub disable: bool,
}

impl ResolvedLedParams {
    fn resolve(host: &dyn Host, device_name: &str, params: LedParams) -> Self {
        Self {
            update_interval: params
                .update_interval
                .unwrap_or_else(|| host.basic_time_step()),
            topic_name: params
                .topic_name
                .unwrap_or_else(|| default_topic_name(device_name)),
            always_publish: params.always_publish,
            disable: params.disable,
        }
    }
}

/// Binds one LED to one `Int32` topic.
///
/// Values are forwarded verbatim; there is no range check and no
/// acknowledgement. Dropping the adapter drops the subscription, so no
/// callback fires into a torn-down binding.
pub struct LedAdapter {
    device: Arc<dyn Led>,
    params: ResolvedLedParams,
    subscription: Option<Subscription>,
}

impl LedAdapter {
    pub fn new(host: &dyn Host, device: Arc<dyn Led>, params: Option<LedParams>) -> Result<Self> {
        let params = ResolvedLedParams::resolve(host, device.name(), params.unwrap_or_default());
        let context = LogContext::new()
            .with_device(device.name())
            .with_topic(&params.topic_name)
            .with_step(host.clock().steps());

        if params.disable {
            log_binding_event(
                Some(&context),
                "led.bind",
                "binding disabled; no subscription created",
                EventOutcome::Skipped,
            );
            return Ok(Self {
                device,
                params,
                subscription: None,
            });
        }

        let sink = Arc::clone(&device);
        let subscription = host.bus().subscribe(
            &params.topic_name,
            QosProfile::sensor_data().with_depth(LED_QUEUE_DEPTH),
            move |msg: Int32| sink.set(msg.data),
        );
        let subscription = match subscription {
            Ok(subscription) => subscription,
            Err(err) => {
                log_binding_event(
                    Some(&context),
                    "led.bind",
                    &err.to_string(),
                    EventOutcome::Fault,
                );
                return Err(err.into());
            }
        };
        log_binding_event(
            Some(&context),
            "led.bind",
            "subscribed",
            EventOutcome::Success,
        );

        Ok(Self {
            device,
            params,
            subscription: Some(subscription),
        })
    }

    pub fn params(&self) -> &ResolvedLedParams {
        &self.params
    }

    /// Whether a subscription is live.
    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }
}

impl std::fmt::Debug for LedAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedAdapter")
            .field("device", &self.device.name())
            .field("params", &self.params)
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl DeviceAdapter for LedAdapter {
    fn device_name(&self) -> &str {
        self.device.name()
    }

    fn kind(&self) -> &'static str {
        "led"
    }

    fn topic(&self) -> Option<&str> {
        self.subscription.as_ref().map(|_| self.params.topic_name.as_str())
    }

    fn step(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{SimClock, SimLed};
    use simlink_msg::{MessagingError, StringMsg, TopicBus};

    struct TestHost {
        bus: TopicBus,
        step: u32,
    }

    impl Host for TestHost {
        fn basic_time_step(&self) -> u32 {
            self.step
        }

        fn clock(&self) -> SimClock {
            SimClock::new()
        }

        fn bus(&self) -> &TopicBus {
            &self.bus
        }
    }

    fn host(step: u32) -> TestHost {
        TestHost {
            bus: TopicBus::new(),
            step,
        }
    }

    #[test]
    fn defaults_come_from_host_and_device() {
        let host = host(32);
        let led = Arc::new(SimLed::new("led_front"));
        let adapter = LedAdapter::new(&host, led, None).unwrap();
        assert_eq!(adapter.params().update_interval, 32);
        assert_eq!(adapter.params().topic_name, "/led_front");
        assert!(adapter.is_bound());
        assert_eq!(host.bus.subscription_count("/led_front"), 1);
    }

    #[test]
    fn device_params_map_enabled_to_disable() {
        let params = DeviceParams {
            enabled: false,
            topic_name: Some("/x".into()),
            update_interval: Some(5),
            always_publish: true,
            frame_name: None,
        };
        let led = LedParams::from(&params);
        assert!(led.disable);
        assert!(led.always_publish);
        assert_eq!(led.topic_name.as_deref(), Some("/x"));
        assert_eq!(led.update_interval, Some(5));
    }

    #[test]
    fn kind_conflict_surfaces_as_error() {
        let host = host(32);
        let _other = host
            .bus
            .subscribe("/led0", QosProfile::default(), |_: StringMsg| {})
            .unwrap();
        let err = LedAdapter::new(&host, Arc::new(SimLed::new("led0")), None).unwrap_err();
        assert!(matches!(
            err,
            crate::DeviceError::Messaging(MessagingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn step_is_a_no_op() {
        let host = host(16);
        let led = Arc::new(SimLed::new("led0"));
        let mut adapter = LedAdapter::new(&host, led.clone(), None).unwrap();
        for _ in 0..5 {
            adapter.step();
        }
        assert_eq!(led.write_count(), 0);
        assert_eq!(adapter.topic(), Some("/led0"));
        assert_eq!(adapter.kind(), "led");
    }
}
