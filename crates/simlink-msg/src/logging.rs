//! ---
//! sl_section: "02-messaging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Typed topic bus, QoS profiles, and message schema."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use tracing::debug;

use crate::types::Message;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Message handed to the bus by a publisher.
    Outbound,
    /// Message delivered to a subscriber callback.
    Inbound,
    /// Message evicted from a full subscription queue.
    Dropped,
}

/// Emit a structured log entry for message activity.
pub fn log_message(direction: MessageDirection, message: &Message) {
    debug!(
        message_id = %message.id,
        topic = %message.topic,
        timestamp = %message.timestamp,
        kind = message.kind().as_str(),
        direction = ?direction,
        "messaging activity"
    );
}

/// Prometheus metric handles for bus activity.
#[derive(Clone)]
pub struct BusMetricsExporter {
    published: IntCounter,
    delivered: IntCounter,
    dropped: IntCounter,
    incompatible: IntCounter,
    latency: Histogram,
}

impl BusMetricsExporter {
    /// Register bus metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let published = IntCounter::with_opts(Opts::new(
            "simlink_messages_published_total",
            "Messages handed to the topic bus",
        ))?;
        let delivered = IntCounter::with_opts(Opts::new(
            "simlink_messages_delivered_total",
            "Messages delivered to subscription callbacks",
        ))?;
        let dropped = IntCounter::with_opts(Opts::new(
            "simlink_messages_dropped_total",
            "Messages evicted from full subscription queues",
        ))?;
        let incompatible = IntCounter::with_opts(Opts::new(
            "simlink_messages_incompatible_total",
            "Deliveries skipped because publisher and subscriber QoS disagree",
        ))?;
        let latency = Histogram::with_opts(HistogramOpts::new(
            "simlink_dispatch_latency_seconds",
            "Time between publish and callback delivery",
        ))?;

        registry.register(Box::new(published.clone()))?;
        registry.register(Box::new(delivered.clone()))?;
        registry.register(Box::new(dropped.clone()))?;
        registry.register(Box::new(incompatible.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            published,
            delivered,
            dropped,
            incompatible,
            latency,
        })
    }

    /// Record a published message.
    pub fn observe_published(&self) {
        self.published.inc();
    }

    /// Record a delivered message.
    pub fn observe_delivered(&self) {
        self.delivered.inc();
    }

    /// Record an evicted message.
    pub fn observe_dropped(&self) {
        self.dropped.inc();
    }

    /// Record a QoS-incompatible delivery.
    pub fn observe_incompatible(&self) {
        self.incompatible.inc();
    }

    /// Record dispatch latency.
    pub fn observe_latency(&self, duration: Duration) {
        self.latency.observe(duration.as_secs_f64());
    }
}
