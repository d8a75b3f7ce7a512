//! ---
//! sl_section: "02-messaging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Typed topic bus, QoS profiles, and message schema."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! In-process publish/subscribe transport used to bind simulated devices to
//! named, typed topics.
#![warn(missing_docs)]

pub mod bus;
pub mod logging;
pub mod qos;
pub mod sim_hooks;
pub mod types;

/// Shared result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors raised by the topic bus.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Topic names must be non-empty.
    #[error("invalid topic name: {0:?}")]
    InvalidTopic(String),
    /// A topic is bound to exactly one message kind.
    #[error("topic {topic} carries {expected} messages, not {found}")]
    TypeMismatch {
        /// Topic that rejected the operation.
        topic: String,
        /// Kind the topic was created with.
        expected: types::MessageKind,
        /// Kind supplied by the caller.
        found: types::MessageKind,
    },
    /// Wrapper for IO errors encountered during replay.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub use bus::{BusMetrics, Publisher, Subscription, TopicBus, TopicInfo};
pub use logging::{log_message, BusMetricsExporter, MessageDirection};
pub use qos::{HistoryQueue, QosProfile, Reliability};
pub use sim_hooks::{replay_from_file, replay_until_cancelled};
pub use types::{
    Bool, Float32, Float64, Int32, Message, MessageKind, MessagePayload, Range, StringMsg,
    TopicMessage,
};
