//! ---
//! sl_section: "02-messaging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Typed topic bus, QoS profiles, and message schema."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message kinds a topic can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Signed 32-bit integer.
    Int32,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Boolean flag.
    Bool,
    /// UTF-8 string.
    String,
    /// Range sample from a distance sensor.
    Range,
}

impl MessageKind {
    /// Stable lowercase name, matching the serialized `kind` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Int32 => "int32",
            MessageKind::Float32 => "float32",
            MessageKind::Float64 => "float64",
            MessageKind::Bool => "bool",
            MessageKind::String => "string",
            MessageKind::Range => "range",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Int32 {
    /// Payload value.
    pub data: i32,
}

/// Single 32-bit float.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Float32 {
    /// Payload value.
    pub data: f32,
}

/// Single 64-bit float.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Float64 {
    /// Payload value.
    pub data: f64,
}

/// Single boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bool {
    /// Payload value.
    pub data: bool,
}

/// Single string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StringMsg {
    /// Payload value.
    pub data: String,
}

/// Distance reading with the sensor's measurable bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    /// Frame the reading is expressed in.
    #[serde(default)]
    pub frame_id: String,
    /// Measured distance in metres.
    pub range: f64,
    /// Smallest measurable distance.
    pub min_range: f64,
    /// Largest measurable distance.
    pub max_range: f64,
}

/// Payload carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MessagePayload {
    /// See [`Int32`].
    Int32(Int32),
    /// See [`Float32`].
    Float32(Float32),
    /// See [`Float64`].
    Float64(Float64),
    /// See [`Bool`].
    Bool(Bool),
    /// See [`StringMsg`].
    String(StringMsg),
    /// See [`Range`].
    Range(Range),
}

impl MessagePayload {
    /// Kind of the carried message.
    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Int32(_) => MessageKind::Int32,
            MessagePayload::Float32(_) => MessageKind::Float32,
            MessagePayload::Float64(_) => MessageKind::Float64,
            MessagePayload::Bool(_) => MessageKind::Bool,
            MessagePayload::String(_) => MessageKind::String,
            MessagePayload::Range(_) => MessageKind::Range,
        }
    }
}

/// Envelope recorded for every publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for tracing.
    pub id: Uuid,
    /// Topic the message was published on.
    pub topic: String,
    /// Timestamp when the message was created.
    pub timestamp: DateTime<Utc>,
    /// Actual payload carried by the message.
    pub payload: MessagePayload,
}

impl Message {
    /// Construct a new message envelope around the provided payload.
    pub fn new(topic: impl Into<String>, payload: MessagePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Kind of the carried payload.
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}

/// Typed message that can travel on a topic.
pub trait TopicMessage: Clone + Send + 'static {
    /// Kind a topic must carry to accept this type.
    const KIND: MessageKind;

    /// Wrap the message into a bus payload.
    fn into_payload(self) -> MessagePayload;

    /// Extract the message from a payload of the matching kind.
    fn from_payload(payload: &MessagePayload) -> Option<Self>;
}

macro_rules! topic_message {
    ($ty:ident, $variant:ident) => {
        impl TopicMessage for $ty {
            const KIND: MessageKind = MessageKind::$variant;

            fn into_payload(self) -> MessagePayload {
                MessagePayload::$variant(self)
            }

            fn from_payload(payload: &MessagePayload) -> Option<Self> {
                match payload {
                    MessagePayload::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

topic_message!(Int32, Int32);
topic_message!(Float32, Float32);
topic_message!(Float64, Float64);
topic_message!(Bool, Bool);
topic_message!(StringMsg, String);
topic_message!(Range, Range);
