//! ---
//! sl_section: "02-messaging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Typed topic bus, QoS profiles, and message schema."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::collections::VecDeque;

/// Delivery reliability offered by a publisher or requested by a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Deliver when possible; no guarantee, lowest latency.
    BestEffort,
    /// Request that every message held in history reaches the subscriber.
    Reliable,
}

/// Quality-of-service profile attached to publishers and subscriptions.
///
/// History is always keep-last: `depth` bounds the per-subscription queue and
/// the oldest pending message is discarded when a new one arrives on a full
/// queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QosProfile {
    /// Maximum number of undelivered messages retained.
    pub depth: usize,
    /// Reliability policy.
    pub reliability: Reliability,
}

impl QosProfile {
    /// Profile for high-rate sensor streams: best-effort with a shallow history.
    pub const fn sensor_data() -> Self {
        Self {
            depth: 5,
            reliability: Reliability::BestEffort,
        }
    }

    /// Replace the history depth, clamped to at least one message.
    pub const fn with_depth(mut self, depth: usize) -> Self {
        self.depth = if depth == 0 { 1 } else { depth };
        self
    }

    /// Replace the reliability policy.
    pub const fn with_reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    /// Whether a subscription with this profile accepts messages offered with `offered`.
    ///
    /// A reliable subscriber cannot be served by a best-effort publisher.
    pub fn accepts(&self, offered: Reliability) -> bool {
        !matches!(
            (self.reliability, offered),
            (Reliability::Reliable, Reliability::BestEffort)
        )
    }
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            depth: 10,
            reliability: Reliability::Reliable,
        }
    }
}

/// Bounded FIFO that discards its oldest entry on overflow.
#[derive(Debug, Clone)]
pub struct HistoryQueue<T> {
    depth: usize,
    items: VecDeque<T>,
}

impl<T> HistoryQueue<T> {
    /// Create a queue retaining at most `depth` items (minimum one).
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            items: VecDeque::with_capacity(depth),
        }
    }

    /// Append an item, returning the entry evicted to make room, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.depth {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Remove and return every queued item in arrival order.
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured maximum depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
