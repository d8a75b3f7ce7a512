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
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::logging::{log_message, BusMetricsExporter, MessageDirection};
use crate::qos::{HistoryQueue, QosProfile, Reliability};
use crate::types::{Message, MessageKind, MessagePayload, TopicMessage};
use crate::{MessagingError, Result};

/// Snapshot of bus counters used by dashboards and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusMetrics {
    /// Messages handed to the bus.
    pub published: u64,
    /// Messages delivered to subscription callbacks.
    pub delivered: u64,
    /// Messages evicted from full subscription queues.
    pub dropped: u64,
    /// Deliveries skipped because of incompatible QoS.
    pub incompatible: u64,
}

/// Description of a live topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,
    /// Message kind the topic is bound to.
    pub kind: MessageKind,
    /// Number of live subscriptions.
    pub subscribers: usize,
    /// Number of live publishers.
    pub publishers: usize,
}

struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    incompatible: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            incompatible: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> BusMetrics {
        BusMetrics {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            incompatible: self.incompatible.load(Ordering::Relaxed),
        }
    }
}

type Callback = Box<dyn FnMut(&Message) + Send>;

struct SubscriberSlot {
    id: u64,
    qos: QosProfile,
    queue: HistoryQueue<Message>,
    active: Arc<AtomicBool>,
    callback: Arc<Mutex<Callback>>,
}

struct TopicEntry {
    kind: MessageKind,
    subscribers: Vec<SubscriberSlot>,
    publishers: usize,
}

impl TopicEntry {
    fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            subscribers: Vec::new(),
            publishers: 0,
        }
    }

    fn is_unused(&self) -> bool {
        self.subscribers.is_empty() && self.publishers == 0
    }
}

#[derive(Default)]
struct BusState {
    topics: IndexMap<String, TopicEntry>,
    next_subscriber: u64,
}

impl BusState {
    fn bind(&mut self, topic: &str, kind: MessageKind) -> Result<&mut TopicEntry> {
        let entry = self
            .topics
            .entry(topic.to_owned())
            .or_insert_with(|| TopicEntry::new(kind));
        if entry.kind != kind {
            return Err(MessagingError::TypeMismatch {
                topic: topic.to_owned(),
                expected: entry.kind,
                found: kind,
            });
        }
        Ok(entry)
    }
}

struct Shared {
    state: Mutex<BusState>,
    counters: Counters,
    spinning: AtomicBool,
    exporter: Option<BusMetricsExporter>,
}

struct SpinGuard<'a>(&'a AtomicBool);

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Batch {
    active: Arc<AtomicBool>,
    callback: Arc<Mutex<Callback>>,
    messages: Vec<Message>,
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(MessagingError::InvalidTopic(topic.to_owned()));
    }
    Ok(())
}

/// In-process topic bus: typed topics, keep-last subscription queues, and
/// cooperative dispatch through [`TopicBus::spin_some`].
///
/// Clones share the same state.
#[derive(Clone)]
pub struct TopicBus {
    shared: Arc<Shared>,
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicBus")
            .field("metrics", &self.metrics())
            .finish_non_exhaustive()
    }
}

impl TopicBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an empty bus that mirrors its counters into Prometheus.
    pub fn with_exporter(exporter: BusMetricsExporter) -> Self {
        Self::build(Some(exporter))
    }

    fn build(exporter: Option<BusMetricsExporter>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BusState::default()),
                counters: Counters::new(),
                spinning: AtomicBool::new(false),
                exporter,
            }),
        }
    }

    /// Register a typed subscription.
    ///
    /// The callback runs from [`TopicBus::spin_some`] for each queued message.
    /// Dropping the returned handle unregisters the callback and discards any
    /// messages still queued for it.
    pub fn subscribe<M, F>(&self, topic: &str, qos: QosProfile, mut callback: F) -> Result<Subscription>
    where
        M: TopicMessage,
        F: FnMut(M) + Send + 'static,
    {
        validate_topic(topic)?;
        let erased: Callback = Box::new(move |message: &Message| {
            match M::from_payload(&message.payload) {
                Some(typed) => callback(typed),
                None => warn!(
                    topic = %message.topic,
                    kind = %message.kind(),
                    expected = %M::KIND,
                    "payload kind mismatch; message ignored"
                ),
            }
        });
        let active = Arc::new(AtomicBool::new(true));

        let mut state = self.shared.state.lock();
        state.next_subscriber += 1;
        let id = state.next_subscriber;
        let entry = state.bind(topic, M::KIND)?;
        entry.subscribers.push(SubscriberSlot {
            id,
            qos,
            queue: HistoryQueue::new(qos.depth),
            active: Arc::clone(&active),
            callback: Arc::new(Mutex::new(erased)),
        });
        drop(state);

        debug!(
            topic,
            subscription = id,
            kind = %M::KIND,
            depth = qos.depth,
            reliability = ?qos.reliability,
            "subscription registered"
        );
        Ok(Subscription {
            bus: Arc::downgrade(&self.shared),
            topic: topic.to_owned(),
            id,
            active,
        })
    }

    /// Create a typed publisher bound to `topic`.
    pub fn create_publisher<M: TopicMessage>(
        &self,
        topic: &str,
        qos: QosProfile,
    ) -> Result<Publisher<M>> {
        validate_topic(topic)?;
        self.shared.state.lock().bind(topic, M::KIND)?.publishers += 1;
        debug!(topic, kind = %M::KIND, reliability = ?qos.reliability, "publisher registered");
        Ok(Publisher {
            bus: self.clone(),
            topic: topic.to_owned(),
            qos,
            _marker: PhantomData,
        })
    }

    /// Publish a typed message with reliable delivery.
    ///
    /// Returns the number of subscriptions that queued the message.
    pub fn publish<M: TopicMessage>(&self, topic: &str, message: M) -> Result<usize> {
        self.publish_payload(topic, message.into_payload(), Reliability::Reliable)
    }

    /// Publish an already wrapped payload with reliable delivery.
    pub fn publish_raw(&self, topic: &str, payload: MessagePayload) -> Result<usize> {
        self.publish_payload(topic, payload, Reliability::Reliable)
    }

    fn publish_payload(
        &self,
        topic: &str,
        payload: MessagePayload,
        offered: Reliability,
    ) -> Result<usize> {
        validate_topic(topic)?;
        let message = Message::new(topic, payload);
        let kind = message.kind();

        let mut accepted = 0usize;
        {
            let mut state = self.shared.state.lock();
            if let Some(entry) = state.topics.get_mut(topic) {
                if entry.kind != kind {
                    return Err(MessagingError::TypeMismatch {
                        topic: topic.to_owned(),
                        expected: entry.kind,
                        found: kind,
                    });
                }
                for slot in entry.subscribers.iter_mut() {
                    if !slot.qos.accepts(offered) {
                        self.record_incompatible(topic, slot.id);
                        continue;
                    }
                    if let Some(evicted) = slot.queue.push(message.clone()) {
                        self.record_dropped(&evicted, slot.id);
                    }
                    accepted += 1;
                }
            }
        }

        self.shared.counters.published.fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.shared.exporter {
            exporter.observe_published();
        }
        log_message(MessageDirection::Outbound, &message);
        Ok(accepted)
    }

    /// Deliver every queued message to its subscription callback.
    ///
    /// Messages reach each subscription in publish order. Callbacks run without
    /// the bus lock held and may publish; messages they publish are delivered on
    /// the next call. A nested call from inside a callback returns `0`.
    pub fn spin_some(&self) -> usize {
        if self.shared.spinning.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let _guard = SpinGuard(&self.shared.spinning);

        let batches: Vec<Batch> = {
            let mut state = self.shared.state.lock();
            state
                .topics
                .values_mut()
                .flat_map(|entry| entry.subscribers.iter_mut())
                .filter(|slot| !slot.queue.is_empty())
                .map(|slot| Batch {
                    active: Arc::clone(&slot.active),
                    callback: Arc::clone(&slot.callback),
                    messages: slot.queue.drain(),
                })
                .collect()
        };

        let mut delivered = 0usize;
        for batch in batches {
            let mut callback = batch.callback.lock();
            for message in batch.messages {
                // a callback earlier in this spin may have dropped the subscription
                if !batch.active.load(Ordering::Acquire) {
                    break;
                }
                log_message(MessageDirection::Inbound, &message);
                (*callback)(&message);
                delivered += 1;
                self.record_delivered(&message);
            }
        }
        delivered
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscription_count(&self, topic: &str) -> usize {
        self.shared
            .state
            .lock()
            .topics
            .get(topic)
            .map(|entry| entry.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of live publishers on `topic`.
    pub fn publisher_count(&self, topic: &str) -> usize {
        self.shared
            .state
            .lock()
            .topics
            .get(topic)
            .map(|entry| entry.publishers)
            .unwrap_or(0)
    }

    /// Messages waiting for delivery across every subscription on `topic`.
    pub fn pending(&self, topic: &str) -> usize {
        self.shared
            .state
            .lock()
            .topics
            .get(topic)
            .map(|entry| entry.subscribers.iter().map(|slot| slot.queue.len()).sum())
            .unwrap_or(0)
    }

    /// Live topics in creation order.
    pub fn topics(&self) -> Vec<TopicInfo> {
        self.shared
            .state
            .lock()
            .topics
            .iter()
            .map(|(name, entry)| TopicInfo {
                name: name.clone(),
                kind: entry.kind,
                subscribers: entry.subscribers.len(),
                publishers: entry.publishers,
            })
            .collect()
    }

    /// Return the current metrics snapshot.
    pub fn metrics(&self) -> BusMetrics {
        self.shared.counters.snapshot()
    }

    fn record_delivered(&self, message: &Message) {
        self.shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.shared.exporter {
            exporter.observe_delivered();
            let latency = (Utc::now() - message.timestamp)
                .to_std()
                .unwrap_or_default();
            exporter.observe_latency(latency);
        }
    }

    fn record_dropped(&self, evicted: &Message, subscription: u64) {
        self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.shared.exporter {
            exporter.observe_dropped();
        }
        debug!(subscription, "subscription queue full; oldest message dropped");
        log_message(MessageDirection::Dropped, evicted);
    }

    fn record_incompatible(&self, topic: &str, subscription: u64) {
        self.shared
            .counters
            .incompatible
            .fetch_add(1, Ordering::Relaxed);
        if let Some(exporter) = &self.shared.exporter {
            exporter.observe_incompatible();
        }
        debug!(
            topic,
            subscription, "reliable subscription skipped best-effort message"
        );
    }
}

/// Handle owning a registered subscription.
///
/// Dropping it unregisters the callback; no callback fires afterwards.
pub struct Subscription {
    bus: Weak<Shared>,
    topic: String,
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Topic the subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Bus-unique subscription identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        let Some(shared) = self.bus.upgrade() else {
            return;
        };
        let removed = {
            let mut state = shared.state.lock();
            let mut removed = None;
            let mut unused = false;
            if let Some(entry) = state.topics.get_mut(&self.topic) {
                if let Some(pos) = entry.subscribers.iter().position(|slot| slot.id == self.id) {
                    removed = Some(entry.subscribers.remove(pos));
                }
                unused = entry.is_unused();
            }
            if unused {
                state.topics.shift_remove(&self.topic);
            }
            removed
        };
        // the slot (and its callback) is released outside the bus lock
        drop(removed);
        debug!(topic = %self.topic, subscription = self.id, "subscription released");
    }
}

/// Typed publisher bound to a single topic.
pub struct Publisher<M: TopicMessage> {
    bus: TopicBus,
    topic: String,
    qos: QosProfile,
    _marker: PhantomData<fn(M)>,
}

impl<M: TopicMessage> Publisher<M> {
    /// Publish a message using this publisher's reliability.
    pub fn publish(&self, message: M) -> Result<usize> {
        self.bus
            .publish_payload(&self.topic, message.into_payload(), self.qos.reliability)
    }

    /// Number of live subscriptions on the publisher's topic.
    pub fn subscription_count(&self) -> usize {
        self.bus.subscription_count(&self.topic)
    }

    /// Topic the publisher writes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// QoS profile offered by the publisher.
    pub fn qos(&self) -> QosProfile {
        self.qos
    }
}

impl<M: TopicMessage> fmt::Debug for Publisher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .field("kind", &M::KIND)
            .field("qos", &self.qos)
            .finish()
    }
}

impl<M: TopicMessage> Drop for Publisher<M> {
    fn drop(&mut self) {
        let mut state = self.bus.shared.state.lock();
        let mut unused = false;
        if let Some(entry) = state.topics.get_mut(&self.topic) {
            entry.publishers = entry.publishers.saturating_sub(1);
            unused = entry.is_unused();
        }
        if unused {
            state.topics.shift_remove(&self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Float64, Int32};

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl FnMut(Int32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |msg: Int32| sink.lock().push(msg.data))
    }

    #[test]
    fn publish_and_spin_cycle() {
        let bus = TopicBus::new();
        let (seen, callback) = recorder();
        let _sub = bus
            .subscribe("/led", QosProfile::default(), callback)
            .expect("subscribe succeeds");

        assert_eq!(bus.publish("/led", Int32 { data: 3 }).unwrap(), 1);
        assert!(seen.lock().is_empty(), "delivery waits for spin");
        assert_eq!(bus.spin_some(), 1);
        assert_eq!(*seen.lock(), vec![3]);

        let metrics = bus.metrics();
        assert_eq!(metrics.published, 1);
        assert_eq!(metrics.delivered, 1);
    }

    #[test]
    fn topic_kind_is_fixed_by_first_binding() {
        let bus = TopicBus::new();
        let (_seen, callback) = recorder();
        let _sub = bus.subscribe("/led", QosProfile::default(), callback).unwrap();

        let err = bus.publish("/led", Float64 { data: 1.0 }).unwrap_err();
        assert!(matches!(
            err,
            MessagingError::TypeMismatch {
                expected: MessageKind::Int32,
                found: MessageKind::Float64,
                ..
            }
        ));
        assert!(bus
            .create_publisher::<Float64>("/led", QosProfile::default())
            .is_err());
    }

    #[test]
    fn empty_topic_is_rejected() {
        let bus = TopicBus::new();
        let (_seen, callback) = recorder();
        assert!(matches!(
            bus.subscribe("  ", QosProfile::default(), callback),
            Err(MessagingError::InvalidTopic(_))
        ));
    }

    #[test]
    fn full_queue_drops_oldest() {
        let bus = TopicBus::new();
        let (seen, callback) = recorder();
        let _sub = bus
            .subscribe("/led", QosProfile::sensor_data().with_depth(3), callback)
            .unwrap();
        for value in 0..5 {
            bus.publish("/led", Int32 { data: value }).unwrap();
        }
        assert_eq!(bus.pending("/led"), 3);
        bus.spin_some();
        assert_eq!(*seen.lock(), vec![2, 3, 4]);
        assert_eq!(bus.metrics().dropped, 2);
    }

    #[test]
    fn dropping_subscription_stops_delivery_and_discards_queue() {
        let bus = TopicBus::new();
        let (seen, callback) = recorder();
        let sub = bus.subscribe("/led", QosProfile::default(), callback).unwrap();
        bus.publish("/led", Int32 { data: 1 }).unwrap();
        drop(sub);

        assert_eq!(bus.subscription_count("/led"), 0);
        assert_eq!(bus.spin_some(), 0);
        assert_eq!(bus.publish("/led", Int32 { data: 2 }).unwrap(), 0);
        assert!(seen.lock().is_empty());
        assert!(bus.topics().is_empty(), "unused topics are forgotten");
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let bus = TopicBus::new();
        assert_eq!(bus.publish("/nobody", Int32 { data: 1 }).unwrap(), 0);
        assert_eq!(bus.metrics().published, 1);
    }

    #[test]
    fn callbacks_may_publish_for_next_spin() {
        let bus = TopicBus::new();
        let echo_bus = bus.clone();
        let _echo = bus
            .subscribe("/in", QosProfile::default(), move |msg: Int32| {
                echo_bus
                    .publish("/out", Int32 { data: msg.data * 2 })
                    .expect("echo publish");
            })
            .unwrap();
        let (seen, callback) = recorder();
        let _out = bus.subscribe("/out", QosProfile::default(), callback).unwrap();

        bus.publish("/in", Int32 { data: 21 }).unwrap();
        bus.spin_some();
        bus.spin_some();
        assert_eq!(*seen.lock(), vec![42]);
    }

    #[test]
    fn subscription_dropped_mid_spin_receives_nothing_more() {
        let bus = TopicBus::new();
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let killer_slot = Arc::clone(&victim_slot);
        let _killer = bus
            .subscribe("/a", QosProfile::default(), move |_msg: Int32| {
                killer_slot.lock().take();
            })
            .unwrap();
        let (seen, callback) = recorder();
        *victim_slot.lock() = Some(bus.subscribe("/b", QosProfile::default(), callback).unwrap());

        bus.publish("/a", Int32 { data: 1 }).unwrap();
        bus.publish("/b", Int32 { data: 2 }).unwrap();
        assert_eq!(bus.spin_some(), 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn best_effort_publisher_skips_reliable_subscribers() {
        let bus = TopicBus::new();
        let (reliable_seen, reliable_cb) = recorder();
        let (sensor_seen, sensor_cb) = recorder();
        let _reliable = bus.subscribe("/led", QosProfile::default(), reliable_cb).unwrap();
        let _sensor = bus
            .subscribe("/led", QosProfile::sensor_data(), sensor_cb)
            .unwrap();
        let publisher = bus
            .create_publisher::<Int32>("/led", QosProfile::sensor_data())
            .unwrap();

        assert_eq!(publisher.subscription_count(), 2);
        assert_eq!(publisher.publish(Int32 { data: 5 }).unwrap(), 1);
        bus.spin_some();
        assert!(reliable_seen.lock().is_empty());
        assert_eq!(*sensor_seen.lock(), vec![5]);
        assert_eq!(bus.metrics().incompatible, 1);
    }

    #[test]
    fn topics_report_publishers_and_subscribers() {
        let bus = TopicBus::new();
        let publisher = bus
            .create_publisher::<Float64>("/ds0", QosProfile::sensor_data())
            .unwrap();
        let (_seen, callback) = recorder();
        let _sub = bus.subscribe("/led", QosProfile::default(), callback).unwrap();

        let topics = bus.topics();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].name, "/ds0");
        assert_eq!(topics[0].publishers, 1);
        assert_eq!(topics[1].kind, MessageKind::Int32);

        drop(publisher);
        assert_eq!(bus.publisher_count("/ds0"), 0);
        assert_eq!(bus.topics().len(), 1);
    }
}
