//! ---
//! sl_section: "02-messaging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Typed topic bus, QoS profiles, and message schema."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::types::MessagePayload;
use crate::{Result, TopicBus};

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    topic: String,
    #[serde(default)]
    delay_ms: Option<u64>,
    payload: MessagePayload,
}

/// Slice used while waiting out a record delay, so cancellation is noticed promptly.
const DELAY_POLL: Duration = Duration::from_millis(10);

/// Replay messages from a newline-delimited JSON file.
///
/// Each line holds an object with a `topic`, a `payload` (a [`MessagePayload`]
/// such as `{"kind":"int32","data":{"data":7}}`) and an optional `delay_ms`
/// applied before publishing. Blank lines are skipped. Returns the number of
/// records published.
pub fn replay_from_file<P: AsRef<Path>>(bus: &TopicBus, path: P) -> Result<usize> {
    replay_until_cancelled(bus, path, &AtomicBool::new(false))
}

/// Same as [`replay_from_file`], but stops before the next record, or in the
/// middle of a delay, once `cancel` is set. Returns the records published so far.
pub fn replay_until_cancelled<P: AsRef<Path>>(
    bus: &TopicBus,
    path: P,
    cancel: &AtomicBool,
) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0usize;

    for line in reader.lines() {
        if cancel.load(Ordering::Acquire) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(&line)?;
        if let Some(delay) = record.delay_ms {
            if !wait(Duration::from_millis(delay), cancel) {
                debug!(published = count, "replay cancelled during delay");
                break;
            }
        }
        bus.publish_raw(&record.topic, record.payload)?;
        count += 1;
    }

    Ok(count)
}

/// Sleep for `delay` unless `cancel` is raised first. Returns `false` when cancelled.
fn wait(delay: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(DELAY_POLL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Int32, QosProfile};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn replay_from_file_streams_records() {
        let bus = TopicBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus
            .subscribe("/led", QosProfile::default(), move |msg: Int32| {
                sink.lock().push(msg.data)
            })
            .unwrap();

        let temp = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(
            temp.path(),
            r#"{"topic":"/led","payload":{"kind":"int32","data":{"data":7}}}

{"topic":"/led","delay_ms":1,"payload":{"kind":"int32","data":{"data":0}}}
"#,
        )
        .expect("write temp file");

        let replayed = replay_from_file(&bus, temp.path()).expect("replay works");
        assert_eq!(replayed, 2);
        bus.spin_some();
        assert_eq!(*seen.lock(), vec![7, 0]);
    }

    #[test]
    fn malformed_line_is_reported() {
        let bus = TopicBus::new();
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "{not json}\n").unwrap();
        assert!(matches!(
            replay_from_file(&bus, temp.path()),
            Err(crate::MessagingError::Json(_))
        ));
    }

    #[test]
    fn cancel_interrupts_a_long_delay() {
        let bus = TopicBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus
            .subscribe("/led", QosProfile::default(), move |msg: Int32| {
                sink.lock().push(msg.data)
            })
            .unwrap();
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            r#"{"topic":"/led","payload":{"kind":"int32","data":{"data":1}}}
{"topic":"/led","delay_ms":6000,"payload":{"kind":"int32","data":{"data":2}}}
"#,
        )
        .unwrap();

        let cancel = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&cancel);
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.store(true, Ordering::Release);
        });

        let started = Instant::now();
        let replayed = replay_until_cancelled(&bus, temp.path(), &cancel).unwrap();
        canceller.join().unwrap();

        assert_eq!(replayed, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
        bus.spin_some();
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn cancelled_replay_publishes_nothing() {
        let bus = TopicBus::new();
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            r#"{"topic":"/led","payload":{"kind":"int32","data":{"data":1}}}"#,
        )
        .unwrap();
        let cancel = AtomicBool::new(true);
        assert_eq!(replay_until_cancelled(&bus, temp.path(), &cancel).unwrap(), 0);
        assert_eq!(bus.metrics().published, 0);
    }
}
