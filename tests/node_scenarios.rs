//! ---
//! sl_section: "07-testing"
//! sl_subsection: "integration-tests"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "End-to-end scenarios for the device node."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use simlink_common::config::{AppConfig, DeviceParams};
use simlink_devices::{Binding, DeviceNode, DistanceSensor, Host, Robot};
use simlink_msg::{replay_from_file, Int32, QosProfile, Range, TopicBus};

fn repo_file(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join(relative)
}

#[test]
fn example_configuration_binds_every_device() -> anyhow::Result<()> {
    let config = AppConfig::load(&[repo_file("configs/example.sim.toml")])?;
    let node = DeviceNode::from_config(&config, TopicBus::new())?;

    let expected = [
        ("led_front", "led", "/led_front"),
        ("led_status", "led", "/status_led"),
        ("ds0", "distance_sensor", "/ds0"),
    ];
    let bindings = node.bindings();
    assert_eq!(bindings.len(), expected.len());
    for (binding, (device, kind, topic)) in bindings.iter().zip(expected) {
        assert_eq!(
            binding,
            &Binding {
                device: device.to_owned(),
                kind,
                topic: Some(topic.to_owned()),
            }
        );
    }
    Ok(())
}

#[test]
fn shipped_replay_drives_the_leds() -> anyhow::Result<()> {
    let config = AppConfig::load(&[repo_file("configs/example.sim.toml")])?;
    let bus = TopicBus::new();
    let mut node = DeviceNode::from_config(&config, bus.clone())?;

    let count = replay_from_file(&bus, repo_file("configs/led_replay.ndjson"))?;
    assert_eq!(count, 4);
    node.step();

    assert_eq!(node.robot().led("led_front")?.value(), 0);
    assert_eq!(node.robot().led("led_front")?.write_count(), 3);
    assert_eq!(node.robot().led("led_status")?.value(), 3);
    Ok(())
}

#[test]
fn messages_published_by_a_callback_arrive_next_step() -> anyhow::Result<()> {
    let raw = r#"
[robot]
name = "relay"
basic_time_step = 16
devices = [
  { name = "primary", kind = "led" },
  { name = "mirror", kind = "led" },
]
"#;
    let config = AppConfig::from_str(raw)?;
    let bus = TopicBus::new();
    let mut node = DeviceNode::from_config(&config, bus.clone())?;

    let relay_bus = bus.clone();
    let _relay = bus.subscribe("/primary", QosProfile::default(), move |msg: Int32| {
        let _ = relay_bus.publish("/mirror", Int32 { data: msg.data * 2 });
    })?;

    bus.publish("/primary", Int32 { data: 21 })?;
    node.step();
    let mirror = node.robot().led("mirror")?;
    assert_eq!(node.robot().led("primary")?.value(), 21);
    assert_eq!(mirror.write_count(), 0);

    node.step();
    assert_eq!(mirror.value(), 42);
    Ok(())
}

#[test]
fn distance_sensor_publishes_once_per_interval_while_subscribed() -> anyhow::Result<()> {
    let mut robot = Robot::new("bot", 32);
    let sensor = robot.add_distance_sensor("ds0", 0.0, 1.0);
    let mut overrides = IndexMap::new();
    overrides.insert(
        "ds0".to_owned(),
        DeviceParams {
            update_interval: Some(64),
            ..Default::default()
        },
    );
    let bus = TopicBus::new();
    let mut node = DeviceNode::new(robot, bus.clone(), &overrides)?;

    node.run_steps(4);
    assert!(!sensor.is_enabled());
    assert_eq!(bus.metrics().published, 0);

    let readings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&readings);
    let _sub = bus.subscribe("/ds0", QosProfile::sensor_data(), move |msg: Range| {
        sink.lock().push((msg.frame_id, msg.range))
    })?;
    sensor.set_reading(0.4);

    node.run_steps(8);
    bus.spin_some();
    assert_eq!(sensor.sampling_period(), Some(64));
    let readings = readings.lock();
    assert_eq!(readings.len(), 4);
    assert!(readings
        .iter()
        .all(|(frame, range)| frame == "ds0" && (*range - 0.4).abs() < 1e-9));
    Ok(())
}

#[test]
fn default_qos_subscriber_receives_range_samples() -> anyhow::Result<()> {
    let mut robot = Robot::new("bot", 32);
    let sensor = robot.add_distance_sensor("ds0", 0.0, 2.0);
    let bus = TopicBus::new();
    let mut node = DeviceNode::new(robot, bus.clone(), &IndexMap::new())?;

    let readings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&readings);
    let _sub = bus.subscribe("/ds0", QosProfile::default(), move |msg: Range| {
        sink.lock().push(msg.range)
    })?;
    sensor.set_reading(1.5);

    node.run_steps(3);
    bus.spin_some();
    assert_eq!(readings.lock().len(), 3);
    assert_eq!(bus.metrics().incompatible, 0);
    Ok(())
}

#[test]
fn dropping_the_node_releases_every_subscription() -> anyhow::Result<()> {
    let config = AppConfig::load(&[repo_file("configs/example.sim.toml")])?;
    let bus = TopicBus::new();
    let node = DeviceNode::from_config(&config, bus.clone())?;
    assert_eq!(node.bus().subscription_count("/led_front"), 1);
    assert_eq!(bus.publisher_count("/ds0"), 1);

    drop(node);
    assert_eq!(bus.subscription_count("/led_front"), 0);
    assert_eq!(bus.subscription_count("/status_led"), 0);
    assert_eq!(bus.publisher_count("/ds0"), 0);
    assert!(bus.topics().is_empty());
    Ok(())
}

#[test]
fn replay_file_can_be_generated_on_the_fly() -> anyhow::Result<()> {
    let mut robot = Robot::new("bot", 32);
    let led = robot.add_led("led0");
    let bus = TopicBus::new();
    let mut node = DeviceNode::new(robot, bus.clone(), &IndexMap::new())?;

    let file = tempfile::NamedTempFile::new()?;
    let lines: Vec<String> = (0..15)
        .map(|value| {
            format!(r#"{{"topic":"/led0","payload":{{"kind":"int32","data":{{"data":{value}}}}}}}"#)
        })
        .collect();
    std::fs::write(file.path(), lines.join("\n"))?;

    assert_eq!(replay_from_file(&bus, file.path())?, 15);
    let report = node.step();
    assert_eq!(report.delivered, 10);
    assert_eq!(led.value(), 14);
    assert_eq!(led.write_count(), 10);
    assert_eq!(bus.metrics().dropped, 5);
    Ok(())
}
