//! ---
//! sl_section: "05-daemon"
//! sl_subsection: "binary"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Binary entrypoint for the simlink daemon."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
mod inject;
mod pacing;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use simlink_common::config::{AppConfig, MetricsConfig};
use simlink_common::logging::{init_tracing, LogFormat};
use simlink_common::time::step_duration;
use simlink_devices::{DeviceNode, RobotDevice};
use simlink_msg::{BusMetricsExporter, TopicBus};
use tokio::signal;
use tokio::time::Interval;
use tracing::{debug, info};

use crate::inject::Injector;
use crate::pacing::StepPacer;

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("simlink ", env!("CARGO_PKG_VERSION")),
    about = "simlink daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Stop after N simulation steps")]
    steps: Option<u64>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Replay newline-delimited JSON messages onto the bus"
    )]
    inject: Option<PathBuf>,

    #[arg(long, value_enum, help = "Override the configured log format")]
    log_format: Option<CliLogFormat>,

    #[arg(long, help = "Step as fast as possible instead of in real time")]
    fast: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Json,
    Pretty,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Json => LogFormat::StructuredJson,
            CliLogFormat::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the simulation loop")]
    Run,
    #[command(about = "Print the resolved device-to-topic bindings and exit")]
    Topics {
        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.sim.toml"));

    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    init_tracing("simlinkd", &config.logging)?;
    info!(
        config_path = %loaded.source.display(),
        robot = %config.robot.name,
        devices = config.robot.devices.len(),
        elapsed_ms = load_started.elapsed().as_millis() as u64,
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, cli.steps, cli.inject, cli.fast).await,
        Commands::Topics { json } => print_topics(&config, json),
    }
}

async fn run_daemon(
    config: AppConfig,
    steps: Option<u64>,
    inject: Option<PathBuf>,
    fast: bool,
) -> Result<()> {
    let registry = Registry::new();
    let bus = if config.metrics.enabled {
        TopicBus::with_exporter(BusMetricsExporter::register(&registry)?)
    } else {
        info!("metrics exporter disabled by configuration");
        TopicBus::new()
    };
    let mut node = DeviceNode::from_config(&config, bus.clone())
        .context("failed to bind robot devices")?;

    let injector = inject.map(|path| Injector::start(bus.clone(), path));

    let mut pacer = StepPacer::new(step_duration(config.robot.basic_time_step));
    let mut report = report_interval(&config.metrics).await;
    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        robot = %config.robot.name,
        basic_time_step = config.robot.basic_time_step,
        steps = ?steps,
        "simulation running; waiting for termination signal"
    );
    loop {
        if steps.is_some_and(|limit| node.step_count() >= limit) {
            info!(steps = node.step_count(), "step limit reached");
            break;
        }
        tokio::select! {
            result = &mut shutdown => {
                result?;
                info!("ctrl-c received; shutting down");
                break;
            }
            _ = next_report(&mut report), if report.is_some() => {
                let metrics = bus.metrics();
                info!(
                    step = node.step_count(),
                    published = metrics.published,
                    delivered = metrics.delivered,
                    dropped = metrics.dropped,
                    incompatible = metrics.incompatible,
                    "bus metrics"
                );
            }
            _ = pacer.tick(), if !fast => {
                node.step();
            }
            _ = tokio::task::yield_now(), if fast => {
                node.step();
            }
        }
    }

    if let Some(injector) = injector {
        injector.finish().await?;
    }
    // Deliver whatever arrived after the last step.
    bus.spin_some();

    log_device_states(&node);
    let metrics = bus.metrics();
    info!(
        steps = node.step_count(),
        published = metrics.published,
        delivered = metrics.delivered,
        dropped = metrics.dropped,
        incompatible = metrics.incompatible,
        "simulation stopped"
    );
    if config.metrics.enabled {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        debug!(exposition = %String::from_utf8_lossy(&buffer), "final metrics");
    }
    Ok(())
}

/// Periodic metrics report, `None` when metrics are disabled or the period is zero.
async fn report_interval(metrics: &MetricsConfig) -> Option<Interval> {
    if !metrics.enabled || metrics.report_interval.is_zero() {
        return None;
    }
    let mut interval = tokio::time::interval(metrics.report_interval);
    interval.tick().await;
    Some(interval)
}

async fn next_report(report: &mut Option<Interval>) {
    match report {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn log_device_states(node: &DeviceNode) {
    for device in node.robot().devices() {
        match device {
            RobotDevice::Led(led) => info!(
                device = device.name(),
                value = led.value(),
                writes = led.write_count(),
                "led state"
            ),
            RobotDevice::DistanceSensor(sensor) => info!(
                device = device.name(),
                sampling_period = ?sensor.sampling_period(),
                "distance sensor state"
            ),
        }
    }
}

fn print_topics(config: &AppConfig, json: bool) -> Result<()> {
    let node = DeviceNode::from_config(config, TopicBus::new())
        .context("failed to bind robot devices")?;
    let bindings = node.bindings();
    if json {
        let rows: Vec<_> = bindings
            .iter()
            .map(|binding| {
                serde_json::json!({
                    "device": binding.device,
                    "kind": binding.kind,
                    "topic": binding.topic,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for binding in &bindings {
            println!(
                "{:<20} {:<16} {}",
                binding.device,
                binding.kind,
                binding.topic.as_deref().unwrap_or("(disabled)")
            );
        }
    }
    Ok(())
}
