//! ---
//! sl_section: "01-core-functionality"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Shared primitives and utilities for the bridge runtime."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_robot_name() -> String {
    "robot".to_owned()
}

fn default_basic_time_step() -> u32 {
    32
}

fn default_enabled() -> bool {
    true
}

fn default_max_range() -> f64 {
    1.0
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_report_interval() -> Duration {
    Duration::from_secs(10)
}

/// Primary configuration object for the bridge runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub robot: RobotConfig,
    /// Per-device overrides keyed by device name.
    #[serde(default)]
    pub devices: IndexMap<String, DeviceParams>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "SIMLINK_CONFIG";

    /// Load configuration from disk, respecting the `SIMLINK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides declared for a device, or the defaults when none exist.
    pub fn device_params(&self, device: &str) -> DeviceParams {
        self.devices.get(device).cloned().unwrap_or_default()
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.robot.validate()?;
        for (name, params) in &self.devices {
            if self.robot.device(name).is_none() {
                return Err(anyhow!(
                    "override for device '{}' does not match any robot device",
                    name
                ));
            }
            params.validate(name)?;
        }
        if self.metrics.report_interval.is_zero() {
            return Err(anyhow!("metrics report_interval must be at least one second"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Simulated robot layout: timing and the devices it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default = "default_robot_name")]
    pub name: String,
    /// Base step of the simulation, in milliseconds.
    #[serde(default = "default_basic_time_step")]
    pub basic_time_step: u32,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: default_robot_name(),
            basic_time_step: default_basic_time_step(),
            devices: Vec::new(),
        }
    }
}

impl RobotConfig {
    pub fn device(&self, name: &str) -> Option<&DeviceSpec> {
        self.devices.iter().find(|spec| spec.name() == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("robot name cannot be empty"));
        }
        if self.basic_time_step == 0 {
            return Err(anyhow!(
                "robot '{}' must declare a positive basic_time_step",
                self.name
            ));
        }
        let mut seen = HashSet::new();
        for spec in &self.devices {
            if spec.name().trim().is_empty() {
                return Err(anyhow!("robot '{}' declares an unnamed device", self.name));
            }
            if !seen.insert(spec.name()) {
                return Err(anyhow!(
                    "robot '{}' declares device '{}' more than once",
                    self.name,
                    spec.name()
                ));
            }
            if let DeviceSpec::DistanceSensor {
                name,
                min_range,
                max_range,
            } = spec
            {
                if !min_range.is_finite() || !max_range.is_finite() {
                    return Err(anyhow!(
                        "distance sensor '{}' needs finite min_range and max_range",
                        name
                    ));
                }
                if max_range < min_range {
                    return Err(anyhow!(
                        "distance sensor '{}' has max_range below min_range",
                        name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Device declared on the simulated robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceSpec {
    Led {
        name: String,
    },
    DistanceSensor {
        name: String,
        #[serde(default)]
        min_range: f64,
        #[serde(default = "default_max_range")]
        max_range: f64,
    },
}

impl DeviceSpec {
    pub fn name(&self) -> &str {
        match self {
            DeviceSpec::Led { name } | DeviceSpec::DistanceSensor { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeviceSpec::Led { .. } => "led",
            DeviceSpec::DistanceSensor { .. } => "distance_sensor",
        }
    }
}

/// Per-device bridge properties. Unset fields fall back to adapter defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceParams {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub topic_name: Option<String>,
    /// Milliseconds between updates.
    #[serde(default)]
    pub update_interval: Option<u32>,
    #[serde(default)]
    pub always_publish: bool,
    #[serde(default)]
    pub frame_name: Option<String>,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            topic_name: None,
            update_interval: None,
            always_publish: false,
            frame_name: None,
        }
    }
}

impl DeviceParams {
    pub fn validate(&self, device: &str) -> Result<()> {
        if self.update_interval == Some(0) {
            return Err(anyhow!(
                "device '{}' update_interval must be positive",
                device
            ));
        }
        if let Some(topic) = &self.topic_name {
            if topic.trim().is_empty() {
                return Err(anyhow!("device '{}' topic_name cannot be empty", device));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    /// How often the daemon logs a bus metrics snapshot.
    #[serde(default = "default_report_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub report_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            report_interval: default_report_interval(),
        }
    }
}
