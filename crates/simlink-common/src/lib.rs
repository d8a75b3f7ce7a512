//! ---
//! sl_section: "01-core-functionality"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Shared primitives and utilities for the bridge runtime."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Core shared primitives for the simlink workspace.
//! This crate exposes configuration loading, tracing initialisation, and
//! simulated-time helpers consumed by the device and daemon crates.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, DeviceParams, DeviceSpec, LoadedAppConfig, LoggingConfig, MetricsConfig,
    RobotConfig,
};
pub use logging::{init_tracing, LogFormat};
