//! ---
//! sl_section: "01-core-functionality"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Shared primitives and utilities for the bridge runtime."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
//! Process-wide tracing setup for simlink binaries.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Filter directive variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "SIMLINK_LOG";
const FALLBACK_LEVEL: &str = "info";

/// Non-blocking writer guards; dropping them would lose buffered lines.
struct WriterGuards {
    _stdout: WorkerGuard,
    _file: WorkerGuard,
}

static GUARDS: OnceCell<WriterGuards> = OnceCell::new();

/// Stdout line format. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Install the global subscriber for `service_name`.
///
/// The filter comes from `SIMLINK_LOG`, then `RUST_LOG`, then `info`. Events
/// go to stdout in `config.format` and to a daily JSON file named after
/// `config.file_prefix` (or the service) inside `config.directory`. A second
/// call keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("cannot create log directory {}", config.directory.display())
    })?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&config.directory, log_file_name(service_name, config)),
    );
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = GUARDS.set(WriterGuards {
        _stdout: stdout_guard,
        _file: file_guard,
    });

    let directive = std::env::var(LOG_ENV).ok();
    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(log_filter(directive.as_deref()))
        .with(stdout_layer)
        .with(
            fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_writer(file_writer),
        )
        .try_init()
        .is_ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        installed,
        "tracing ready"
    );
    Ok(())
}

/// Build the filter from an explicit directive, falling back to `RUST_LOG`
/// and then `info`. A malformed directive is reported on stderr and ignored.
fn log_filter(directive: Option<&str>) -> EnvFilter {
    if let Some(directive) = directive {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("ignoring {LOG_ENV}={directive:?}: {err}"),
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

fn log_file_name(service_name: &str, config: &LoggingConfig) -> String {
    let stem = config.file_prefix.as_deref().unwrap_or(service_name);
    format!("{stem}.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging_in(dir: &std::path::Path, file_prefix: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            directory: dir.join("logs"),
            format: LogFormat::Pretty,
            file_prefix: file_prefix.map(str::to_owned),
        }
    }

    #[test]
    fn init_tracing_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = logging_in(dir.path(), Some("unit"));
        init_tracing("simlink-test", &config).expect("tracing initialises");
        assert!(config.directory.is_dir());
    }

    #[test]
    fn file_name_prefers_the_configured_prefix() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            log_file_name("simlinkd", &logging_in(dir.path(), Some("bench"))),
            "bench.log"
        );
        assert_eq!(
            log_file_name("simlinkd", &logging_in(dir.path(), None)),
            "simlinkd.log"
        );
    }

    #[test]
    fn explicit_directive_is_used_verbatim() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
    }
}
