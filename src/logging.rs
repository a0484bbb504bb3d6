//! Structured logging setup.
//!
//! - JSON formatting for CI and machine consumption
//! - Pretty formatting for interactive use
//! - stdout, stderr, or daily-rotated file output
//!
//! Configured from `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_DIR` and `RUST_LOG`.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Directory for log files (when output is `File`)
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    pub service_name: String,
    pub service_version: String,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    pub enable_rotation: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// File with rotation
    File,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "sheetforge".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            default_filter: "info".to_string(),
            enable_rotation: true,
        }
    }
}

impl LoggingConfig {
    /// Build a configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup. Unknown
    /// values leave the default in place.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(format) = lookup("LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => config.format,
            };
        }

        if let Some(output) = lookup("LOG_OUTPUT") {
            config.output = match output.to_lowercase().as_str() {
                "stdout" => LogOutput::Stdout,
                "stderr" => LogOutput::Stderr,
                "file" => LogOutput::File,
                _ => config.output,
            };
        }

        if let Some(log_dir) = lookup("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        if let Some(rotation) = lookup("LOG_ROTATION") {
            config.enable_rotation = !matches!(rotation.to_lowercase().as_str(), "0" | "false" | "never");
        }

        config
    }

    /// Raise the default filter, e.g. from a `--verbose` flag.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_filter = match verbose {
            0 => self.default_filter,
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        self
    }
}

/// Initialize structured logging with the given configuration.
///
/// The returned guard must be held for the lifetime of the application so
/// buffered logs are flushed.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=info,reqwest=info", config.default_filter)));

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File => {
            std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

            let file_appender = if config.enable_rotation {
                tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix)
            } else {
                tracing_appender::rolling::never(&config.log_dir, &config.log_file_prefix)
            };
            tracing_appender::non_blocking(file_appender)
        }
    };

    let registry = tracing_subscriber::registry();
    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .with_file(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_line_number(false)
                .with_file(false)
                .with_ansi(config.output != LogOutput::File)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()
        }
    }
    .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        service = %config.service_name,
        version = %config.service_version,
        format = ?config.format,
        output = ?config.output,
        "logging initialized"
    );

    Ok(guard)
}

/// Span wrapping one sheet's generation.
pub fn generation_span(spreadsheet_id: &str, sheet_name: &str) -> tracing::Span {
    tracing::info_span!(
        "generate",
        sheet.id = spreadsheet_id,
        sheet.name = sheet_name,
    )
}

/// Span wrapping one drain pass.
pub fn drain_span(jobs: usize) -> tracing::Span {
    tracing::info_span!("drain", jobs)
}
