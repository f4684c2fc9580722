//! Process-wide logging setup, called once by the binary.
//!
//! `log` records from dependencies and the worker pool are bridged into
//! `tracing`. `RUST_LOG` overrides the configured level for the console; the
//! optional log file always receives DEBUG and above.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)?];

    if let Some(path) = &config.file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Logging(format!("cannot create '{}': {}", parent.display(), e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                ConfigError::Logging(format!("cannot open '{}': {}", path.display(), e))
            })?;

        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::DEBUG)
                .boxed(),
        );
    }

    let subscriber = tracing_subscriber::registry().with(layers);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

fn console_layer(config: &LoggingConfig) -> Result<BoxedLayer, ConfigError> {
    let filter = console_filter(&config.level)?;
    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

fn console_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| ConfigError::Logging(format!("invalid log level '{}': {}", level, e)))
}

/// File name of `path` for log lines and span fields; directories stay out
/// of the logs.
pub fn file_label(path: &Path) -> Cow<'_, str> {
    match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => Cow::Borrowed("<unknown>"),
    }
}
