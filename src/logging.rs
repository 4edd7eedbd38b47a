//! Logging configuration and initialization for ClassConnect.
//!
//! Application logs go to stdout and the app log file. Security events
//! (tracing target `security`) additionally go to a dedicated JSON log file
//! for audit purposes.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::security::SECURITY_TARGET;
use crate::Result;

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Ensure the parent directory of a log file exists.
fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Initialize the logging system with the given configuration.
///
/// Sets up console + file output for application logs and a separate JSON
/// file sink for security events.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    ensure_parent_dir(&config.file)?;
    ensure_parent_dir(&config.security_file)?;

    let log_file = Arc::new(File::create(&config.file)?);
    let security_file = Arc::new(File::create(&config.security_file)?);

    // Application logs: stdout + file, excluding the security target
    let app_writer = std::io::stdout.and(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(app_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter_fn(|meta| meta.target() != SECURITY_TARGET)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(security_file)
                .with_ansi(false)
                .with_filter(filter_fn(|meta| meta.target() == SECURITY_TARGET)),
        )
        .with(filter)
        .init();

    Ok(())
}

/// Initialize console-only logging (for development/testing).
pub fn init_console_only(level: &str) {
    let level = parse_level(level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter)
        .init();
}
