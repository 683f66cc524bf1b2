//! Logging utilities and configuration for fieldguard.
//!
//! The engine emits structured events through the `tracing` crate. This
//! module provides a small configuration surface for controlling how chatty
//! the pipeline is and a helper for keeping submitted values out of logs at
//! full length.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration for the schema engine.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for engine components
    pub base_level: Level,
    /// Whether to log per-field pipeline details
    pub log_pipeline_details: bool,
    /// Maximum length for logged field values
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_pipeline_details: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_pipeline_details: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_pipeline_details: false,
            max_field_length: 128,
        }
    }
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_length).collect();
        format!("{truncated}...(truncated)")
    }
}

/// Installs a global `tracing` subscriber honoring `RUST_LOG`, falling back
/// to the configured base level. Safe to call more than once; later calls
/// are no-ops.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.base_level.to_string().to_lowercase()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
