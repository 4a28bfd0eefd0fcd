//! Telemetry and logging configuration.
//!
//! This module provides:
//! - Configurable logging with JSON or pretty-print formats
//! - Optional OpenTelemetry integration for distributed tracing
//!
//! # Basic Logging
//!
//! ```rust,no_run
//! use fabricmesh::telemetry::{LogFormat, init_logging};
//!
//! // Initialize pretty logging (default)
//! init_logging(LogFormat::Pretty).expect("Failed to init logging");
//! ```
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Set to `json` or `pretty` (default: `pretty`)
//! - `RUST_LOG`: Control log levels (default: `info`)
//!
//! # OpenTelemetry (Optional)
//!
//! Enable the `otel` feature, then initialize telemetry at startup:
//!
//! ```rust,no_run
//! use fabricmesh::telemetry::{TelemetryConfig, init_telemetry};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_telemetry(TelemetryConfig::default()).expect("Failed to init telemetry");
//!
//!     // Controller runs...
//!
//!     fabricmesh::telemetry::shutdown_telemetry();
//! }
//! ```
//!
//! # OpenTelemetry Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Override the OTLP endpoint (default: `http://localhost:4317`)
//! - `OTEL_SERVICE_NAME`: Override the service name (default: `fabricmesh-controller`)
//!
//! All existing `tracing` spans and events are bridged to OpenTelemetry via
//! `tracing-opentelemetry` when the feature is on.

use tracing_subscriber::prelude::*;

#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "otel")]
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
#[cfg(feature = "otel")]
use tracing_opentelemetry::OpenTelemetryLayer;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty-print format (default).
    #[default]
    Pretty,
    /// JSON format for log aggregators (Elasticsearch, Loki, etc.).
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        })
    }
}

impl LogFormat {
    /// Read from LOG_FORMAT environment variable.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|s| s.parse().unwrap_or_default())
            .unwrap_or_default()
    }
}

/// Initialize logging with the specified format.
///
/// Sets up the tracing subscriber with either JSON or pretty-print output.
/// Log levels are controlled via the `RUST_LOG` environment variable.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
    }

    Ok(())
}

/// Configuration for OpenTelemetry telemetry.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces (default: "fabricmesh-controller")
    pub service_name: String,

    /// OTLP endpoint URL (default: "http://localhost:4317")
    pub otlp_endpoint: String,

    /// Whether to enable console output alongside OTel export
    pub enable_console: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "fabricmesh-controller".to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_console: true,
        }
    }
}

/// Initialize OpenTelemetry tracing.
///
/// Call this once at application startup before any tracing calls.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be initialized.
#[cfg(feature = "otel")]
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry::KeyValue;

    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let provider = sdktrace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("fabricmesh");

    opentelemetry::global::set_tracer_provider(provider);

    let otel_layer = OpenTelemetryLayer::new(tracer);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        "OpenTelemetry tracing initialized"
    );

    Ok(())
}

/// Initialize telemetry (no-op when otel feature is disabled).
#[cfg(not(feature = "otel"))]
pub fn init_telemetry(_config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}

/// Shutdown OpenTelemetry gracefully.
///
/// Call this before application exit to ensure all pending traces are flushed.
#[cfg(feature = "otel")]
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("OpenTelemetry tracing shut down");
}

/// Shutdown telemetry (no-op when otel feature is disabled).
#[cfg(not(feature = "otel"))]
pub fn shutdown_telemetry() {}

/// Check if OpenTelemetry is enabled.
#[cfg(feature = "otel")]
pub fn is_otel_enabled() -> bool {
    true
}

/// Check if OpenTelemetry is enabled (always false when feature disabled).
#[cfg(not(feature = "otel"))]
pub fn is_otel_enabled() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("anything".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert!(config.service_name.contains("fabricmesh"));
        assert!(config.otlp_endpoint.contains("4317"));
        assert!(config.enable_console);
    }

    #[test]
    fn test_custom_config() {
        let config = TelemetryConfig {
            service_name: "custom-service".to_string(),
            otlp_endpoint: "http://jaeger:4317".to_string(),
            enable_console: false,
        };
        assert_eq!(config.service_name, "custom-service");
        assert_eq!(config.otlp_endpoint, "http://jaeger:4317");
        assert!(!config.enable_console);
    }

    #[test]
    fn test_shutdown_noop() {
        // Safe to call even if init was never called.
        shutdown_telemetry();
    }

    #[test]
    fn test_init_telemetry_without_otel() {
        let config = TelemetryConfig::default();
        let result = init_telemetry(config);
        assert!(result.is_ok() || is_otel_enabled());
    }
}
