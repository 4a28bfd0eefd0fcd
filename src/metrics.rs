//! Prometheus metrics for the fabricmesh control plane.
//!
//! Metrics cover:
//! - Mesh membership (connected peers, read-only state and transitions)
//! - Administrative command submission (join/remove/transfer outcomes)
//! - Peer handshakes (count, latency)
//! - Event dispatch (events per namespace, handler panics, handler counts)
//!
//! # Safety
//!
//! All metrics are registered to a custom registry with the "fabricmesh"
//! prefix to avoid name collisions with other libraries using the default
//! Prometheus registry. Registration errors are handled gracefully - if a
//! metric fails to register, a fallback no-op metric is used instead of
//! panicking.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Registry,
    TextEncoder, opts,
};
use tracing::warn;

/// Custom Prometheus registry for fabricmesh metrics.
/// Using a custom registry prevents name collisions with other libraries.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("fabricmesh".to_string()), None).unwrap_or_else(|_| Registry::new())
});

// =============================================================================
// Metric Declaration Macros
// =============================================================================
//
// These macros reduce boilerplate for declaring metrics. Each expands to a
// Lazy static with safe registration.

/// Declare an IntGauge metric.
macro_rules! define_gauge {
    ($name:ident, $metric_name:expr, $help:expr) => {
        #[doc = $help]
        pub static $name: Lazy<IntGauge> =
            Lazy::new(|| register_int_gauge_safe(&REGISTRY, $metric_name, $help));
    };
}

/// Declare an IntGaugeVec metric with labels.
macro_rules! define_gauge_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntGaugeVec> = Lazy::new(|| {
            register_int_gauge_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare an IntCounterVec metric with labels.
macro_rules! define_counter_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntCounterVec> = Lazy::new(|| {
            register_int_counter_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare a HistogramVec metric with labels and buckets.
macro_rules! define_histogram_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?], [$($bucket:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<HistogramVec> = Lazy::new(|| {
            register_histogram_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+], vec![$($bucket),+])
        });
    };
}

// =============================================================================
// Mesh membership metrics
// =============================================================================

define_gauge!(
    CONNECTED_PEERS,
    "connected_peers",
    "Number of peer controllers currently connected to this node's mesh"
);
define_gauge!(
    READONLY_STATE,
    "cluster_readonly",
    "Whether the cluster is in read-only mode (1) or read-write mode (0)"
);
define_counter_vec!(
    READONLY_TRANSITIONS,
    "cluster_readonly_transitions_total",
    "Read-only mode transitions",
    ["direction"]
);
define_histogram_vec!(
    READONLY_DURATION,
    "cluster_readonly_duration_seconds",
    "How long the cluster stayed in read-only mode",
    ["exit_reason"],
    [1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]
);

// =============================================================================
// Administrative command metrics
// =============================================================================

define_counter_vec!(
    MEMBERSHIP_COMMANDS,
    "membership_commands_total",
    "Membership commands submitted to the consensus log",
    ["command", "status"]
);
define_counter_vec!(
    HANDSHAKES,
    "peer_handshakes_total",
    "Peer identity handshakes performed",
    ["status"]
);
define_histogram_vec!(
    HANDSHAKE_DURATION,
    "peer_handshake_duration_seconds",
    "Peer identity handshake duration in seconds",
    ["status"],
    [0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
);

// =============================================================================
// Event dispatch metrics
// =============================================================================

define_counter_vec!(
    EVENTS_DISPATCHED,
    "events_dispatched_total",
    "Events accepted for dispatch, per namespace",
    ["namespace"]
);
define_counter_vec!(
    HANDLER_PANICS,
    "event_handler_panics_total",
    "Event handler panics caught during delivery, per namespace",
    ["namespace"]
);
define_gauge_vec!(
    REGISTERED_HANDLERS,
    "registered_event_handlers",
    "Currently registered event handlers, per namespace",
    ["namespace"]
);

// ============================================================================
// Safe metric registration helpers
// ============================================================================
//
// These functions register metrics to a custom registry and handle errors
// gracefully by returning fallback metrics instead of panicking.

/// Register an IntGauge safely, returning a fallback on error.
fn register_int_gauge_safe(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("metric name/help should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGauge metric, using unregistered fallback");
            gauge
        }
    }
}

/// Register an IntGaugeVec safely, returning a fallback on error.
fn register_int_gauge_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntGaugeVec {
    let gauge = IntGaugeVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGaugeVec metric, using unregistered fallback");
            gauge
        }
    }
}

/// Register an IntCounterVec safely, returning a fallback on error.
fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter =
        IntCounterVec::new(opts!(name, help), labels).expect("metric opts should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

/// Register a HistogramVec safely, returning a fallback on error.
fn register_histogram_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
    buckets: Vec<f64>,
) -> HistogramVec {
    let histogram = HistogramVec::new(
        HistogramOpts::new(name, help).buckets(buckets.clone()),
        labels,
    )
    .expect("metric opts should be valid");
    match registry.register(Box::new(histogram.clone())) {
        Ok(()) => histogram,
        Err(e) => {
            warn!(name, error = %e, "Failed to register HistogramVec metric, using unregistered fallback");
            histogram
        }
    }
}

// ============================================================================
// Exposition
// ============================================================================

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Gather all metric families from the registry.
/// Used by an embedding health server to expose metrics.
pub fn gather_metrics() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

// ============================================================================
// Recording helpers
// ============================================================================

/// Record entering read-only mode.
pub fn enter_read_only() {
    READONLY_STATE.set(1);
    READONLY_TRANSITIONS.with_label_values(&["enter"]).inc();
}

/// Record exiting read-only mode.
///
/// # Arguments
/// * `duration_secs` - How long the cluster was read-only
/// * `exit_reason` - Why read-only mode cleared ("versions_aligned", "manual", "shutdown")
pub fn exit_read_only(duration_secs: f64, exit_reason: &str) {
    READONLY_STATE.set(0);
    READONLY_TRANSITIONS.with_label_values(&["exit"]).inc();
    READONLY_DURATION
        .with_label_values(&[exit_reason])
        .observe(duration_secs);
}

/// Update the connected-peer gauge.
pub fn set_connected_peers(count: i64) {
    CONNECTED_PEERS.set(count);
}

/// Record a membership command submission outcome.
pub fn record_membership_command(command: &str, status: &str) {
    MEMBERSHIP_COMMANDS
        .with_label_values(&[command, status])
        .inc();
}

/// Record a peer handshake outcome.
pub fn record_handshake(status: &str, duration_secs: f64) {
    HANDSHAKES.with_label_values(&[status]).inc();
    HANDSHAKE_DURATION
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Record an event accepted for dispatch.
pub fn record_event_dispatched(namespace: &str) {
    EVENTS_DISPATCHED.with_label_values(&[namespace]).inc();
}

/// Record a handler panic caught during delivery.
pub fn record_handler_panic(namespace: &str) {
    HANDLER_PANICS.with_label_values(&[namespace]).inc();
}

/// Update the registered-handler gauge for a namespace.
pub fn set_registered_handlers(namespace: &str, count: i64) {
    REGISTERED_HANDLERS.with_label_values(&[namespace]).set(count);
}
