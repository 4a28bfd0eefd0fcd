//! Typed, multi-category event dispatch.
//!
//! Low-level state transitions (peer connect/disconnect, entity
//! create/update/delete, metrics polls) become typed events fanned out to
//! registered observers. Each of the ~13 categories is independent: its own
//! handler list, its own filtering, its own concurrent-safe mutation.
//!
//! # Architecture
//!
//! ```text
//!  mesh transitions ──┐
//!  storage callbacks ─┼──▶ adapters ──▶ EventDispatcher ──▶ handlers
//!  metrics polls ─────┘                  (per-category      (telemetry,
//!                                         fan-out)           audit, sinks)
//! ```
//!
//! Producers call the `accept_*` methods and never block on consumers.
//! Consumers implement [`EventHandler`] for the event types they care about
//! and attach via the typed `add_*` methods, or implement
//! [`HandlerCapabilities`] and go through the dynamic `register_*` surface
//! with a configuration mapping.

mod circuit;
mod cluster;
mod connect;
mod dispatcher;
mod entity;
mod fabric;
mod filter;
mod handler;
mod metrics;
mod service;
mod session;
mod terminator;
mod usage;

use thiserror::Error;

pub use circuit::{CIRCUIT_EVENT_NS, CIRCUIT_EVENT_TYPES, CircuitEvent, CircuitEventType};
pub use cluster::{
    CLUSTER_EVENT_NS, CLUSTER_EVENT_TYPES, ClusterEvent, ClusterEventType, PeerSummary,
};
pub use connect::{CONNECT_EVENT_NS, CONNECT_EVENT_TYPES, ConnectEvent, ConnectSource};
pub use dispatcher::{EventDispatcher, HandlerCapabilities};
pub use entity::{
    ENTITY_CHANGE_EVENT_NS, ENTITY_CHANGE_EVENT_TYPES, EntityChangeEvent, EntityChangeEventType,
    TerminatorEntityChangeAdapter,
};
pub use fabric::{
    LINK_EVENT_NS, LINK_EVENT_TYPES, LinkEvent, LinkEventType, ROUTER_EVENT_NS,
    ROUTER_EVENT_TYPES, RouterEvent, RouterEventType,
};
pub use filter::{HandlerConfig, HasEventType, IncludeFilter};
pub use handler::{EventHandler, HandlerList};
pub use metrics::{
    METRICS_EVENT_NS, MetricsAdapter, MetricsEvent, MetricsKeyFilter, extract_id,
};
pub use service::{SERVICE_EVENT_NS, SERVICE_EVENT_TYPES, ServiceEvent, ServiceEventType};
pub use session::{
    API_SESSION_EVENT_NS, API_SESSION_EVENT_TYPES, ApiSessionEvent, ApiSessionEventType,
    SDK_EVENT_NS, SDK_EVENT_TYPES, SdkEvent, SdkEventType,
};
pub use terminator::{
    PropagationFilter, TERMINATOR_EVENT_NS, TERMINATOR_EVENT_TYPES, TerminatorEvent,
    TerminatorEventType,
};
pub use usage::{
    USAGE_EVENT_NS, USAGE_EVENT_TYPES, UsageEvent, UsageEventType, UsageEventV3, UsageKeyFilter,
};

/// Errors surfaced synchronously at handler registration time.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The registered value does not support the category's handler
    /// capability.
    #[error("handler type does not implement the required capability {required}")]
    CapabilityMismatch { required: &'static str },

    /// An `include` value is outside the category's legal subtype enumeration.
    #[error("invalid include value {value:?}: must be one of {legal:?}")]
    InvalidInclude {
        value: String,
        legal: &'static [&'static str],
    },

    /// A recognized option carried a value of the wrong shape.
    #[error("invalid {key} option: {detail}")]
    InvalidOption { key: &'static str, detail: String },

    /// The `version` option selected a usage schema that does not exist.
    #[error("unsupported usage event version {version}: must be 2 or 3")]
    UnsupportedVersion { version: i64 },
}
