//! Terminator lifecycle events.
//!
//! Terminators (service endpoint bindings) change both through committed
//! leader-side operations and through follower-local model replication. The
//! replication copies are "model-only": every follower would re-announce the
//! same change, flooding subscribers with duplicates. Events therefore carry a
//! propagate indicator, and handlers registered without `propagateAlways` only
//! see events where it is set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;
use super::handler::EventHandler;

/// Namespace constant for terminator events.
pub const TERMINATOR_EVENT_NS: &str = "fabric.terminators";

/// Legal terminator event subtypes.
pub const TERMINATOR_EVENT_TYPES: &[&str] = &[
    "created",
    "updated",
    "deleted",
    "router-online",
    "router-offline",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminatorEventType {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "updated")]
    Updated,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "router-online")]
    RouterOnline,
    #[serde(rename = "router-offline")]
    RouterOffline,
}

impl TerminatorEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminatorEventType::Created => "created",
            TerminatorEventType::Updated => "updated",
            TerminatorEventType::Deleted => "deleted",
            TerminatorEventType::RouterOnline => "router-online",
            TerminatorEventType::RouterOffline => "router-offline",
        }
    }
}

/// A terminator lifecycle transition.
#[derive(Debug, Clone, Serialize)]
pub struct TerminatorEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: TerminatorEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub terminator_id: String,
    pub router_id: String,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// Set when the originating change should be announced cluster-wide.
    /// Unset for model-only replication noise.
    #[serde(rename = "propagateIndicator")]
    pub propagate_indicator: bool,
}

impl TerminatorEvent {
    pub fn new(
        event_type: TerminatorEventType,
        event_src_id: impl Into<String>,
        terminator_id: impl Into<String>,
        router_id: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: TERMINATOR_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            terminator_id: terminator_id.into(),
            router_id: router_id.into(),
            service_id: service_id.into(),
            host_id: None,
            propagate_indicator: false,
        }
    }

    pub fn with_propagate_indicator(mut self, propagate: bool) -> Self {
        self.propagate_indicator = propagate;
        self
    }
}

impl HasEventType for TerminatorEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

/// Decorator that drops model-only terminator events.
///
/// Applied by dynamic registration unless the `propagateAlways` option is set.
pub struct PropagationFilter {
    inner: Arc<dyn EventHandler<TerminatorEvent>>,
}

impl PropagationFilter {
    pub fn new(inner: Arc<dyn EventHandler<TerminatorEvent>>) -> Self {
        Self { inner }
    }
}

impl EventHandler<TerminatorEvent> for PropagationFilter {
    fn accept(&self, event: &TerminatorEvent) {
        if event.propagate_indicator {
            self.inner.accept(event);
        }
    }

    fn wraps(&self, candidate: &Arc<dyn EventHandler<TerminatorEvent>>) -> bool {
        Arc::ptr_eq(&self.inner, candidate) || self.inner.wraps(candidate)
    }
}
