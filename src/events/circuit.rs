//! Circuit lifecycle events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;

/// Namespace constant for circuit events.
pub const CIRCUIT_EVENT_NS: &str = "fabric.circuits";

/// Legal circuit event subtypes.
pub const CIRCUIT_EVENT_TYPES: &[&str] = &["created", "pathUpdated", "deleted", "failed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitEventType {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "pathUpdated")]
    PathUpdated,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "failed")]
    Failed,
}

impl CircuitEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitEventType::Created => "created",
            CircuitEventType::PathUpdated => "pathUpdated",
            CircuitEventType::Deleted => "deleted",
            CircuitEventType::Failed => "failed",
        }
    }
}

/// An end-to-end circuit transition.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: CircuitEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub circuit_id: String,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminator_id: Option<String>,
    /// Router ids along the established path, ingress first.
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timespan_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_cause: Option<String>,
}

impl CircuitEvent {
    pub fn new(
        event_type: CircuitEventType,
        event_src_id: impl Into<String>,
        circuit_id: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: CIRCUIT_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            circuit_id: circuit_id.into(),
            service_id: service_id.into(),
            client_id: None,
            terminator_id: None,
            path: Vec::new(),
            creation_timespan_ms: None,
            failure_cause: None,
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    pub fn with_failure_cause(mut self, cause: impl Into<String>) -> Self {
        self.failure_cause = Some(cause.into());
        self
    }
}

impl HasEventType for CircuitEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_event_wire_shape() {
        let event = CircuitEvent::new(CircuitEventType::Failed, "ctrl1", "c1", "svc1")
            .with_failure_cause("no terminators available");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["namespace"], "fabric.circuits");
        assert_eq!(value["eventType"], "failed");
        assert_eq!(value["failure_cause"], "no terminators available");
        assert!(value.get("terminator_id").is_none());
    }
}
