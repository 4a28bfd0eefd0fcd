//! Service dial outcome events.
//!
//! Aggregated per interval by the routing layer: one event per
//! (service, terminator, outcome) bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;

/// Namespace constant for service events.
pub const SERVICE_EVENT_NS: &str = "services";

/// Legal service event subtypes.
pub const SERVICE_EVENT_TYPES: &[&str] = &[
    "dial.success",
    "dial.fail",
    "dial.timeout",
    "dial.error_other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceEventType {
    #[serde(rename = "dial.success")]
    DialSuccess,
    #[serde(rename = "dial.fail")]
    DialFail,
    #[serde(rename = "dial.timeout")]
    DialTimeout,
    #[serde(rename = "dial.error_other")]
    DialErrorOther,
}

impl ServiceEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceEventType::DialSuccess => "dial.success",
            ServiceEventType::DialFail => "dial.fail",
            ServiceEventType::DialTimeout => "dial.timeout",
            ServiceEventType::DialErrorOther => "dial.error_other",
        }
    }
}

/// An interval-aggregated service dial outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: ServiceEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminator_id: Option<String>,
    pub count: u64,
    pub interval_start: DateTime<Utc>,
    pub interval_length_secs: u64,
}

impl ServiceEvent {
    pub fn new(
        event_type: ServiceEventType,
        event_src_id: impl Into<String>,
        service_id: impl Into<String>,
        count: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            namespace: SERVICE_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: now,
            service_id: service_id.into(),
            terminator_id: None,
            count,
            interval_start: now,
            interval_length_secs: 60,
        }
    }
}

impl HasEventType for ServiceEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}
