//! API session and SDK presence events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;

/// Namespace constant for API session events.
pub const API_SESSION_EVENT_NS: &str = "edge.apiSessions";

/// Legal API session event subtypes.
pub const API_SESSION_EVENT_TYPES: &[&str] = &["created", "deleted", "refreshed", "exchanged"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSessionEventType {
    Created,
    Deleted,
    Refreshed,
    Exchanged,
}

impl ApiSessionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiSessionEventType::Created => "created",
            ApiSessionEventType::Deleted => "deleted",
            ApiSessionEventType::Refreshed => "refreshed",
            ApiSessionEventType::Exchanged => "exchanged",
        }
    }
}

/// An API session lifecycle transition.
#[derive(Debug, Clone, Serialize)]
pub struct ApiSessionEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: ApiSessionEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub id: String,
    pub identity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl ApiSessionEvent {
    pub fn new(
        event_type: ApiSessionEventType,
        event_src_id: impl Into<String>,
        id: impl Into<String>,
        identity_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: API_SESSION_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            id: id.into(),
            identity_id: identity_id.into(),
            ip_address: None,
        }
    }
}

impl HasEventType for ApiSessionEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

/// Namespace constant for SDK events.
pub const SDK_EVENT_NS: &str = "sdk";

/// Legal SDK event subtypes.
pub const SDK_EVENT_TYPES: &[&str] = &["sdk-online", "sdk-offline", "sdk-status-unknown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SdkEventType {
    #[serde(rename = "sdk-online")]
    Online,
    #[serde(rename = "sdk-offline")]
    Offline,
    #[serde(rename = "sdk-status-unknown")]
    StatusUnknown,
}

impl SdkEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkEventType::Online => "sdk-online",
            SdkEventType::Offline => "sdk-offline",
            SdkEventType::StatusUnknown => "sdk-status-unknown",
        }
    }
}

/// An SDK endpoint presence transition.
#[derive(Debug, Clone, Serialize)]
pub struct SdkEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: SdkEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub identity_id: String,
}

impl SdkEvent {
    pub fn new(
        event_type: SdkEventType,
        event_src_id: impl Into<String>,
        identity_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: SDK_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            identity_id: identity_id.into(),
        }
    }
}

impl HasEventType for SdkEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_session_event_wire_shape() {
        let event = ApiSessionEvent::new(ApiSessionEventType::Created, "ctrl1", "s1", "id1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["namespace"], "edge.apiSessions");
        assert_eq!(value["eventType"], "created");
    }

    #[test]
    fn test_sdk_event_subtypes_match_legal_set() {
        for event_type in [
            SdkEventType::Online,
            SdkEventType::Offline,
            SdkEventType::StatusUnknown,
        ] {
            assert!(SDK_EVENT_TYPES.contains(&event_type.as_str()));
        }
    }
}
