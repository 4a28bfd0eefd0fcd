//! Router and link events from the transport fabric.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;

/// Namespace constant for router events.
pub const ROUTER_EVENT_NS: &str = "fabric.routers";

/// Legal router event subtypes.
pub const ROUTER_EVENT_TYPES: &[&str] = &["router-online", "router-offline"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouterEventType {
    #[serde(rename = "router-online")]
    Online,
    #[serde(rename = "router-offline")]
    Offline,
}

impl RouterEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouterEventType::Online => "router-online",
            RouterEventType::Offline => "router-offline",
        }
    }
}

/// A router presence transition.
#[derive(Debug, Clone, Serialize)]
pub struct RouterEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: RouterEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub router_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_address: Option<String>,
}

impl RouterEvent {
    pub fn new(
        event_type: RouterEventType,
        event_src_id: impl Into<String>,
        router_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: ROUTER_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            router_id: router_id.into(),
            router_name: None,
            version: None,
            listener_address: None,
        }
    }
}

impl HasEventType for RouterEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

/// Namespace constant for link events.
pub const LINK_EVENT_NS: &str = "fabric.links";

/// Legal link event subtypes.
pub const LINK_EVENT_TYPES: &[&str] = &["dialed", "connected", "fault", "duplicate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkEventType {
    Dialed,
    Connected,
    Fault,
    Duplicate,
}

impl LinkEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkEventType::Dialed => "dialed",
            LinkEventType::Connected => "connected",
            LinkEventType::Fault => "fault",
            LinkEventType::Duplicate => "duplicate",
        }
    }
}

/// A router-to-router link lifecycle transition.
#[derive(Debug, Clone, Serialize)]
pub struct LinkEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: LinkEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub link_id: String,
    pub src_router_id: String,
    pub dst_router_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<i32>,
}

impl LinkEvent {
    pub fn new(
        event_type: LinkEventType,
        event_src_id: impl Into<String>,
        link_id: impl Into<String>,
        src_router_id: impl Into<String>,
        dst_router_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: LINK_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            link_id: link_id.into(),
            src_router_id: src_router_id.into(),
            dst_router_id: dst_router_id.into(),
            protocol: None,
            cost: None,
        }
    }
}

impl HasEventType for LinkEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}
