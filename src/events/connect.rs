//! Transport-level connection events.
//!
//! Emitted when a router, controller peer, or identity establishes a
//! connection to this node, carrying the raw address pair.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::filter::HasEventType;

/// Namespace constant for connect events.
pub const CONNECT_EVENT_NS: &str = "fabric.connect";

/// Legal connect event source kinds.
pub const CONNECT_EVENT_TYPES: &[&str] = &["router", "peer", "identity"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectSource {
    Router,
    Peer,
    Identity,
}

impl ConnectSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectSource::Router => "router",
            ConnectSource::Peer => "peer",
            ConnectSource::Identity => "identity",
        }
    }
}

/// A transport-level connection established with this node.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectEvent {
    pub namespace: &'static str,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    pub src_type: ConnectSource,
    /// Identity of the connecting component (router id, peer id, identity id).
    pub id: String,
    pub src_addr: String,
    pub dst_addr: String,
}

impl ConnectEvent {
    pub fn new(
        src_type: ConnectSource,
        event_src_id: impl Into<String>,
        id: impl Into<String>,
        src_addr: impl Into<String>,
        dst_addr: impl Into<String>,
    ) -> Self {
        Self {
            namespace: CONNECT_EVENT_NS,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            src_type,
            id: id.into(),
            src_addr: src_addr.into(),
            dst_addr: dst_addr.into(),
        }
    }
}

impl HasEventType for ConnectEvent {
    fn event_type_str(&self) -> &str {
        self.src_type.as_str()
    }
}
