//! Cluster membership and safety-mode events.
//!
//! Emitted by the mesh whenever peer membership, leadership, or the
//! cluster-wide read-only flag changes. These are the primary signal that an
//! administrative command actually committed: the command submission call
//! returns when the consensus log accepts the command locally, while the
//! resulting `peer.connected` / `members.changed` events mark visibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::HasEventType;

/// Namespace constant for cluster events.
pub const CLUSTER_EVENT_NS: &str = "cluster";

/// Legal cluster event subtypes, used to validate `include` registrations.
pub const CLUSTER_EVENT_TYPES: &[&str] = &[
    "peer.connected",
    "peer.disconnected",
    "members.changed",
    "leadership.gained",
    "leadership.lost",
    "state.has_leader",
    "state.is_leaderless",
    "state.ro",
    "state.rw",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterEventType {
    #[serde(rename = "peer.connected")]
    PeerConnected,
    #[serde(rename = "peer.disconnected")]
    PeerDisconnected,
    #[serde(rename = "members.changed")]
    MembersChanged,
    #[serde(rename = "leadership.gained")]
    LeadershipGained,
    #[serde(rename = "leadership.lost")]
    LeadershipLost,
    #[serde(rename = "state.has_leader")]
    HasLeader,
    #[serde(rename = "state.is_leaderless")]
    IsLeaderless,
    #[serde(rename = "state.ro")]
    ReadOnly,
    #[serde(rename = "state.rw")]
    ReadWrite,
}

impl ClusterEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterEventType::PeerConnected => "peer.connected",
            ClusterEventType::PeerDisconnected => "peer.disconnected",
            ClusterEventType::MembersChanged => "members.changed",
            ClusterEventType::LeadershipGained => "leadership.gained",
            ClusterEventType::LeadershipLost => "leadership.lost",
            ClusterEventType::HasLeader => "state.has_leader",
            ClusterEventType::IsLeaderless => "state.is_leaderless",
            ClusterEventType::ReadOnly => "state.ro",
            ClusterEventType::ReadWrite => "state.rw",
        }
    }
}

impl std::fmt::Display for ClusterEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection of one peer carried inside cluster events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub id: String,
    pub addr: String,
    pub version: String,
    #[serde(rename = "apiAddresses", skip_serializing_if = "Option::is_none")]
    pub api_addresses: Option<Vec<String>>,
}

/// A cluster membership / safety-mode transition.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterEvent {
    pub namespace: &'static str,
    #[serde(rename = "eventType")]
    pub event_type: ClusterEventType,
    pub event_src_id: String,
    pub timestamp: DateTime<Utc>,
    /// Consensus log index associated with the transition, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    /// Member list after the transition, for `members.changed` and peer events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<PeerSummary>>,
    #[serde(rename = "leaderId", skip_serializing_if = "Option::is_none")]
    pub leader_id: Option<String>,
}

impl ClusterEvent {
    pub fn new(event_type: ClusterEventType, event_src_id: impl Into<String>) -> Self {
        Self {
            namespace: CLUSTER_EVENT_NS,
            event_type,
            event_src_id: event_src_id.into(),
            timestamp: Utc::now(),
            index: None,
            peers: None,
            leader_id: None,
        }
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_peers(mut self, peers: Vec<PeerSummary>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_leader_id(mut self, leader_id: impl Into<String>) -> Self {
        self.leader_id = Some(leader_id.into());
        self
    }
}

impl HasEventType for ClusterEvent {
    fn event_type_str(&self) -> &str {
        self.event_type.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = ClusterEvent::new(ClusterEventType::PeerConnected, "ctrl1")
            .with_peers(vec![PeerSummary {
                id: "ctrl2".to_string(),
                addr: "tls:10.0.0.2:6262".to_string(),
                version: "1.2.0".to_string(),
                api_addresses: None,
            }])
            .with_leader_id("ctrl1");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["namespace"], "cluster");
        assert_eq!(value["eventType"], "peer.connected");
        assert_eq!(value["event_src_id"], "ctrl1");
        assert_eq!(value["leaderId"], "ctrl1");
        assert_eq!(value["peers"][0]["id"], "ctrl2");
        // Unset optionals are omitted entirely.
        assert!(value.get("index").is_none());
    }

    #[test]
    fn test_every_subtype_is_in_legal_set() {
        let all = [
            ClusterEventType::PeerConnected,
            ClusterEventType::PeerDisconnected,
            ClusterEventType::MembersChanged,
            ClusterEventType::LeadershipGained,
            ClusterEventType::LeadershipLost,
            ClusterEventType::HasLeader,
            ClusterEventType::IsLeaderless,
            ClusterEventType::ReadOnly,
            ClusterEventType::ReadWrite,
        ];
        for event_type in all {
            assert!(CLUSTER_EVENT_TYPES.contains(&event_type.as_str()));
        }
        assert_eq!(CLUSTER_EVENT_TYPES.len(), all.len());
    }
}
