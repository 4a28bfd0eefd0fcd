//! Cluster event construction.
//!
//! Watches mesh state transitions and turns them into typed [`ClusterEvent`]s
//! (and, for router-backed peers, [`ConnectEvent`]s) on the dispatcher.

use std::sync::Arc;

use crate::events::{
    ClusterEvent, ClusterEventType, ConnectEvent, ConnectSource, EventDispatcher, PeerSummary,
};

use super::peer::Peer;

/// Builds and dispatches cluster events for one node's mesh.
pub struct ClusterEventEmitter {
    node_id: String,
    local_address: String,
    dispatcher: Arc<EventDispatcher>,
}

impl ClusterEventEmitter {
    pub fn new(
        node_id: impl Into<String>,
        local_address: impl Into<String>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            local_address: local_address.into(),
            dispatcher,
        }
    }

    fn summarize(peer: &Peer) -> PeerSummary {
        PeerSummary {
            id: peer.id.clone(),
            addr: peer.address.clone(),
            version: peer.version.version.clone(),
            api_addresses: if peer.api_addresses.is_empty() {
                None
            } else {
                Some(peer.api_addresses.clone())
            },
        }
    }

    pub fn peer_connected(&self, peer: &Peer) {
        let event = ClusterEvent::new(ClusterEventType::PeerConnected, self.node_id.clone())
            .with_peers(vec![Self::summarize(peer)]);
        self.dispatcher.accept_cluster_event(event);
    }

    pub fn peer_disconnected(&self, peer: &Peer) {
        let event = ClusterEvent::new(ClusterEventType::PeerDisconnected, self.node_id.clone())
            .with_peers(vec![Self::summarize(peer)]);
        self.dispatcher.accept_cluster_event(event);
    }

    /// Transport-level connect notification for a router-backed peer.
    pub fn peer_transport_connected(&self, peer: &Peer) {
        let src_addr = peer
            .remote_address
            .clone()
            .unwrap_or_else(|| peer.address.clone());
        let event = ConnectEvent::new(
            ConnectSource::Router,
            self.node_id.clone(),
            peer.id.clone(),
            src_addr,
            self.local_address.clone(),
        );
        self.dispatcher.accept_connect_event(event);
    }

    pub fn read_only(&self) {
        self.dispatcher
            .accept_cluster_event(ClusterEvent::new(
                ClusterEventType::ReadOnly,
                self.node_id.clone(),
            ));
    }

    pub fn read_write(&self) {
        self.dispatcher
            .accept_cluster_event(ClusterEvent::new(
                ClusterEventType::ReadWrite,
                self.node_id.clone(),
            ));
    }

    pub fn leadership_gained(&self, index: Option<u64>) {
        let mut event = ClusterEvent::new(ClusterEventType::LeadershipGained, self.node_id.clone())
            .with_leader_id(self.node_id.clone());
        event.index = index;
        self.dispatcher.accept_cluster_event(event);
    }

    pub fn leadership_lost(&self, index: Option<u64>) {
        let mut event = ClusterEvent::new(ClusterEventType::LeadershipLost, self.node_id.clone());
        event.index = index;
        self.dispatcher.accept_cluster_event(event);
    }

    /// Leader presence change: a known leader id emits `state.has_leader`,
    /// none emits `state.is_leaderless`.
    pub fn leader_changed(&self, leader_id: Option<&str>) {
        let event = match leader_id {
            Some(leader_id) => {
                ClusterEvent::new(ClusterEventType::HasLeader, self.node_id.clone())
                    .with_leader_id(leader_id)
            }
            None => ClusterEvent::new(ClusterEventType::IsLeaderless, self.node_id.clone()),
        };
        self.dispatcher.accept_cluster_event(event);
    }

    pub fn members_changed(&self, index: u64, peers: Vec<PeerSummary>) {
        let event = ClusterEvent::new(ClusterEventType::MembersChanged, self.node_id.clone())
            .with_index(index)
            .with_peers(peers);
        self.dispatcher.accept_cluster_event(event);
    }
}
