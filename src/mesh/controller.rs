//! The mesh: membership controller and consistency monitor.
//!
//! One [`Mesh`] per controller process. The transport layer reports peer
//! lifecycle via [`peer_connected`](Mesh::peer_connected) /
//! [`peer_disconnected`](Mesh::peer_disconnected); the administrative layer
//! submits topology changes via [`join`](Mesh::join),
//! [`handle_remove_peer`](Mesh::handle_remove_peer), and
//! [`handle_transfer_leadership`](Mesh::handle_transfer_leadership); everyone
//! else reads [`is_read_only`](Mesh::is_read_only).
//!
//! # Consistency discipline
//!
//! Membership mutation and the read-only recompute run under one transition
//! lock, so the derived flag always reflects a consistent peer set and each
//! flip emits exactly one cluster event. The flag itself stays an atomic so
//! `is_read_only` never takes the lock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{EventDispatcher, PeerSummary};
use crate::metrics;
use crate::version::{BuildVersionProvider, VersionProvider};

use super::config::MeshConfig;
use super::consensus::{ConsensusLog, MembershipCommand};
use super::emitter::ClusterEventEmitter;
use super::error::{MeshError, MeshResult};
use super::handshake::{Handshaker, PeerInfo};
use super::peer::{Peer, PeerKind, PeerRegistry};
use super::state::ReadOnlyState;

/// Read-only projection of one cluster member for administrative listing.
#[derive(Debug, Clone, Serialize)]
pub struct MemberInfo {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub voter: bool,
    pub leader: bool,
    pub connected: bool,
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

/// Request to admit a peer to the cluster.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub address: String,
    /// Candidate's stable id. When empty, it is learned via the identity
    /// handshake before the command is submitted.
    pub id: String,
    pub is_voter: bool,
}

/// Request to remove a cluster member.
#[derive(Debug, Clone)]
pub struct RemovePeerRequest {
    pub id: String,
}

/// Request to hand leadership to another voter.
#[derive(Debug, Clone)]
pub struct TransferLeadershipRequest {
    pub new_leader_id: String,
}

/// Builder for [`Mesh`].
pub struct MeshBuilder {
    config: MeshConfig,
    version: Option<Arc<dyn VersionProvider>>,
    consensus: Option<Arc<dyn ConsensusLog>>,
    handshaker: Option<Arc<dyn Handshaker>>,
    dispatcher: Option<Arc<EventDispatcher>>,
}

impl MeshBuilder {
    pub fn version_provider(mut self, version: Arc<dyn VersionProvider>) -> Self {
        self.version = Some(version);
        self
    }

    /// Attach the consensus log. Without one, administrative operations fail
    /// with [`MeshError::NotClustered`].
    pub fn consensus(mut self, consensus: Arc<dyn ConsensusLog>) -> Self {
        self.consensus = Some(consensus);
        self
    }

    pub fn handshaker(mut self, handshaker: Arc<dyn Handshaker>) -> Self {
        self.handshaker = Some(handshaker);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// # Panics
    ///
    /// Panics if no dispatcher was supplied.
    pub fn build(self) -> Mesh {
        let dispatcher = self
            .dispatcher
            .expect("an EventDispatcher is required to build a Mesh");
        let version = self
            .version
            .unwrap_or_else(|| Arc::new(BuildVersionProvider::new()));
        let emitter = ClusterEventEmitter::new(
            self.config.node_id.clone(),
            self.config.advertise_address.clone(),
            dispatcher,
        );

        Mesh {
            config: self.config,
            version,
            registry: PeerRegistry::new(),
            state: ReadOnlyState::new(),
            consensus: self.consensus,
            handshaker: self.handshaker,
            emitter,
            transition_lock: Mutex::new(()),
        }
    }
}

/// The cluster-membership and consistency-safety subsystem of one controller.
pub struct Mesh {
    config: MeshConfig,
    version: Arc<dyn VersionProvider>,
    registry: PeerRegistry,
    state: ReadOnlyState,
    consensus: Option<Arc<dyn ConsensusLog>>,
    handshaker: Option<Arc<dyn Handshaker>>,
    emitter: ClusterEventEmitter,
    transition_lock: Mutex<()>,
}

impl Mesh {
    pub fn builder(config: MeshConfig) -> MeshBuilder {
        MeshBuilder {
            config,
            version: None,
            consensus: None,
            handshaker: None,
            dispatcher: None,
        }
    }

    /// This node's id.
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// The connected-peer registry.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    // ========================================================================
    // Peer lifecycle
    // ========================================================================

    /// Record a peer as connected.
    ///
    /// Reconnects with the same id overwrite the existing record, whatever
    /// `is_new` claims; the flag only feeds logging. Recomputes the read-only
    /// flag and emits `peer.connected` (plus a transport connect event for
    /// router-backed peers).
    pub fn peer_connected(&self, peer: Peer, is_new: bool) -> MeshResult<()> {
        let _guard = self.transition_lock.lock().expect("transition lock poisoned");

        let replaced = self.registry.upsert(peer.clone());
        if replaced.is_some() && is_new {
            debug!(peer_id = %peer.id, "new peer replaced an existing record");
        }
        info!(
            peer_id = %peer.id,
            address = %peer.address,
            version = %peer.version.version,
            "peer connected"
        );

        self.recompute_state_locked();
        self.emitter.peer_connected(&peer);
        if peer.kind == PeerKind::Router {
            self.emitter.peer_transport_connected(&peer);
        }
        Ok(())
    }

    /// Record a peer as disconnected.
    ///
    /// Recomputes the read-only flag and emits `peer.disconnected` for peers
    /// that were actually present.
    pub fn peer_disconnected(&self, peer: &Peer) {
        let _guard = self.transition_lock.lock().expect("transition lock poisoned");

        match self.registry.remove(&peer.id) {
            Some(removed) => {
                info!(peer_id = %removed.id, "peer disconnected");
                self.recompute_state_locked();
                self.emitter.peer_disconnected(peer);
            }
            None => {
                warn!(peer_id = %peer.id, "disconnect for unknown peer ignored");
                self.recompute_state_locked();
            }
        }
    }

    /// Recompute the cluster-wide read-only flag from the current peer set.
    ///
    /// Edge-triggered: repeated calls with no membership change emit nothing.
    pub fn update_cluster_state(&self) {
        let _guard = self.transition_lock.lock().expect("transition lock poisoned");
        self.recompute_state_locked();
    }

    fn recompute_state_locked(&self) {
        let mismatch = self
            .registry
            .any_version_mismatch(self.version.comparison_key());

        if self.state.transition_to(mismatch, "versions_aligned") {
            if mismatch {
                warn!("peer version mismatch detected, cluster entering read-only mode");
                self.emitter.read_only();
            } else {
                info!("peer versions aligned, cluster returning to read-write mode");
                self.emitter.read_write();
            }
        }
    }

    /// Whether the cluster currently rejects mutating operations.
    ///
    /// Lock-free; intended for per-request gating on write paths.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.state.is_read_only()
    }

    // ========================================================================
    // Administrative surface
    // ========================================================================

    /// List the cluster members as seen locally.
    ///
    /// Purely derived from the consensus configuration and the peer registry;
    /// no consensus round is performed.
    pub fn list_members(&self) -> MeshResult<Vec<MemberInfo>> {
        let consensus = self.consensus.as_ref().ok_or(MeshError::NotClustered)?;
        let leader_id = consensus.leader_id();
        let read_only = self.is_read_only();

        let members = consensus
            .members()
            .into_iter()
            .map(|member| {
                let is_self = member.id == self.config.node_id;
                let connected_peer = self.registry.get(&member.id);
                let version = if is_self {
                    Some(self.version.version().version.clone())
                } else {
                    connected_peer.as_ref().map(|p| p.version.version.clone())
                };
                MemberInfo {
                    leader: leader_id.as_deref() == Some(member.id.as_str()),
                    connected: is_self || connected_peer.is_some(),
                    version,
                    voter: member.voter,
                    id: member.id,
                    address: member.address,
                    read_only,
                }
            })
            .collect();
        Ok(members)
    }

    /// Handshake with a candidate address to learn its stable identity.
    ///
    /// Blocks up to `timeout`, never longer.
    pub async fn get_peer_info(&self, address: &str, timeout: Duration) -> MeshResult<PeerInfo> {
        let handshaker = self.handshaker.as_ref().ok_or(MeshError::NotClustered)?;
        let start = Instant::now();

        match tokio::time::timeout(timeout, handshaker.hello(address)).await {
            Ok(Ok(info)) => {
                metrics::record_handshake("ok", start.elapsed().as_secs_f64());
                debug!(address, peer_id = %info.id, "handshake resolved candidate identity");
                Ok(info)
            }
            Ok(Err(err)) => {
                metrics::record_handshake("error", start.elapsed().as_secs_f64());
                Err(err)
            }
            Err(_) => {
                metrics::record_handshake("timeout", start.elapsed().as_secs_f64());
                Err(MeshError::HandshakeTimeout {
                    address: address.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Submit an add-peer command to the consensus log.
    ///
    /// Rejected immediately, with nothing appended, when this node is not the
    /// leader; this implementation does not forward. When the request carries
    /// no id, the candidate is handshaked first to learn it. Success means
    /// local acceptance; the membership change becomes visible through the
    /// connect path and its events once committed.
    pub async fn join(&self, request: JoinRequest) -> MeshResult<()> {
        let consensus = self.consensus.as_ref().ok_or(MeshError::NotClustered)?;

        if !consensus.is_leader() {
            metrics::record_membership_command("add-peer", "rejected");
            return Err(MeshError::NotLeader(consensus.leader_id()));
        }

        let id = if request.id.is_empty() {
            self.get_peer_info(&request.address, self.config.handshake_timeout)
                .await?
                .id
        } else {
            request.id
        };

        let command = MembershipCommand::AddPeer {
            id: id.clone(),
            address: request.address.clone(),
            voter: request.is_voter,
        };
        match consensus.append_membership_change(command).await {
            Ok(index) => {
                metrics::record_membership_command("add-peer", "ok");
                info!(
                    peer_id = %id,
                    address = %request.address,
                    voter = request.is_voter,
                    index,
                    "add-peer command accepted"
                );
                Ok(())
            }
            Err(err) => {
                metrics::record_membership_command("add-peer", "error");
                Err(err)
            }
        }
    }

    /// Submit a remove-peer command to the consensus log.
    ///
    /// Failures (unknown id, log append failure) surface unchanged.
    pub async fn handle_remove_peer(&self, request: RemovePeerRequest) -> MeshResult<()> {
        let consensus = self.consensus.as_ref().ok_or(MeshError::NotClustered)?;

        let command = MembershipCommand::RemovePeer {
            id: request.id.clone(),
        };
        match consensus.append_membership_change(command).await {
            Ok(index) => {
                metrics::record_membership_command("remove-peer", "ok");
                info!(peer_id = %request.id, index, "remove-peer command accepted");
                Ok(())
            }
            Err(err) => {
                metrics::record_membership_command("remove-peer", "error");
                Err(err)
            }
        }
    }

    /// Request a leadership handoff.
    ///
    /// The target must be a known voting member; consensus-side failures are
    /// reported as [`MeshError::TransferLeadership`].
    pub async fn handle_transfer_leadership(
        &self,
        request: TransferLeadershipRequest,
    ) -> MeshResult<()> {
        let consensus = self.consensus.as_ref().ok_or(MeshError::NotClustered)?;
        let target = request.new_leader_id;

        match consensus.members().iter().find(|m| m.id == target) {
            None => {
                metrics::record_membership_command("transfer-leadership", "rejected");
                return Err(MeshError::PeerNotFound { id: target });
            }
            Some(member) if !member.voter => {
                metrics::record_membership_command("transfer-leadership", "rejected");
                return Err(MeshError::NotVoter { id: target });
            }
            Some(_) => {}
        }

        match consensus.transfer_leadership(&target).await {
            Ok(()) => {
                metrics::record_membership_command("transfer-leadership", "ok");
                info!(new_leader = %target, "leadership transfer requested");
                Ok(())
            }
            Err(err) => {
                metrics::record_membership_command("transfer-leadership", "error");
                Err(MeshError::TransferLeadership {
                    target,
                    reason: err.to_string(),
                })
            }
        }
    }

    // ========================================================================
    // Consensus-side notifications
    // ========================================================================

    /// Called by consensus glue when this node gains or loses leadership.
    pub fn handle_leadership_change(&self, is_leader: bool, index: Option<u64>) {
        if is_leader {
            info!("this node gained cluster leadership");
            self.emitter.leadership_gained(index);
        } else {
            info!("this node lost cluster leadership");
            self.emitter.leadership_lost(index);
        }
    }

    /// Called by consensus glue when the known leader changes.
    pub fn handle_leader_presence(&self, leader_id: Option<&str>) {
        self.emitter.leader_changed(leader_id);
    }

    /// Called by consensus glue after a membership change commits.
    pub fn handle_members_changed(&self, index: u64) -> MeshResult<()> {
        let consensus = self.consensus.as_ref().ok_or(MeshError::NotClustered)?;
        let peers = consensus
            .members()
            .into_iter()
            .map(|member| {
                let version = if member.id == self.config.node_id {
                    self.version.version().version.clone()
                } else {
                    self.registry
                        .get(&member.id)
                        .map(|p| p.version.version.clone())
                        .unwrap_or_default()
                };
                PeerSummary {
                    id: member.id,
                    addr: member.address,
                    version,
                    api_addresses: None,
                }
            })
            .collect();
        self.emitter.members_changed(index, peers);
        Ok(())
    }
}
