//! The consensus-log seam.
//!
//! The replicated log (leader election, replication, snapshotting) is an
//! external collaborator. The mesh only needs to submit membership commands,
//! ask who leads, and read the voting configuration, so that surface is a
//! trait with an in-memory mock for tests
//! ([`MockConsensusLog`](super::MockConsensusLog)).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::MeshResult;

/// A membership change submitted to the consensus log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipCommand {
    /// Admit a peer to the cluster configuration.
    AddPeer {
        id: String,
        address: String,
        voter: bool,
    },
    /// Remove a peer from the cluster configuration.
    RemovePeer { id: String },
}

impl MembershipCommand {
    /// Command name used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            MembershipCommand::AddPeer { .. } => "add-peer",
            MembershipCommand::RemovePeer { .. } => "remove-peer",
        }
    }
}

/// One entry in the consensus log's cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMember {
    pub id: String,
    pub address: String,
    pub voter: bool,
}

/// Black-box view of the replicated consensus log.
///
/// `append_membership_change` and `transfer_leadership` block until the log
/// accepts or rejects the command locally, not until cluster-wide commit;
/// commit is observed asynchronously through membership state changes and the
/// cluster events they emit.
#[async_trait]
pub trait ConsensusLog: Send + Sync {
    /// This node's id in the consensus configuration.
    fn node_id(&self) -> String;

    /// Whether this node currently leads the cluster.
    fn is_leader(&self) -> bool;

    /// The current leader's id, if one is known.
    fn leader_id(&self) -> Option<String>;

    /// The current cluster configuration.
    fn members(&self) -> Vec<ConsensusMember>;

    /// Submit a membership change, returning the log index it was accepted
    /// at.
    async fn append_membership_change(&self, command: MembershipCommand) -> MeshResult<u64>;

    /// Request a leadership handoff to `new_leader_id`.
    async fn transfer_leadership(&self, new_leader_id: &str) -> MeshResult<()>;
}
