//! In-memory consensus log for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use super::consensus::{ConsensusLog, ConsensusMember, MembershipCommand};
use super::error::{MeshError, MeshResult};

struct Inner {
    is_leader: bool,
    leader_id: Option<String>,
    members: Vec<ConsensusMember>,
    log: Vec<MembershipCommand>,
    next_index: u64,
    fail_next_append: Option<String>,
}

/// In-memory [`ConsensusLog`] with scriptable leadership and failure
/// injection.
///
/// Accepted membership commands are applied to the member list immediately,
/// standing in for cluster-wide commit, and recorded for assertion via
/// [`appended_commands`](Self::appended_commands).
pub struct MockConsensusLog {
    node_id: String,
    inner: Mutex<Inner>,
}

impl MockConsensusLog {
    /// Create a single-member cluster led by `node_id`.
    pub fn new(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Self {
            node_id: node_id.clone(),
            inner: Mutex::new(Inner {
                is_leader: true,
                leader_id: Some(node_id.clone()),
                members: vec![ConsensusMember {
                    id: node_id,
                    address: "tls:127.0.0.1:6262".to_string(),
                    voter: true,
                }],
                log: Vec::new(),
                next_index: 1,
                fail_next_append: None,
            }),
        }
    }

    /// Change whether this node believes it is the leader.
    pub fn set_leader(&self, is_leader: bool) {
        self.inner.lock().unwrap().is_leader = is_leader;
    }

    /// Change the known leader id.
    pub fn set_leader_id(&self, leader_id: Option<String>) {
        self.inner.lock().unwrap().leader_id = leader_id;
    }

    /// Add a member to the cluster configuration directly.
    pub fn add_member(&self, member: ConsensusMember) {
        self.inner.lock().unwrap().members.push(member);
    }

    /// Fail the next `append_membership_change` call with `reason`.
    pub fn fail_next_append(&self, reason: impl Into<String>) {
        self.inner.lock().unwrap().fail_next_append = Some(reason.into());
    }

    /// Commands accepted so far, in submission order.
    pub fn appended_commands(&self) -> Vec<MembershipCommand> {
        self.inner.lock().unwrap().log.clone()
    }
}

#[async_trait]
impl ConsensusLog for MockConsensusLog {
    fn node_id(&self) -> String {
        self.node_id.clone()
    }

    fn is_leader(&self) -> bool {
        self.inner.lock().unwrap().is_leader
    }

    fn leader_id(&self) -> Option<String> {
        self.inner.lock().unwrap().leader_id.clone()
    }

    fn members(&self) -> Vec<ConsensusMember> {
        self.inner.lock().unwrap().members.clone()
    }

    async fn append_membership_change(&self, command: MembershipCommand) -> MeshResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(reason) = inner.fail_next_append.take() {
            return Err(MeshError::Consensus(reason));
        }

        match &command {
            MembershipCommand::AddPeer { id, address, voter } => {
                inner.members.retain(|m| &m.id != id);
                inner.members.push(ConsensusMember {
                    id: id.clone(),
                    address: address.clone(),
                    voter: *voter,
                });
            }
            MembershipCommand::RemovePeer { id } => {
                if !inner.members.iter().any(|m| &m.id == id) {
                    return Err(MeshError::PeerNotFound { id: id.clone() });
                }
                inner.members.retain(|m| &m.id != id);
            }
        }

        inner.log.push(command);
        let index = inner.next_index;
        inner.next_index += 1;
        Ok(index)
    }

    async fn transfer_leadership(&self, new_leader_id: &str) -> MeshResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.members.iter().find(|m| m.id == new_leader_id) {
            None => Err(MeshError::PeerNotFound {
                id: new_leader_id.to_string(),
            }),
            Some(member) if !member.voter => Err(MeshError::NotVoter {
                id: new_leader_id.to_string(),
            }),
            Some(_) => {
                inner.leader_id = Some(new_leader_id.to_string());
                inner.is_leader = new_leader_id == self.node_id;
                Ok(())
            }
        }
    }
}
