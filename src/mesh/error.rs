//! Mesh membership and consistency errors.
//!
//! # Error Handling Patterns
//!
//! Administrative operations return synchronously with respect to
//! *submission*, not *effect*: a successful `join` means the consensus log
//! accepted the command locally, and the resulting membership change becomes
//! visible later through cluster events. Submission failures surface here
//! unchanged so the administrative layer can map them into user-facing field
//! errors via [`MeshError::to_api_error`].

use std::time::Duration;

use thiserror::Error;

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors from the mesh membership and consistency layer.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Administrative operation invoked against a non-clustered deployment.
    #[error("this controller is not running in clustered mode")]
    NotClustered,

    /// Command submission requires the local node to be the consensus leader.
    /// No log entry was appended; the caller may retry against the leader.
    #[error("not the cluster leader{}", leader_suffix(.0))]
    NotLeader(Option<String>),

    /// No member with the given id exists in the consensus configuration.
    #[error("no cluster member with id {id}")]
    PeerNotFound { id: String },

    /// Leadership can only transfer to a voting member.
    #[error("cluster member {id} is not a voter")]
    NotVoter { id: String },

    /// The candidate address did not answer the identity handshake in time.
    #[error("handshake with {address} timed out after {timeout:?}")]
    HandshakeTimeout { address: String, timeout: Duration },

    /// The candidate address answered the handshake with a failure.
    #[error("handshake with {address} failed: {reason}")]
    Handshake { address: String, reason: String },

    /// The consensus log rejected or failed a command submission.
    #[error("consensus error: {0}")]
    Consensus(String),

    /// Leadership handoff to the target failed.
    #[error("leadership transfer to {target} failed: {reason}")]
    TransferLeadership { target: String, reason: String },

    /// Invalid mesh configuration.
    #[error("mesh configuration error: {0}")]
    Config(String),
}

fn leader_suffix(leader: &Option<String>) -> String {
    match leader {
        Some(id) => format!(" (current leader: {id})"),
        None => String::new(),
    }
}

/// Structured error for the administrative REST/CLI surface.
///
/// `field` names the request field the failure is attributed to (`"address"`
/// for add-member handshake failures, `"id"` for remove-member failures), when
/// one applies.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl MeshError {
    /// Map into the administrative surface's structured error.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            MeshError::NotClustered => ApiError {
                code: "CLUSTER_NOT_ENABLED",
                message: self.to_string(),
                status: 400,
                field: None,
            },
            MeshError::NotLeader(_) => ApiError {
                code: "NOT_CLUSTER_LEADER",
                message: self.to_string(),
                status: 503,
                field: None,
            },
            MeshError::PeerNotFound { .. } => ApiError {
                code: "MEMBER_NOT_FOUND",
                message: self.to_string(),
                status: 404,
                field: Some("id"),
            },
            MeshError::NotVoter { .. } => ApiError {
                code: "MEMBER_NOT_VOTER",
                message: self.to_string(),
                status: 400,
                field: Some("id"),
            },
            MeshError::HandshakeTimeout { .. } | MeshError::Handshake { .. } => ApiError {
                code: "MEMBER_ADDRESS_UNREACHABLE",
                message: self.to_string(),
                status: 400,
                field: Some("address"),
            },
            MeshError::TransferLeadership { .. } => ApiError {
                code: "TRANSFER_LEADERSHIP_ERROR",
                message: self.to_string(),
                status: 500,
                field: None,
            },
            MeshError::Consensus(_) => ApiError {
                code: "CONSENSUS_ERROR",
                message: self.to_string(),
                status: 500,
                field: None,
            },
            MeshError::Config(_) => ApiError {
                code: "INVALID_MESH_CONFIG",
                message: self.to_string(),
                status: 500,
                field: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_leader_names_current_leader() {
        let err = MeshError::NotLeader(Some("ctrl2".to_string()));
        assert!(err.to_string().contains("ctrl2"));

        let err = MeshError::NotLeader(None);
        assert!(!err.to_string().contains("current leader"));
    }

    #[test]
    fn test_handshake_errors_map_to_address_field() {
        let err = MeshError::HandshakeTimeout {
            address: "10.0.0.9:6262".to_string(),
            timeout: Duration::from_secs(5),
        };
        let api = err.to_api_error();
        assert_eq!(api.field, Some("address"));
        assert_eq!(api.status, 400);
    }

    #[test]
    fn test_member_errors_map_to_id_field() {
        let err = MeshError::PeerNotFound {
            id: "ctrl9".to_string(),
        };
        assert_eq!(err.to_api_error().field, Some("id"));

        let err = MeshError::NotVoter {
            id: "ctrl3".to_string(),
        };
        assert_eq!(err.to_api_error().field, Some("id"));
    }

    #[test]
    fn test_transfer_error_is_distinguished() {
        let err = MeshError::TransferLeadership {
            target: "ctrl2".to_string(),
            reason: "unreachable".to_string(),
        };
        let api = err.to_api_error();
        assert_eq!(api.code, "TRANSFER_LEADERSHIP_ERROR");
        assert!(api.field.is_none());
    }

    #[test]
    fn test_not_clustered_is_distinct() {
        let api = MeshError::NotClustered.to_api_error();
        assert_eq!(api.code, "CLUSTER_NOT_ENABLED");
    }
}
