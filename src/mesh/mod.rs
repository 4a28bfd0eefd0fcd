//! Cluster mesh: membership, leadership, and version-consistency safety.
//!
//! # Architecture
//!
//! ```text
//!  transport callbacks ──▶ Mesh ──▶ PeerRegistry ──▶ ReadOnlyState
//!                           │                            │
//!  admin commands ──────────┤                            ▼
//!                           │                      IsReadOnly()  (hot path)
//!                           ▼
//!                    ConsensusLog (seam)          ClusterEventEmitter
//!                                                        │
//!                                                        ▼
//!                                                  EventDispatcher
//! ```
//!
//! Peer connects and disconnects drive a recompute of the single cluster-wide
//! read-only flag: the cluster is read-only exactly while at least one
//! connected peer's version comparison key differs from the local node's.
//! Transitions are edge-triggered and emit one `state.ro` / `state.rw`
//! cluster event each.
//!
//! Administrative operations (join, remove, leadership transfer) submit
//! commands to the consensus log and return on local acceptance; the commit
//! is observed later through membership changes and their events.

mod config;
mod consensus;
mod controller;
mod emitter;
mod error;
mod handshake;
mod peer;
mod state;

#[cfg(any(test, feature = "test-utilities"))]
mod mock_consensus;

pub use config::MeshConfig;
pub use consensus::{ConsensusLog, ConsensusMember, MembershipCommand};
pub use controller::{
    JoinRequest, MemberInfo, Mesh, MeshBuilder, RemovePeerRequest, TransferLeadershipRequest,
};
pub use emitter::ClusterEventEmitter;
pub use error::{ApiError, MeshError, MeshResult};
pub use handshake::{Handshaker, PeerInfo};
pub use peer::{Peer, PeerKind, PeerRegistry};
pub use state::ReadOnlyState;

#[cfg(any(test, feature = "test-utilities"))]
pub use handshake::MockHandshaker;
#[cfg(any(test, feature = "test-utilities"))]
pub use mock_consensus::MockConsensusLog;
