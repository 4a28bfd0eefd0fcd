//! # Fabricmesh
//! Control-plane building blocks for a zero-trust overlay network fabric.
//!
//! A fabric controller cluster replicates its state through a consensus log and
//! must agree on membership, leadership, and safe-operating mode. This crate
//! provides the two subsystems at the heart of that control plane:
//!
//! - the **cluster mesh** ([`mesh`]): tracks connected peer controllers,
//!   detects software-version disagreement across the cluster, and degrades the
//!   whole cluster to read-only mode while any disagreement persists. It also
//!   exposes the administrative membership surface (list members, handshake,
//!   join, remove, leadership transfer) backed by a pluggable consensus log.
//! - the **event dispatcher** ([`events`]): a typed, multi-category
//!   publish/subscribe core that turns low-level state transitions (peer
//!   connect/disconnect, entity changes, metrics polls) into filterable event
//!   streams consumed by registered observers.
//!
//! The consensus log itself (leader election, log replication, snapshotting)
//! and the node-to-node wire transport are deliberately out of scope: both are
//! trait seams ([`mesh::ConsensusLog`], [`mesh::Handshaker`]) so the crate can
//! sit on top of any Raft-style implementation.
//!
//! # Goals
//! - Easy to understand code
//! - Leverage best in class libraries such as [Tokio](https://tokio.rs/) and
//!   [tracing](https://docs.rs/tracing)
//! - Be a building block for overlay-network controllers
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fabricmesh::events::EventDispatcher;
//! use fabricmesh::mesh::{Mesh, MeshConfig, Peer, PeerKind};
//! use fabricmesh::version::{BuildVersionProvider, VersionInfo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Arc::new(EventDispatcher::new());
//!     let mesh = Mesh::builder(MeshConfig::default())
//!         .version_provider(Arc::new(BuildVersionProvider::new()))
//!         .dispatcher(dispatcher.clone())
//!         .build();
//!
//!     // Transport glue reports peer lifecycle; the mesh keeps the
//!     // cluster-wide read-only flag current and emits cluster events.
//!     let peer = Peer::new("ctrl2", "tls:10.0.0.2:6262", VersionInfo::new("1.2.0"))
//!         .with_kind(PeerKind::Controller);
//!     mesh.peer_connected(peer, true)?;
//!     assert!(mesh.is_read_only());
//!     Ok(())
//! }
//! ```
//!
//! Production processes usually split their runtimes so event fan-out cannot
//! starve membership work; see [`runtime`] for the control/event-plane wiring
//! and [`events::EventDispatcher::with_handles`].

#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod mesh;
pub mod metrics;
pub mod runtime;
pub mod telemetry;
pub mod version;

pub mod prelude {
    //! Main exports for controller integration.
    //!
    //! Pulls in the mesh membership surface, the event dispatcher, and the
    //! event types most integrations subscribe to.

    pub use crate::error::{Error, Result};
    pub use crate::events::{
        ClusterEvent, ClusterEventType, EventDispatcher, EventHandler, HandlerConfig,
    };
    pub use crate::mesh::{
        ConsensusLog, Handshaker, MemberInfo, Mesh, MeshConfig, MeshError, MeshResult, Peer,
        PeerRegistry,
    };
    pub use crate::version::{VersionInfo, VersionProvider};
}
