//! Connected peer records and the peer registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::metrics;
use crate::version::VersionInfo;

/// What kind of component a mesh connection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// Another controller participating in the consensus cluster.
    Controller,
    /// A fabric router connected to this controller's mesh listener.
    Router,
}

/// A remote node currently connected to this node's mesh.
///
/// Created on a successful connect handshake, removed on disconnect or
/// explicit membership removal. Reconnects with the same id replace the whole
/// record (new version, new address); records are never merged in place.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: String,
    pub address: String,
    pub version: VersionInfo,
    /// DER-encoded certificate chain presented during the handshake.
    pub server_cert_chain: Vec<Vec<u8>>,
    pub kind: PeerKind,
    /// Addresses where the peer serves its management APIs.
    pub api_addresses: Vec<String>,
    /// Remote address of the underlying transport connection, when known.
    pub remote_address: Option<String>,
}

impl Peer {
    pub fn new(id: impl Into<String>, address: impl Into<String>, version: VersionInfo) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            version,
            server_cert_chain: Vec::new(),
            kind: PeerKind::Controller,
            api_addresses: Vec::new(),
            remote_address: None,
        }
    }

    pub fn with_kind(mut self, kind: PeerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_api_addresses(mut self, addresses: Vec<String>) -> Self {
        self.api_addresses = addresses;
        self
    }

    pub fn with_cert_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.server_cert_chain = chain;
        self
    }

    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }
}

/// In-memory map of connected peer id to peer record.
///
/// Reads (lookups, listing, version scans) proceed lock-free and concurrently
/// with unrelated operations. Mutations that must pair with a consistency
/// recompute are serialized by the mesh's transition lock, not here.
pub struct PeerRegistry {
    peers: DashMap<String, Arc<Peer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Insert or overwrite the record for `peer.id`, returning the replaced
    /// record if one existed.
    pub fn upsert(&self, peer: Peer) -> Option<Arc<Peer>> {
        let previous = self.peers.insert(peer.id.clone(), Arc::new(peer));
        metrics::set_connected_peers(self.peers.len() as i64);
        previous
    }

    /// Remove the record for `id`, returning it if present.
    pub fn remove(&self, id: &str) -> Option<Arc<Peer>> {
        let removed = self.peers.remove(id).map(|(_, peer)| peer);
        metrics::set_connected_peers(self.peers.len() as i64);
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Snapshot of the current peer records.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Whether any connected peer's version comparison key differs from
    /// `local_key`.
    pub fn any_version_mismatch(&self, local_key: &str) -> bool {
        self.peers
            .iter()
            .any(|entry| entry.value().version.version != local_key)
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
