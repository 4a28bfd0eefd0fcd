//! Identity handshake with candidate peers.
//!
//! Before admitting a member, the administrative layer asks the candidate
//! address for its stable identity. The wire transport performing the
//! exchange is external; [`Handshaker`] is the seam, and the mesh enforces
//! the caller-supplied deadline around it.

#[cfg(any(test, feature = "test-utilities"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-utilities"))]
use std::sync::Mutex;
#[cfg(any(test, feature = "test-utilities"))]
use std::time::Duration;

use async_trait::async_trait;

use super::error::{MeshError, MeshResult};
use crate::version::VersionInfo;

/// Identity a candidate peer reported during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: String,
    pub address: String,
    pub version: VersionInfo,
}

/// Performs the identity handshake against a candidate address.
///
/// Implementations may block on network I/O indefinitely; the mesh wraps
/// every call in the caller-supplied timeout.
#[async_trait]
pub trait Handshaker: Send + Sync {
    async fn hello(&self, address: &str) -> MeshResult<PeerInfo>;
}

/// In-memory [`Handshaker`] with scriptable peers and latency.
#[cfg(any(test, feature = "test-utilities"))]
#[derive(Default)]
pub struct MockHandshaker {
    peers: Mutex<HashMap<String, PeerInfo>>,
    delay: Mutex<Option<Duration>>,
}

#[cfg(any(test, feature = "test-utilities"))]
impl MockHandshaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `address` answer the handshake with `info`.
    pub fn add_peer(&self, address: impl Into<String>, info: PeerInfo) {
        self.peers.lock().unwrap().insert(address.into(), info);
    }

    /// Delay every handshake by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[cfg(any(test, feature = "test-utilities"))]
#[async_trait]
impl Handshaker for MockHandshaker {
    async fn hello(&self, address: &str) -> MeshResult<PeerInfo> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.peers
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| MeshError::Handshake {
                address: address.to_string(),
                reason: "no peer listening".to_string(),
            })
    }
}
