//! Tests for the cluster read-only consistency monitor.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fabricmesh::events::{
    ClusterEvent, ClusterEventType, EventDispatcher, EventHandler,
};
use fabricmesh::mesh::{Mesh, MeshConfig, Peer};
use fabricmesh::version::{StaticVersionProvider, VersionInfo};

#[derive(Default)]
struct ClusterRecorder {
    seen: Mutex<Vec<ClusterEventType>>,
}

impl ClusterRecorder {
    fn count(&self, event_type: ClusterEventType) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|t| **t == event_type)
            .count()
    }
}

impl EventHandler<ClusterEvent> for ClusterRecorder {
    fn accept(&self, event: &ClusterEvent) {
        self.seen.lock().unwrap().push(event.event_type);
    }
}

/// Mesh with local version "1" and a recorder on the cluster category.
fn mesh_with_recorder() -> (Mesh, Arc<ClusterRecorder>) {
    let dispatcher = Arc::new(EventDispatcher::new());
    let recorder = Arc::new(ClusterRecorder::default());
    dispatcher.add_cluster_event_handler(recorder.clone());

    let mesh = Mesh::builder(MeshConfig::default())
        .version_provider(Arc::new(StaticVersionProvider::new(VersionInfo::new("1"))))
        .dispatcher(dispatcher)
        .build();
    (mesh, recorder)
}

fn peer(id: &str, version: &str) -> Peer {
    Peer::new(
        id,
        format!("tls:10.0.0.{id}:6262"),
        VersionInfo::new(version),
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_matching_peer_keeps_read_write() {
    let (mesh, _) = mesh_with_recorder();

    mesh.peer_connected(peer("1", "1"), true).unwrap();
    assert!(!mesh.is_read_only());
}

#[tokio::test]
async fn test_mismatching_peer_forces_read_only() {
    let (mesh, recorder) = mesh_with_recorder();

    mesh.peer_connected(peer("1", "dne"), true).unwrap();
    assert!(mesh.is_read_only());

    settle().await;
    assert_eq!(recorder.count(ClusterEventType::ReadOnly), 1);
}

#[tokio::test]
async fn test_removing_only_mismatch_restores_read_write() {
    let (mesh, recorder) = mesh_with_recorder();

    // Peers {1:"dne", 2:"1"} with local "1": read-only because of peer 1.
    let mismatched = peer("1", "dne");
    mesh.peer_connected(mismatched.clone(), true).unwrap();
    mesh.peer_connected(peer("2", "1"), true).unwrap();
    assert!(mesh.is_read_only());

    mesh.peer_disconnected(&mismatched);
    assert!(!mesh.is_read_only());

    settle().await;
    assert_eq!(recorder.count(ClusterEventType::ReadOnly), 1);
    assert_eq!(recorder.count(ClusterEventType::ReadWrite), 1);
}

#[tokio::test]
async fn test_remaining_mismatch_keeps_read_only() {
    let (mesh, recorder) = mesh_with_recorder();

    // Peers {1:"dne", 2:"dne"}: removing peer 1 leaves the mismatch via 2.
    let first = peer("1", "dne");
    mesh.peer_connected(first.clone(), true).unwrap();
    mesh.peer_connected(peer("2", "dne"), true).unwrap();
    assert!(mesh.is_read_only());

    mesh.peer_disconnected(&first);
    assert!(mesh.is_read_only());

    settle().await;
    // One entry, no exit: the flag never flipped back.
    assert_eq!(recorder.count(ClusterEventType::ReadOnly), 1);
    assert_eq!(recorder.count(ClusterEventType::ReadWrite), 0);
}

#[tokio::test]
async fn test_removing_sole_mismatching_peer_restores_read_write() {
    let (mesh, _) = mesh_with_recorder();

    let mismatched = peer("1", "dne");
    mesh.peer_connected(mismatched.clone(), true).unwrap();
    assert!(mesh.is_read_only());

    mesh.peer_disconnected(&mismatched);
    assert!(!mesh.is_read_only());
}

#[tokio::test]
async fn test_removing_last_peer_restores_read_write() {
    let (mesh, _) = mesh_with_recorder();

    let mismatched = peer("1", "dne");
    mesh.peer_connected(mismatched.clone(), true).unwrap();
    assert!(mesh.is_read_only());
    assert_eq!(mesh.registry().len(), 1);

    mesh.peer_disconnected(&mismatched);
    assert!(mesh.registry().is_empty());
    assert!(!mesh.is_read_only());
}

#[tokio::test]
async fn test_update_cluster_state_is_edge_triggered() {
    let (mesh, recorder) = mesh_with_recorder();

    mesh.peer_connected(peer("1", "dne"), true).unwrap();
    assert!(mesh.is_read_only());

    // Repeated recomputes with no membership change emit nothing new.
    mesh.update_cluster_state();
    mesh.update_cluster_state();

    settle().await;
    assert_eq!(recorder.count(ClusterEventType::ReadOnly), 1);
}

#[tokio::test]
async fn test_reconnect_with_fixed_version_clears_read_only() {
    let (mesh, _) = mesh_with_recorder();

    mesh.peer_connected(peer("1", "dne"), true).unwrap();
    assert!(mesh.is_read_only());

    // Overwrite-on-reconnect: same id, upgraded version.
    mesh.peer_connected(peer("1", "1"), false).unwrap();
    assert!(!mesh.is_read_only());
    assert_eq!(mesh.registry().len(), 1);
}

#[tokio::test]
async fn test_peer_events_emitted() {
    let (mesh, recorder) = mesh_with_recorder();

    let p = peer("1", "1");
    mesh.peer_connected(p.clone(), true).unwrap();
    mesh.peer_disconnected(&p);

    settle().await;
    assert_eq!(recorder.count(ClusterEventType::PeerConnected), 1);
    assert_eq!(recorder.count(ClusterEventType::PeerDisconnected), 1);
}
