//! Tests for cluster event emission and wire shapes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fabricmesh::events::{
    ClusterEvent, ClusterEventType, ConnectEvent, EventDispatcher, EventHandler,
};
use fabricmesh::mesh::{ConsensusMember, Mesh, MeshConfig, MockConsensusLog, Peer, PeerKind};
use fabricmesh::version::{StaticVersionProvider, VersionInfo};

#[derive(Default)]
struct ClusterRecorder {
    seen: Mutex<Vec<ClusterEvent>>,
}

impl EventHandler<ClusterEvent> for ClusterRecorder {
    fn accept(&self, event: &ClusterEvent) {
        self.seen.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
struct ConnectRecorder {
    seen: Mutex<Vec<ConnectEvent>>,
}

impl EventHandler<ConnectEvent> for ConnectRecorder {
    fn accept(&self, event: &ConnectEvent) {
        self.seen.lock().unwrap().push(event.clone());
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn mesh_setup() -> (
    Mesh,
    Arc<MockConsensusLog>,
    Arc<ClusterRecorder>,
    Arc<ConnectRecorder>,
) {
    let dispatcher = Arc::new(EventDispatcher::new());
    let cluster_recorder = Arc::new(ClusterRecorder::default());
    let connect_recorder = Arc::new(ConnectRecorder::default());
    dispatcher.add_cluster_event_handler(cluster_recorder.clone());
    dispatcher.add_connect_event_handler(connect_recorder.clone());

    let consensus = Arc::new(MockConsensusLog::new("ctrl1"));
    let mesh = Mesh::builder(MeshConfig::default())
        .version_provider(Arc::new(StaticVersionProvider::new(VersionInfo::new(
            "1.2.0",
        ))))
        .consensus(consensus.clone())
        .dispatcher(dispatcher)
        .build();
    (mesh, consensus, cluster_recorder, connect_recorder)
}

#[tokio::test]
async fn test_peer_connected_event_carries_peer_summary() {
    let (mesh, _, cluster_recorder, _) = mesh_setup();

    let peer = Peer::new("ctrl2", "tls:10.0.0.2:6262", VersionInfo::new("1.2.0"))
        .with_api_addresses(vec!["https://10.0.0.2:1280".to_string()]);
    mesh.peer_connected(peer, true).unwrap();
    settle().await;

    let seen = cluster_recorder.seen.lock().unwrap();
    let event = seen
        .iter()
        .find(|e| e.event_type == ClusterEventType::PeerConnected)
        .unwrap();

    let value = serde_json::to_value(event).unwrap();
    assert_eq!(value["namespace"], "cluster");
    assert_eq!(value["eventType"], "peer.connected");
    assert_eq!(value["event_src_id"], "ctrl1");
    assert_eq!(value["peers"][0]["id"], "ctrl2");
    assert_eq!(value["peers"][0]["addr"], "tls:10.0.0.2:6262");
    assert_eq!(value["peers"][0]["version"], "1.2.0");
    assert_eq!(value["peers"][0]["apiAddresses"][0], "https://10.0.0.2:1280");
}

#[tokio::test]
async fn test_router_peer_also_emits_connect_event() {
    let (mesh, _, _, connect_recorder) = mesh_setup();

    let router = Peer::new("r1", "tls:10.0.0.7:6262", VersionInfo::new("1.2.0"))
        .with_kind(PeerKind::Router)
        .with_remote_address("10.0.0.7:39122");
    mesh.peer_connected(router, true).unwrap();
    settle().await;

    let seen = connect_recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, "r1");
    assert_eq!(seen[0].src_addr, "10.0.0.7:39122");
}

#[tokio::test]
async fn test_controller_peer_emits_no_connect_event() {
    let (mesh, _, _, connect_recorder) = mesh_setup();

    mesh.peer_connected(
        Peer::new("ctrl2", "tls:10.0.0.2:6262", VersionInfo::new("1.2.0")),
        true,
    )
    .unwrap();
    settle().await;

    assert!(connect_recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_leadership_change_events() {
    let (mesh, _, cluster_recorder, _) = mesh_setup();

    mesh.handle_leadership_change(true, Some(17));
    mesh.handle_leadership_change(false, Some(18));
    settle().await;

    let seen = cluster_recorder.seen.lock().unwrap();
    let gained = seen
        .iter()
        .find(|e| e.event_type == ClusterEventType::LeadershipGained)
        .unwrap();
    assert_eq!(gained.index, Some(17));
    assert_eq!(gained.leader_id.as_deref(), Some("ctrl1"));

    assert!(
        seen.iter()
            .any(|e| e.event_type == ClusterEventType::LeadershipLost)
    );
}

#[tokio::test]
async fn test_leader_presence_events() {
    let (mesh, _, cluster_recorder, _) = mesh_setup();

    mesh.handle_leader_presence(Some("ctrl2"));
    mesh.handle_leader_presence(None);
    settle().await;

    let seen = cluster_recorder.seen.lock().unwrap();
    let has_leader = seen
        .iter()
        .find(|e| e.event_type == ClusterEventType::HasLeader)
        .unwrap();
    assert_eq!(has_leader.leader_id.as_deref(), Some("ctrl2"));

    assert!(
        seen.iter()
            .any(|e| e.event_type == ClusterEventType::IsLeaderless)
    );
}

#[tokio::test]
async fn test_members_changed_event_carries_roster_and_index() {
    let (mesh, consensus, cluster_recorder, _) = mesh_setup();
    consensus.add_member(ConsensusMember {
        id: "ctrl2".to_string(),
        address: "tls:10.0.0.2:6262".to_string(),
        voter: true,
    });
    mesh.peer_connected(
        Peer::new("ctrl2", "tls:10.0.0.2:6262", VersionInfo::new("1.2.0")),
        true,
    )
    .unwrap();

    mesh.handle_members_changed(42).unwrap();
    settle().await;

    let seen = cluster_recorder.seen.lock().unwrap();
    let event = seen
        .iter()
        .find(|e| e.event_type == ClusterEventType::MembersChanged)
        .unwrap();
    assert_eq!(event.index, Some(42));

    let peers = event.peers.as_ref().unwrap();
    assert_eq!(peers.len(), 2);
    let ctrl2 = peers.iter().find(|p| p.id == "ctrl2").unwrap();
    assert_eq!(ctrl2.version, "1.2.0");
}

#[tokio::test]
async fn test_read_only_transition_events_serialize() {
    let (mesh, _, cluster_recorder, _) = mesh_setup();

    mesh.peer_connected(
        Peer::new("ctrl2", "tls:10.0.0.2:6262", VersionInfo::new("dne")),
        true,
    )
    .unwrap();
    settle().await;

    let seen = cluster_recorder.seen.lock().unwrap();
    let ro = seen
        .iter()
        .find(|e| e.event_type == ClusterEventType::ReadOnly)
        .unwrap();
    let value = serde_json::to_value(ro).unwrap();
    assert_eq!(value["eventType"], "state.ro");
    assert_eq!(value["namespace"], "cluster");
}
