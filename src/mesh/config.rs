//! Mesh configuration.

use std::time::Duration;

/// Configuration for one controller's mesh.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// This node's stable id in the cluster.
    pub node_id: String,

    /// Address advertised to peers for mesh connections.
    pub advertise_address: String,

    /// Default deadline for candidate-peer identity handshakes when the
    /// caller supplies none.
    ///
    /// Default: 15 seconds
    pub handshake_timeout: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            node_id: "ctrl1".to_string(),
            advertise_address: "tls:127.0.0.1:6262".to_string(),
            handshake_timeout: Duration::from_secs(15),
        }
    }
}

impl MeshConfig {
    /// Create configuration from environment variables.
    ///
    /// - `MESH_NODE_ID`: this node's cluster id
    /// - `MESH_ADVERTISE_ADDRESS`: advertised mesh address
    /// - `MESH_HANDSHAKE_TIMEOUT_SECS`: default handshake deadline in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let node_id = std::env::var("MESH_NODE_ID").unwrap_or(defaults.node_id);
        let advertise_address =
            std::env::var("MESH_ADVERTISE_ADDRESS").unwrap_or(defaults.advertise_address);
        let handshake_timeout = std::env::var("MESH_HANDSHAKE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.handshake_timeout);

        Self {
            node_id,
            advertise_address,
            handshake_timeout,
        }
    }

    /// Validate the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.node_id.is_empty() {
            errors.push("node_id must not be empty".to_string());
        }
        if self.advertise_address.is_empty() {
            errors.push("advertise_address must not be empty".to_string());
        }
        if self.handshake_timeout.is_zero() {
            errors.push("handshake_timeout must be greater than zero".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
