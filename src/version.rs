//! Controller version identity.
//!
//! Every controller node carries a [`VersionInfo`] describing the software it
//! runs. The mesh compares peers against the local node using
//! [`VersionProvider::comparison_key`]: any connected peer whose key differs
//! from the local key forces the cluster into read-only mode until the
//! disagreement clears (mixed-version clusters must not apply state-machine
//! commands that newer or older peers would interpret differently).
//!
//! Comparison is an exact string match on the version field. Range matching or
//! semantic-version tolerance is deliberately not part of the contract.

use serde::{Deserialize, Serialize};

/// Version identity of a controller build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Release version string, e.g. `"1.2.0"`.
    pub version: String,
    /// VCS revision the build was produced from.
    pub revision: String,
    /// Build date, RFC 3339.
    pub build_date: String,
    /// VCS branch the build was produced from.
    pub branch: String,
    /// Target operating system.
    pub os: String,
    /// Target architecture.
    pub arch: String,
}

impl VersionInfo {
    /// Create a version identity carrying only a version string.
    ///
    /// Revision, build date, and branch default to `"unknown"`; os/arch come
    /// from the running target. Enough for tests and for peers whose handshake
    /// only reported a version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            revision: "unknown".to_string(),
            build_date: "unknown".to_string(),
            branch: "unknown".to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Encode to the JSON form exchanged during the peer handshake.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from the JSON form exchanged during the peer handshake.
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.version, self.revision)
    }
}

/// Supplies this node's version identity and its comparison strategy.
pub trait VersionProvider: Send + Sync {
    /// The local node's version identity.
    fn version(&self) -> &VersionInfo;

    /// Key used for cluster consistency comparison.
    ///
    /// Two nodes are considered compatible iff their keys are equal. The
    /// default is the exact version string.
    fn comparison_key(&self) -> &str {
        &self.version().version
    }
}

/// [`VersionProvider`] populated from build-time environment.
///
/// `CARGO_PKG_VERSION` supplies the version; revision, build date, and branch
/// come from the optional `FABRICMESH_BUILD_*` variables stamped by release
/// tooling, falling back to `"unknown"` in local builds.
#[derive(Debug, Clone)]
pub struct BuildVersionProvider {
    info: VersionInfo,
}

impl BuildVersionProvider {
    pub fn new() -> Self {
        Self {
            info: VersionInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                revision: option_env!("FABRICMESH_BUILD_REVISION")
                    .unwrap_or("unknown")
                    .to_string(),
                build_date: option_env!("FABRICMESH_BUILD_DATE")
                    .unwrap_or("unknown")
                    .to_string(),
                branch: option_env!("FABRICMESH_BUILD_BRANCH")
                    .unwrap_or("unknown")
                    .to_string(),
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            },
        }
    }
}

impl Default for BuildVersionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionProvider for BuildVersionProvider {
    fn version(&self) -> &VersionInfo {
        &self.info
    }
}

/// Fixed-version provider, mainly useful in tests and embedded deployments.
#[derive(Debug, Clone)]
pub struct StaticVersionProvider {
    info: VersionInfo,
}

impl StaticVersionProvider {
    pub fn new(info: VersionInfo) -> Self {
        Self { info }
    }
}

impl VersionProvider for StaticVersionProvider {
    fn version(&self) -> &VersionInfo {
        &self.info
    }
}
