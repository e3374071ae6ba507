//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a metadata
//! node. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a metadata node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Data directory. The node identity descriptor (`node.json`) is always
    /// stored here, even when the meta store itself never starts.
    pub dir: PathBuf,

    /// Bind address for the shared cluster socket (e.g., "127.0.0.1:8089").
    /// All multiplexed traffic arrives on this single listener.
    pub bind_address: String,

    /// Bind address for the HTTP API. Not bound by this crate; carried for
    /// embedders that expose the API address to peers.
    pub http_bind_address: String,

    /// Hostname of the remote metadata server the client targets.
    pub remote_hostname: String,

    /// Whether the metadata client talks to its servers over HTTPS.
    pub https_enabled: bool,

    /// Profiling settings.
    pub profile: ProfileConfig,

    /// Upper bound, in seconds, on the wait for the metadata client to
    /// report its view synchronized during open. `None` waits forever.
    pub readiness_timeout_secs: Option<u64>,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/lib/metad/meta"),
            bind_address: "127.0.0.1:8089".to_string(),
            http_bind_address: "127.0.0.1:8091".to_string(),
            remote_hostname: "localhost:8091".to_string(),
            https_enabled: false,
            profile: ProfileConfig::default(),
            readiness_timeout_secs: None,
        }
    }
}

impl MetaConfig {
    /// Readiness wait bound as a `Duration`, if one is configured.
    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_secs.map(Duration::from_secs)
    }
}

/// Profiling configuration. Empty paths disable the corresponding profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// File the CPU profile is written to. `None` disables CPU profiling.
    pub cpu_profile: Option<PathBuf>,

    /// File the memory snapshot is written to. `None` disables it.
    pub mem_profile: Option<PathBuf>,

    /// Interval between CPU samples in milliseconds.
    pub cpu_sample_interval_ms: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            cpu_profile: None,
            mem_profile: None,
            cpu_sample_interval_ms: 100,
        }
    }
}
