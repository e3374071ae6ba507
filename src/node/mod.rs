//! Node identity persistence.
//!
//! # Responsibilities
//! - Load and save the durable descriptor identifying this node
//! - Repair descriptors written by older versions that predate the
//!   `path` field
//!
//! # Design Decisions
//! - The descriptor lives at a fixed filename inside the data directory
//!   and is never moved or deleted by this crate
//! - A missing descriptor is not an error at construction; first-start
//!   creation belongs to the meta store itself
//! - Repair rewrites content in place, exactly once per stale file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fixed filename of the descriptor inside the data directory.
pub const DESCRIPTOR_FILE: &str = "node.json";

/// Error type for descriptor operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("reading descriptor: {0}")]
    Read(#[source] std::io::Error),

    #[error("writing descriptor: {0}")]
    Write(#[source] std::io::Error),

    #[error("descriptor is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Durable record identifying this node across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(default)]
    pub id: u64,

    /// The node's data path. Older descriptors omit this field; see
    /// [`reconcile`].
    #[serde(default)]
    pub path: PathBuf,
}

impl NodeDescriptor {
    /// Load the descriptor from `dir`, if one exists.
    pub fn load(dir: &Path) -> Result<Option<Self>, NodeError> {
        let file = dir.join(DESCRIPTOR_FILE);
        let raw = match std::fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NodeError::Read(e)),
        };
        let node = serde_json::from_str(&raw)?;
        Ok(Some(node))
    }

    /// Persist the descriptor into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), NodeError> {
        let file = dir.join(DESCRIPTOR_FILE);
        let raw = serde_json::to_string(self)?;
        std::fs::write(&file, raw).map_err(NodeError::Write)
    }
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No descriptor on disk; nothing to do.
    Absent,
    /// Descriptor already carries a path field.
    Current,
    /// Descriptor predated the path field and was re-saved.
    Repaired,
}

/// Reconcile the on-disk descriptor with the configured data path.
///
/// Descriptors written before the `path` field existed are refreshed in
/// place: the configured path is filled in and the file re-saved. The
/// repair happens at most once because the re-saved form carries the
/// field.
pub fn reconcile(dir: &Path, expected_path: &Path) -> Result<Reconciliation, NodeError> {
    let file = dir.join(DESCRIPTOR_FILE);
    let raw = match std::fs::read_to_string(&file) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Reconciliation::Absent),
        Err(e) => return Err(NodeError::Read(e)),
    };

    if raw.contains("\"path\"") {
        return Ok(Reconciliation::Current);
    }

    let mut node: NodeDescriptor = serde_json::from_str(&raw)?;
    node.path = expected_path.to_path_buf();
    node.save(dir)?;

    tracing::info!(dir = %dir.display(), "node descriptor repaired with path field");
    Ok(Reconciliation::Repaired)
}
