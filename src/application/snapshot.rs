//! Engine Snapshots
//!
//! JSON persistence of pools, share balances and rake history so CLI
//! sessions can pick up where the last one stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::domain::pool::LiquidityPool;
use crate::domain::positions::ShareBalance;
use crate::domain::rake::RakeRecord;

/// Current on-disk format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug, Clone)]
pub enum SnapshotError {
    #[error("Failed to serialize snapshot: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize snapshot: {0}")]
    DeserializationError(String),

    #[error("Failed to write snapshot: {0}")]
    WriteError(String),

    #[error("Failed to read snapshot: {0}")]
    ReadError(String),

    #[error("Failed to create snapshot directory: {0}")]
    DirectoryError(String),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub pools: Vec<LiquidityPool>,
    #[serde(default)]
    pub positions: Vec<ShareBalance>,
    #[serde(default)]
    pub rake_records: Vec<RakeRecord>,
}

impl EngineSnapshot {
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SnapshotError::DirectoryError(e.to_string()))?;
            }
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SnapshotError::SerializationError(e.to_string()))?;
        fs::write(path, content).map_err(|e| SnapshotError::WriteError(e.to_string()))?;

        tracing::info!(
            "Snapshot saved to {}: {} pools, {} positions, {} rake records",
            path.display(),
            self.pools.len(),
            self.positions.len(),
            self.rake_records.len()
        );
        Ok(())
    }

    /// Load a snapshot. A missing or empty file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| SnapshotError::ReadError(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let snapshot: Self =
            serde_json::from_str(&content).map_err(|e| SnapshotError::DeserializationError(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        tracing::info!(
            "Snapshot loaded from {} (saved {})",
            path.display(),
            snapshot.saved_at
        );
        Ok(Some(snapshot))
    }
}
