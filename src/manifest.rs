//! Artifact manifest sidecar
//!
//! Records every entry of a built artifact with its size and hash, plus the
//! digest of the archive bytes themselves. Written next to the artifact so a
//! deployment collaborator can check what it received without unpacking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

use crate::archive::Artifact;

/// Schema version for the manifest sidecar
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "fnpack/artifact_manifest@1";

/// A single entry in the artifact manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path within the artifact
    pub path: String,

    /// Size in bytes
    pub size: u64,

    /// SHA-256 hash of the entry contents
    pub sha256: String,
}

/// Manifest describing a built artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the manifest was created
    pub created_at: DateTime<Utc>,

    /// SHA-256 of the artifact's tar bytes
    pub artifact_sha256: String,

    /// All entries in the artifact, sorted by path
    pub entries: Vec<ManifestEntry>,
}

impl ArtifactManifest {
    /// Build a manifest for an artifact and its serialized bytes digest
    pub fn from_artifact(artifact: &Artifact, artifact_sha256: String) -> Self {
        let entries = artifact
            .entries()
            .map(|(path, entry)| ManifestEntry {
                path: path.to_string(),
                size: entry.contents.len() as u64,
                sha256: sha256_hex(&entry.contents),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            artifact_sha256,
            entries,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    /// Total size of all entries
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Find an entry by path
    pub fn find_entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

/// Compute SHA-256 of bytes and return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
