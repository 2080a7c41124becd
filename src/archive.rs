//! In-memory artifact container and canonical tar serialization
//!
//! An `Artifact` is a path-indexed map of entries. Inserting at an existing
//! path replaces the previous entry, which is what gives source files
//! precedence over same-named dependency files. Serialization produces a
//! canonical uncompressed tar: entries in sorted path order, mtime 0,
//! uid/gid 0, modes normalized to 0644/0755.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tar::{Archive, Builder, Header};
use thiserror::Error;

/// Errors for artifact container operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid artifact entry path {path:?}: {reason}")]
    InvalidEntryPath { path: String, reason: &'static str },

    #[error("artifact write failed at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read artifact {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single entry in an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// File contents
    pub contents: Vec<u8>,

    /// Normalized mode: 0o755 when the executable bit was set, 0o644 otherwise
    pub mode: u32,
}

/// Path-indexed artifact container
///
/// Paths use forward-slash separators, are relative (no leading `/`), and
/// contain no `.` or `..` segments. The map keeps entries in lexicographic
/// path order, so serialization is deterministic for identical contents.
#[derive(Debug, Default)]
pub struct Artifact {
    entries: BTreeMap<String, ArtifactEntry>,
}

impl Artifact {
    /// Create an empty artifact
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry at the same path
    ///
    /// Returns the replaced entry, if any.
    pub fn insert(
        &mut self,
        path: &str,
        contents: Vec<u8>,
        executable: bool,
    ) -> Result<Option<ArtifactEntry>, ArchiveError> {
        validate_entry_path(path).map_err(|reason| ArchiveError::InvalidEntryPath {
            path: path.to_string(),
            reason,
        })?;

        let mode = if executable { 0o755 } else { 0o644 };
        Ok(self
            .entries
            .insert(path.to_string(), ArtifactEntry { contents, mode }))
    }

    /// Look up an entry by path
    pub fn get(&self, path: &str) -> Option<&ArtifactEntry> {
        self.entries.get(path)
    }

    /// Check whether an entry exists at the given path
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the artifact has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in sorted path order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ArtifactEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e))
    }

    /// Total size of all entry contents in bytes
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.contents.len() as u64).sum()
    }

    /// Serialize to canonical uncompressed tar bytes
    ///
    /// Headers are normalized: mtime 0, uid/gid 0, mode 0644 or 0755.
    /// Identical entries always produce identical bytes.
    pub fn to_tar_bytes(&self) -> io::Result<Vec<u8>> {
        let mut tar_buffer = Vec::new();

        {
            let mut builder = Builder::new(&mut tar_buffer);

            for (path, entry) in &self.entries {
                let mut header = Header::new_gnu();
                header.set_size(entry.contents.len() as u64);
                header.set_mtime(0);
                header.set_uid(0);
                header.set_gid(0);
                header.set_mode(entry.mode);
                header.set_cksum();

                builder.append_data(&mut header, path, entry.contents.as_slice())?;
            }

            builder.finish()?;
        }

        Ok(tar_buffer)
    }

    /// Read an artifact back from a tar file on disk
    ///
    /// Directory and symlink entries are skipped; archives produced by this
    /// crate contain only regular files.
    pub fn read_tar(path: &Path) -> Result<Self, ArchiveError> {
        let read_err = |source: io::Error| ArchiveError::ReadFailed {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(read_err)?;
        let mut archive = Archive::new(file);
        let mut artifact = Self::new();

        for entry in archive.entries().map_err(read_err)? {
            let mut entry = entry.map_err(read_err)?;

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let entry_path = entry
                .path()
                .map_err(read_err)?
                .to_string_lossy()
                .into_owned();
            let mode = entry.header().mode().map_err(read_err)?;

            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).map_err(read_err)?;

            artifact.insert(&entry_path, contents, mode & 0o111 != 0)?;
        }

        Ok(artifact)
    }
}

/// Atomic write using write-then-rename
///
/// The temporary file lives next to the destination so the rename stays on
/// one filesystem. The destination is never left half-written.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ArchiveError> {
    let write_err = |source: io::Error| ArchiveError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(io::Error::new(io::ErrorKind::InvalidInput, "no file name")))?
        .to_string_lossy()
        .into_owned();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        write_err(e)
    })?;

    Ok(())
}

/// Validate an artifact entry path
fn validate_entry_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("empty path");
    }
    if path.starts_with('/') {
        return Err("leading slash");
    }
    if path.contains('\\') {
        return Err("backslash separator");
    }
    for component in path.split('/') {
        if component.is_empty() {
            return Err("empty component");
        }
        if component == "." || component == ".." {
            return Err("dot segment");
        }
    }
    Ok(())
}

/// Check if a file on disk has the executable bit set
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            return metadata.permissions().mode() & 0o111 != 0;
        }
    }
    false
}
