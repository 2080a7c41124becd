//! Dependency tree bundling
//!
//! Walks a directory of pre-installed runtime dependencies and writes every
//! regular file into the artifact at its tree-relative path. The walk visits
//! entries in lexicographic order so identical trees always bundle the same
//! way. Symlinks are dereferenced; a symlink whose target resolves outside
//! the tree root is rejected rather than silently skipped.

mod exclude;

pub use exclude::{ExcludeError, ExcludeRules};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::{is_executable, Artifact, ArchiveError};

/// Errors for bundling operations
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("dependency tree unavailable at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("symlink escapes dependency tree: {path}")]
    SymlinkEscapesRoot { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("exclude rules error: {0}")]
    ExcludeError(#[from] ExcludeError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Counts reported by a completed bundling pass
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleStats {
    /// Regular files written into the artifact
    pub files: usize,
    /// Total content bytes written
    pub bytes: u64,
}

/// Bundler for a pre-installed dependency tree
pub struct Bundler {
    root: PathBuf,
    exclude: ExcludeRules,
}

impl Bundler {
    /// Create a bundler for the given dependency tree root
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            exclude: ExcludeRules::default(),
        }
    }

    /// Add exclude patterns on top of the defaults
    pub fn with_excludes(mut self, patterns: &[String]) -> Result<Self, BundleError> {
        self.exclude = self.exclude.with_patterns(patterns)?;
        Ok(self)
    }

    /// Bundle every regular file under the root into the artifact
    ///
    /// Entry paths are the file paths relative to the root, with
    /// forward-slash separators. Empty directories are not recorded.
    pub fn bundle_into(&self, artifact: &mut Artifact) -> Result<BundleStats, BundleError> {
        let unavailable = |source: io::Error| BundleError::SourceUnavailable {
            path: self.root.clone(),
            source,
        };

        let metadata = fs::metadata(&self.root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }
        // An unreadable root is just as fatal as a missing one
        fs::read_dir(&self.root).map_err(unavailable)?;
        let canonical_root = fs::canonicalize(&self.root).map_err(unavailable)?;

        let mut stats = BundleStats::default();

        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;
            let path = entry.path();

            let rel_path = match path.strip_prefix(&self.root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel,
                _ => continue,
            };

            if self.exclude.is_excluded(rel_path) {
                continue;
            }

            if entry.path_is_symlink() {
                let resolved = fs::canonicalize(path)?;
                if !resolved.starts_with(&canonical_root) {
                    return Err(BundleError::SymlinkEscapesRoot {
                        path: path.to_path_buf(),
                    });
                }
            }

            if !entry.file_type().is_file() {
                continue;
            }

            let contents = fs::read(path)?;
            stats.files += 1;
            stats.bytes += contents.len() as u64;

            artifact.insert(&entry_name(rel_path), contents, is_executable(path))?;
        }

        Ok(stats)
    }
}

/// Convert a tree-relative path to a forward-slash entry name
fn entry_name(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
