//! Source file merging
//!
//! Takes the explicit list of the function's own code files and writes each
//! one into the artifact at its base name, replacing any same-named entry the
//! dependency tree happened to contain. Source files must never be shadowed
//! by a stale or third-party file of the same name.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::archive::{is_executable, Artifact, ArchiveError};

/// Errors for source merging
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("source file missing or unreadable: {path}: {source}")]
    SourceFileMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source path has no usable file name: {0}")]
    InvalidSourceName(PathBuf),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Counts reported by a completed merge pass
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeStats {
    /// Source files written into the artifact
    pub files: usize,
    /// Entries that replaced a same-named dependency entry
    pub replaced: usize,
}

/// The function's own code files, merged into the artifact root
pub struct SourceSet {
    project_root: PathBuf,
    files: Vec<PathBuf>,
}

impl SourceSet {
    /// Create a source set resolved against the given project root
    ///
    /// Relative paths in `files` are joined onto `project_root`; absolute
    /// paths are used as-is.
    pub fn new(project_root: PathBuf, files: Vec<PathBuf>) -> Self {
        Self {
            project_root,
            files,
        }
    }

    /// Merge every listed file into the artifact at its base name
    ///
    /// Entries land at the archive root alongside the bundled dependency
    /// tree's top-level entries. Any listed file that is missing or
    /// unreadable is fatal.
    pub fn merge_into(&self, artifact: &mut Artifact) -> Result<MergeStats, MergeError> {
        let mut stats = MergeStats::default();

        for file in &self.files {
            let full_path = if file.is_absolute() {
                file.clone()
            } else {
                self.project_root.join(file)
            };

            let name = full_path
                .file_name()
                .ok_or_else(|| MergeError::InvalidSourceName(file.clone()))?
                .to_string_lossy()
                .into_owned();

            let contents = fs::read(&full_path).map_err(|source| MergeError::SourceFileMissing {
                path: full_path.clone(),
                source,
            })?;

            let replaced = artifact.insert(&name, contents, is_executable(&full_path))?;

            stats.files += 1;
            if replaced.is_some() {
                stats.replaced += 1;
            }
        }

        Ok(stats)
    }
}
