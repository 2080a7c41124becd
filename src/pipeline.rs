//! Pipeline orchestration
//!
//! Sequences one packaging run: discard the prior artifact at the
//! destination, bundle the dependency tree, merge the source set, persist the
//! result atomically, write the manifest sidecar, and optionally hand the
//! finished path to a publish collaborator.
//!
//! The destination never holds a partially built artifact: the archive is
//! assembled in memory, written to a temporary sibling, and renamed into
//! place only on success.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::{write_atomic, ArchiveError, Artifact};
use crate::bundle::{BundleError, Bundler};
use crate::config::{ConfigError, PackConfig};
use crate::manifest::{sha256_hex, ArtifactManifest};
use crate::publish::{PublishError, Publisher};
use crate::sources::{MergeError, SourceSet};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PackError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("bundling error: {0}")]
    Bundle(#[from] BundleError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("failed to remove prior artifact {path}: {source}")]
    PriorArtifactRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact write failed: {0}")]
    ArtifactWrite(#[from] ArchiveError),

    #[error("artifact size {actual_bytes} exceeds limit {limit_bytes}")]
    SizeExceeded { actual_bytes: u64, limit_bytes: u64 },

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PackError {
    /// Get the process exit code for this error
    ///
    /// Build failures and publish failures are distinguishable: a publish
    /// failure leaves a valid artifact at the destination.
    pub fn exit_code(&self) -> i32 {
        match self {
            PackError::Config(_) => 2,
            PackError::Bundle(_) => 10,
            PackError::Merge(_) => 11,
            PackError::PriorArtifactRemoval { .. } => 12,
            PackError::ArtifactWrite(_) => 13,
            PackError::SizeExceeded { .. } => 14,
            PackError::Publish(_) => 30,
            PackError::Io(_) => 1,
            PackError::Serialization(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PackResult<T> = Result<T, PackError>;

/// Summary of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Final artifact path
    pub artifact_path: PathBuf,

    /// Manifest sidecar path
    pub manifest_path: PathBuf,

    /// SHA-256 of the artifact bytes
    pub artifact_sha256: String,

    /// Total entries in the artifact
    pub entries: usize,

    /// Entries contributed by the dependency tree
    pub dependency_files: usize,

    /// Entries contributed by the source set
    pub source_files: usize,

    /// Source entries that replaced a same-named dependency entry
    pub replaced: usize,

    /// Size of the artifact in bytes
    pub artifact_bytes: u64,
}

/// One packaging run over a configuration
pub struct Pipeline {
    config: PackConfig,
    verbose: bool,
}

impl Pipeline {
    /// Create a pipeline for the given configuration
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            verbose: false,
        }
    }

    /// Enable progress output on stderr
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the artifact and persist it atomically at the destination
    pub fn build(&self) -> PackResult<BuildOutcome> {
        let destination = self.config.destination.clone();
        let manifest_path = manifest_path_for(&destination);

        // A stale artifact must not survive into this run, even if the run
        // later fails before persisting a replacement.
        self.remove_prior(&destination)?;
        self.remove_prior(&manifest_path)?;

        let mut artifact = Artifact::new();

        if self.verbose {
            eprintln!(
                "Bundling dependency tree: {}",
                self.config.dependency_root.display()
            );
        }
        let bundler = Bundler::new(self.config.dependency_root.clone())
            .with_excludes(&self.config.bundle.exclude)?;
        let bundle_stats = bundler.bundle_into(&mut artifact)?;

        if self.verbose {
            eprintln!(
                "Bundled {} file(s), {} bytes; merging {} source file(s)...",
                bundle_stats.files,
                bundle_stats.bytes,
                self.config.sources.len()
            );
        }
        let sources = SourceSet::new(
            self.config.resolved_project_root(),
            self.config.sources.clone(),
        );
        let merge_stats = sources.merge_into(&mut artifact)?;

        let tar_bytes = artifact.to_tar_bytes().map_err(|source| {
            ArchiveError::WriteFailed {
                path: destination.clone(),
                source,
            }
        })?;

        let limit = self.config.bundle.max_bytes;
        if limit > 0 && tar_bytes.len() as u64 > limit {
            return Err(PackError::SizeExceeded {
                actual_bytes: tar_bytes.len() as u64,
                limit_bytes: limit,
            });
        }

        let artifact_sha256 = sha256_hex(&tar_bytes);

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        write_atomic(&destination, &tar_bytes)?;

        let manifest = ArtifactManifest::from_artifact(&artifact, artifact_sha256.clone());
        write_atomic(&manifest_path, manifest.to_json()?.as_bytes())?;

        if self.verbose {
            eprintln!("Wrote: {}", destination.display());
            eprintln!("Wrote: {}", manifest_path.display());
        }

        Ok(BuildOutcome {
            artifact_path: destination,
            manifest_path,
            artifact_sha256,
            entries: artifact.len(),
            dependency_files: bundle_stats.files,
            source_files: merge_stats.files,
            replaced: merge_stats.replaced,
            artifact_bytes: tar_bytes.len() as u64,
        })
    }

    /// Hand a built artifact to the publish collaborator
    ///
    /// Kept separate from `build` so callers report publish failures
    /// distinctly; the artifact at the destination stays valid either way.
    pub fn publish(&self, outcome: &BuildOutcome, publisher: &dyn Publisher) -> PackResult<()> {
        let settings = self.config.publish.as_ref().ok_or_else(|| {
            PackError::Config(ConfigError::ValidationError(
                "publish is not configured".to_string(),
            ))
        })?;

        if self.verbose {
            eprintln!(
                "Publishing {} as '{}'...",
                outcome.artifact_path.display(),
                settings.function
            );
        }

        publisher.publish(&outcome.artifact_path, &settings.function)?;
        Ok(())
    }

    fn remove_prior(&self, path: &Path) -> PackResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                if self.verbose {
                    eprintln!("Removed prior artifact: {}", path.display());
                }
                Ok(())
            }
            // Absent prior artifact is the common case, not an error
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PackError::PriorArtifactRemoval {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Manifest sidecar path for a destination artifact path
pub fn manifest_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".manifest.json");
    destination.with_file_name(name)
}
