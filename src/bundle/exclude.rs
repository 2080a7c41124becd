//! Exclusion rules for dependency bundling
//!
//! Filters VCS litter and interpreter bytecode caches out of the dependency
//! tree. Installed dependency code itself is never matched by the defaults.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Default patterns to exclude from bundles
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".git/**",
    "**/.DS_Store",
    "**/__pycache__",
    "**/__pycache__/**",
    "**/*.pyc",
];

/// Errors for exclusion rules
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Exclusion rules for filtering files
#[derive(Debug)]
pub struct ExcludeRules {
    glob_set: GlobSet,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        // Default patterns are compile-time constants and always valid
        Self::new().unwrap()
    }
}

impl ExcludeRules {
    /// Create new exclusion rules with defaults
    pub fn new() -> Result<Self, ExcludeError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in DEFAULT_EXCLUDES {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Add additional patterns on top of the defaults
    pub fn with_patterns(self, patterns: &[String]) -> Result<Self, ExcludeError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in DEFAULT_EXCLUDES {
            builder.add(Glob::new(pattern)?);
        }

        for pattern in patterns {
            if !pattern.is_empty() {
                builder.add(Glob::new(pattern)?);
            }
        }

        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Check if a tree-relative path should be excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.glob_set.is_match(path_str.as_ref())
    }
}
