//! Pack configuration (fnpack.toml)
//!
//! All paths the pipeline touches come from this structure; there is no
//! hidden current-working-directory dependence. Relative paths in a loaded
//! file are anchored to the directory containing the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Error types for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] io::Error),

    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Bundle settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSettings {
    /// Exclude patterns applied on top of the built-in defaults
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Maximum artifact size in bytes (0 = no limit)
    #[serde(default)]
    pub max_bytes: u64,
}

/// Publish collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Command argv template; `{artifact}` and `{function}` placeholders are
    /// substituted before spawning
    pub command: Vec<String>,

    /// Function/service identifier handed to the publish command
    pub function: String,
}

/// Pack configuration from fnpack.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Directory containing the pre-installed dependency tree
    pub dependency_root: PathBuf,

    /// Explicit, ordered list of the function's own code files
    pub sources: Vec<PathBuf>,

    /// Destination path for the built artifact
    pub destination: PathBuf,

    /// Root against which relative source paths are resolved
    /// (defaults to the config file's directory)
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Bundle settings
    #[serde(default)]
    pub bundle: BundleSettings,

    /// Publish settings (publish is disabled when absent)
    pub publish: Option<PublishSettings>,
}

impl PackConfig {
    /// Load and parse config from a TOML file
    ///
    /// Relative paths are anchored to the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_str(&contents)?;

        if let Some(base) = path.parent() {
            config.anchor(base);
        }

        Ok(config)
    }

    /// Parse config from a TOML string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: PackConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Rebase relative paths onto the given base directory
    ///
    /// Source paths are left alone; they resolve against `project_root`.
    pub fn anchor(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }

        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        rebase(&mut self.dependency_root);
        rebase(&mut self.destination);
        match &mut self.project_root {
            Some(root) => rebase(root),
            None => self.project_root = Some(base.to_path_buf()),
        }
    }

    /// Root against which relative source paths resolve
    pub fn resolved_project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dependency_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "'dependency_root' must not be empty".to_string(),
            ));
        }

        // An artifact without its entry-point code is not deployable
        if self.sources.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one file must be listed in 'sources'".to_string(),
            ));
        }

        if self.destination.file_name().is_none() {
            return Err(ConfigError::ValidationError(
                "'destination' must name a file".to_string(),
            ));
        }

        if let Some(ref publish) = self.publish {
            if publish.command.is_empty() {
                return Err(ConfigError::ValidationError(
                    "'publish.command' must not be empty".to_string(),
                ));
            }
            if !publish.command.iter().any(|arg| arg.contains("{artifact}")) {
                return Err(ConfigError::ValidationError(
                    "'publish.command' must contain an '{artifact}' placeholder".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        dependency_root = "deps"
        sources = ["handler.py"]
        destination = "function.tar"
    "#;

    #[test]
    fn test_minimal_config_parses() {
        let config = PackConfig::from_str(MINIMAL).unwrap();

        assert_eq!(config.dependency_root, PathBuf::from("deps"));
        assert_eq!(config.sources, vec![PathBuf::from("handler.py")]);
        assert_eq!(config.destination, PathBuf::from("function.tar"));
        assert!(config.publish.is_none());
        assert_eq!(config.bundle.max_bytes, 0);
    }

    #[test]
    fn test_empty_sources_rejected() {
        let toml = r#"
            dependency_root = "deps"
            sources = []
            destination = "function.tar"
        "#;

        let err = PackConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_publish_requires_artifact_placeholder() {
        let toml = r#"
            dependency_root = "deps"
            sources = ["handler.py"]
            destination = "function.tar"

            [publish]
            command = ["deploy-tool", "push"]
            function = "playlist-bot"
        "#;

        let err = PackConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_publish_config_parses() {
        let toml = r#"
            dependency_root = "deps"
            sources = ["handler.py"]
            destination = "function.tar"

            [publish]
            command = ["deploy-tool", "push", "--archive", "{artifact}", "--name", "{function}"]
            function = "playlist-bot"
        "#;

        let config = PackConfig::from_str(toml).unwrap();
        let publish = config.publish.unwrap();
        assert_eq!(publish.function, "playlist-bot");
        assert_eq!(publish.command.len(), 6);
    }

    #[test]
    fn test_anchor_rebases_relative_paths() {
        let mut config = PackConfig::from_str(MINIMAL).unwrap();
        config.anchor(Path::new("/project"));

        assert_eq!(config.dependency_root, PathBuf::from("/project/deps"));
        assert_eq!(config.destination, PathBuf::from("/project/function.tar"));
        assert_eq!(config.project_root, Some(PathBuf::from("/project")));
        // Source paths are resolved against project_root, not rebased here
        assert_eq!(config.sources, vec![PathBuf::from("handler.py")]);
    }

    #[test]
    fn test_anchor_keeps_absolute_paths() {
        let toml = r#"
            dependency_root = "/opt/deps"
            sources = ["handler.py"]
            destination = "/out/function.tar"
        "#;

        let mut config = PackConfig::from_str(toml).unwrap();
        config.anchor(Path::new("/project"));

        assert_eq!(config.dependency_root, PathBuf::from("/opt/deps"));
        assert_eq!(config.destination, PathBuf::from("/out/function.tar"));
    }

    #[test]
    fn test_bundle_settings() {
        let toml = r#"
            dependency_root = "deps"
            sources = ["handler.py"]
            destination = "function.tar"

            [bundle]
            exclude = ["tests/**"]
            max_bytes = 1048576
        "#;

        let config = PackConfig::from_str(toml).unwrap();
        assert_eq!(config.bundle.exclude, vec!["tests/**".to_string()]);
        assert_eq!(config.bundle.max_bytes, 1_048_576);
    }
}
