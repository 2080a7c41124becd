//! Publish collaborator interface
//!
//! The pipeline hands a finished artifact path to a publisher and treats the
//! rest as opaque. The shipped implementation spawns a configured external
//! command; tests substitute a fake.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Errors for publish operations
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish command is empty")]
    EmptyCommand,

    #[error("failed to spawn publish command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("publish command '{command}' exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },
}

/// A collaborator that pushes a finished artifact to a hosting platform
pub trait Publisher {
    /// Publish the artifact at `artifact` under the given function identifier
    fn publish(&self, artifact: &Path, function: &str) -> Result<(), PublishError>;
}

/// Publisher that runs a configured external command
///
/// Each argv element may contain `{artifact}` and `{function}` placeholders,
/// substituted before spawning. Stdout/stderr are inherited so the command's
/// own reporting reaches the caller unchanged.
pub struct CommandPublisher {
    command: Vec<String>,
}

impl CommandPublisher {
    /// Create a publisher for the given argv template
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn render(&self, artifact: &Path, function: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{artifact}", &artifact.to_string_lossy())
                    .replace("{function}", function)
            })
            .collect()
    }
}

impl Publisher for CommandPublisher {
    fn publish(&self, artifact: &Path, function: &str) -> Result<(), PublishError> {
        let argv = self.render(artifact, function);
        let (program, args) = argv.split_first().ok_or(PublishError::EmptyCommand)?;
        let display = argv.join(" ");

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| PublishError::Spawn {
                command: display.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PublishError::CommandFailed {
                command: display,
                status,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_render_substitutes_placeholders() {
        let publisher = CommandPublisher::new(vec![
            "deploy-tool".to_string(),
            "--archive".to_string(),
            "{artifact}".to_string(),
            "--name".to_string(),
            "{function}".to_string(),
        ]);

        let argv = publisher.render(Path::new("/out/function.tar"), "playlist-bot");

        assert_eq!(argv[2], "/out/function.tar");
        assert_eq!(argv[4], "playlist-bot");
    }

    #[test]
    fn test_empty_command_rejected() {
        let publisher = CommandPublisher::new(vec![]);

        let err = publisher
            .publish(Path::new("/out/function.tar"), "fn")
            .unwrap_err();

        assert!(matches!(err, PublishError::EmptyCommand));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_command() {
        let publisher = CommandPublisher::new(vec!["true".to_string(), "{artifact}".to_string()]);

        publisher
            .publish(&PathBuf::from("/out/function.tar"), "fn")
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reported() {
        let publisher = CommandPublisher::new(vec!["false".to_string(), "{artifact}".to_string()]);

        let err = publisher
            .publish(&PathBuf::from("/out/function.tar"), "fn")
            .unwrap_err();

        assert!(matches!(err, PublishError::CommandFailed { .. }));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let publisher = CommandPublisher::new(vec![
            "fnpack-no-such-program".to_string(),
            "{artifact}".to_string(),
        ]);

        let err = publisher
            .publish(&PathBuf::from("/out/function.tar"), "fn")
            .unwrap_err();

        assert!(matches!(err, PublishError::Spawn { .. }));
    }
}
