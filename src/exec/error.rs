use std::path::PathBuf;

use thiserror::Error;

/// Failures below the dispatcher. Never handed to MCP callers directly;
/// [`DispatchError`] wraps them.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Project directory does not exist: {}", .0.display())]
    MissingProject(PathBuf),

    #[error("CLI not found at: {}. Make sure the CLI package is installed in the project.", .0.display())]
    MissingBinary(PathBuf),

    /// Non-zero exit. `output` is stderr, or stdout when stderr was empty.
    #[error("{output}")]
    ProcessFailure { code: Option<i32>, output: String },

    /// The in-process operation reported `success: false`.
    #[error("{0}")]
    OperationFailure(String),

    #[error("failed to start {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The one error shape tool callers see.
#[derive(Debug, Error)]
#[error("Failed to execute {command}: {message}")]
pub struct DispatchError {
    pub command: String,
    pub message: String,
}

impl DispatchError {
    pub fn wrap(command: &str, err: impl std::fmt::Display) -> Self {
        Self {
            command: command.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_format() {
        let err = DispatchError::wrap("migrate", ExecError::MissingProject("/nope".into()));
        assert_eq!(
            err.to_string(),
            "Failed to execute migrate: Project directory does not exist: /nope"
        );
    }

    #[test]
    fn process_failure_displays_output_only() {
        let err = ExecError::ProcessFailure {
            code: Some(1),
            output: "bad flag".into(),
        };
        assert_eq!(err.to_string(), "bad flag");
    }
}
