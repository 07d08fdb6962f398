/*!
Execution dispatcher.

  execute(command, args, project) -> Ok(message) | Err(DispatchError)

Routing:
  - `add`      : in-process [`Operation`] with `projectPath` merged into the bag
  - otherwise  : `<cli> <command> <flags…>` through a [`CommandRunner`]

Every failure, whatever its origin, comes back as
`Failed to execute <command>: <message>`. No retries, no timeout.
*/

pub mod args;
pub mod error;
pub mod runner;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use args::format_options_for_cli;
pub use error::{DispatchError, ExecError};
pub use runner::{CommandRunner, SubprocessRunner};

/// The one command executed in-process.
pub const IN_PROCESS_COMMAND: &str = "add";

/// Key under which the project location is merged into in-process arguments.
pub const PROJECT_PATH_KEY: &str = "projectPath";

/// Result reported by an in-process operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Operation: Send + Sync {
    /// `options` always contains [`PROJECT_PATH_KEY`].
    async fn perform(&self, options: Map<String, Value>) -> Result<OperationOutcome, ExecError>;
}

/// `add` driven through the CLI's non-interactive flags.
///
/// A non-zero exit is an unsuccessful outcome, not an error; missing
/// project / binary and spawn failures stay errors.
pub struct CliAddOperation {
    runner: Arc<dyn CommandRunner>,
}

impl CliAddOperation {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Operation for CliAddOperation {
    async fn perform(&self, mut options: Map<String, Value>) -> Result<OperationOutcome, ExecError> {
        let project = match options.remove(PROJECT_PATH_KEY) {
            Some(Value::String(p)) => p,
            _ => String::from("."),
        };

        let mut cli_args = vec![IN_PROCESS_COMMAND.to_string()];
        cli_args.extend(format_options_for_cli(&options));

        match self.runner.run(&cli_args, Path::new(&project)).await {
            Ok(stdout) => {
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    Ok(OperationOutcome::ok("Add operation completed successfully"))
                } else {
                    Ok(OperationOutcome::ok(trimmed))
                }
            }
            Err(ExecError::ProcessFailure { output, .. }) => Ok(OperationOutcome::failed(output.trim())),
            Err(e) => Err(e),
        }
    }
}

pub struct ExecutionDispatcher {
    runner: Arc<dyn CommandRunner>,
    in_process: Arc<dyn Operation>,
}

impl ExecutionDispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, in_process: Arc<dyn Operation>) -> Self {
        Self { runner, in_process }
    }

    /// Subprocess runner for `binary_name` plus the CLI-backed `add` operation.
    pub fn for_binary(binary_name: impl Into<String>) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SubprocessRunner::new(binary_name));
        let in_process = Arc::new(CliAddOperation::new(runner.clone()));
        Self::new(runner, in_process)
    }

    pub async fn execute(
        &self,
        command: &str,
        args: Map<String, Value>,
        project: &Path,
    ) -> Result<String, DispatchError> {
        tracing::info!(command, in_process = command == IN_PROCESS_COMMAND, "executing command");
        let result = if command == IN_PROCESS_COMMAND {
            self.execute_in_process(args, project).await
        } else {
            self.execute_subprocess(command, &args, project).await
        };
        result.map_err(|e| {
            tracing::warn!(command, error = %e, "command failed");
            DispatchError::wrap(command, e)
        })
    }

    async fn execute_in_process(&self, mut args: Map<String, Value>, project: &Path) -> Result<String, ExecError> {
        args.insert(
            PROJECT_PATH_KEY.to_string(),
            Value::String(project.to_string_lossy().into_owned()),
        );
        let outcome = self.in_process.perform(args).await?;
        if outcome.success {
            Ok(outcome.message)
        } else {
            Err(ExecError::OperationFailure(outcome.message))
        }
    }

    async fn execute_subprocess(
        &self,
        command: &str,
        args: &Map<String, Value>,
        project: &Path,
    ) -> Result<String, ExecError> {
        let mut cli_args = vec![command.to_string()];
        cli_args.extend(format_options_for_cli(args));
        let stdout = self.runner.run(&cli_args, project).await?;
        Ok(format!("{command} operation completed successfully.\n\nOutput:\n{stdout}"))
    }
}

/* ---- Tests ---- */
