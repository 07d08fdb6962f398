/*!
Subprocess execution of the project-local CLI binary.

The binary lives at `<project>/node_modules/.bin/<name>`. Both the project
directory and the binary are checked before spawning. The child gets the
project as working directory, a closed stdin (our stdin is the MCP
transport), the inherited environment and fully buffered stdout / stderr.
*/

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::ExecError;
use crate::utils::strip_ansi;

/// Anything that can run `<cli> <args…>` inside a project.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String], project: &Path) -> Result<String, ExecError>;
}

#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    binary_name: String,
}

impl SubprocessRunner {
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
        }
    }

    pub fn binary_path(&self, project: &Path) -> PathBuf {
        project.join("node_modules").join(".bin").join(&self.binary_name)
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(&self, args: &[String], project: &Path) -> Result<String, ExecError> {
        if !exists(project).await {
            return Err(ExecError::MissingProject(project.to_path_buf()));
        }
        let binary = self.binary_path(project);
        if !exists(&binary).await {
            return Err(ExecError::MissingBinary(binary));
        }

        tracing::debug!(binary = %binary.display(), ?args, "spawning CLI");
        let output = Command::new(&binary)
            .args(args)
            .current_dir(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout)).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = strip_ansi(&String::from_utf8_lossy(&output.stderr)).into_owned();
        let code = output.status.code();
        tracing::debug!(?code, "CLI exited unsuccessfully");
        let output = if !stderr.trim().is_empty() {
            stderr
        } else if !stdout.trim().is_empty() {
            stdout
        } else {
            match code {
                Some(c) => format!("Command exited with code {c}"),
                None => "Command terminated by signal".to_string(),
            }
        };
        Err(ExecError::ProcessFailure { code, output })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::{PermissionsExt, symlink};

    /// Project whose CLI binary is `/bin/sh`; `args[0]` then names a script
    /// file inside the project, so tests never exec a freshly written file.
    fn project_with_script(script_name: &str, body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules").join(".bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        symlink("/bin/sh", bin_dir.join("vendure")).unwrap();
        std::fs::write(dir.path().join(script_name), body).unwrap();
        dir
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn missing_project_fails_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::MissingProject(p) if p == missing));
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap_err();
        match err {
            ExecError::MissingBinary(path) => assert!(path.ends_with("node_modules/.bin/vendure")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_returns_stdout_and_sees_arguments() {
        let dir = project_with_script("migrate", "printf 'ran %s %s in ' \"$1\" \"$2\"; cat marker.txt\n");
        std::fs::write(dir.path().join("marker.txt"), "project").unwrap();
        let out = SubprocessRunner::new("vendure")
            .run(&args(&["migrate", "--run", "x"]), dir.path())
            .await
            .unwrap();
        assert_eq!(out, "ran --run x in project");
    }

    #[tokio::test]
    async fn failure_prefers_stderr() {
        let dir = project_with_script("migrate", "echo out; echo broken >&2; exit 2\n");
        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap_err();
        match err {
            ExecError::ProcessFailure { code, output } => {
                assert_eq!(code, Some(2));
                assert_eq!(output.trim(), "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_falls_back_to_stdout_then_exit_code() {
        let dir = project_with_script("migrate", "echo only-stdout; exit 1\n");
        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string().trim(), "only-stdout");

        let dir = project_with_script("migrate", "exit 3\n");
        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Command exited with code 3");
    }

    #[tokio::test]
    async fn ansi_sequences_are_stripped() {
        let dir = project_with_script("migrate", "printf '\\033[32mdone\\033[0m'\n");
        let out = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap();
        assert_eq!(out, "done");
    }

    #[tokio::test]
    async fn non_executable_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules").join(".bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let bin = bin_dir.join("vendure");
        std::fs::write(&bin, "not a program").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = SubprocessRunner::new("vendure")
            .run(&args(&["migrate"]), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }), "got {err:?}");
    }
}
