//! Stage command execution
//!
//! Stage commands are shell one-liners declared by the descriptor. The
//! runner is a trait so tests can inject fakes and drive arbitrary stage
//! failures without spawning processes.

use deskbuild_errors::{BuildError, Error};
use futures::future::BoxFuture;
use std::path::PathBuf;

/// One command invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub command: String,
    pub workdir: PathBuf,
    /// Extra environment, on top of the process environment
    pub env: Vec<(String, String)>,
}

/// Result of a finished command
#[derive(Debug, Clone, Copy)]
pub struct CommandOutput {
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(self) -> bool {
        self.exit_code == 0
    }
}

/// Executes stage commands
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// Spawn failures are errors; a nonzero exit is a normal
    /// `CommandOutput` the caller maps to its stage's failure type.
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput, Error>>;
}

/// Production runner backed by `sh -c` via tokio
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<CommandOutput, Error>> {
        Box::pin(async move {
            let status = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&spec.command)
                .current_dir(&spec.workdir)
                .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .status()
                .await
                .map_err(|e| BuildError::SpawnFailed {
                    command: spec.command.clone(),
                    message: e.to_string(),
                })?;

            Ok(CommandOutput {
                exit_code: status.code().unwrap_or(-1),
            })
        })
    }
}
