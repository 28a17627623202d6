//! Lifecycle execution error types
//!
//! These are local to one component: they fail that component and cascade
//! to its build dependents as `Skipped`, never aborting independent
//! branches of the graph.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("patch `{patch}` did not apply cleanly")]
    PatchConflict { patch: String },

    #[error("prepare failed: {message}")]
    PrepareFailed { message: String },

    #[error("build failed with exit code {exit_code}")]
    BuildFailed { exit_code: i32 },

    #[error("command `{command}` failed with exit code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("failed to spawn `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("declared output `{path}` missing after build")]
    MissingArtifact { path: String },

    #[error("component `{name}` declares no build command")]
    MissingBuildCommand { name: String },
}
