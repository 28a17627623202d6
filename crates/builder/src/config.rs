//! Build configuration

use std::path::PathBuf;

/// Filesystem layout and environment for one orchestration run
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Per-component work trees live under `<build_root>/<name>-<version>`
    pub build_root: PathBuf,
    /// Finished artifacts land under `<artifact_root>/<name>-<version>`
    pub artifact_root: PathBuf,
    /// Extra environment exported to every stage command
    pub env: Vec<(String, String)>,
}

impl BuildConfig {
    /// Create a config with the given roots
    pub fn new(build_root: impl Into<PathBuf>, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            build_root: build_root.into(),
            artifact_root: artifact_root.into(),
            env: Vec::new(),
        }
    }

    /// Add an environment variable for stage commands
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}
