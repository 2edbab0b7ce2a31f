//! Spawn configuration for process pipes

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for spawning the child process behind a pipe.
///
/// Everything here is optional; the default spawns in the parent's working
/// directory with the parent's environment and leaves the child running if
/// the pipe is dropped mid-stream.
#[derive(Clone, Debug, Default)]
pub struct SpawnConfig {
    current_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    clear_env: bool,
    kill_on_drop: bool,
}

impl SpawnConfig {
    /// Create a new, empty spawn configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for the child process.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Do not inherit the parent process's environment.
    ///
    /// When set, only variables added via [`SpawnConfig::with_env`] are
    /// visible to the child. This prevents unintended leakage of sensitive
    /// variables (API keys, credentials) from the parent.
    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }

    /// Kill the child process when the pipe is dropped.
    ///
    /// Off by default: dropping a pipe mid-stream leaves the child to run
    /// to completion, matching the pipe's hands-off lifecycle policy.
    pub fn kill_on_drop(mut self, kill: bool) -> Self {
        self.kill_on_drop = kill;
        self
    }

    /// The configured working directory, if any.
    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// The explicitly configured environment variables.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Whether the parent environment is cleared before spawning.
    pub fn clears_env(&self) -> bool {
        self.clear_env
    }

    /// Whether the child is killed when the pipe is dropped.
    pub fn kills_on_drop(&self) -> bool {
        self.kill_on_drop
    }
}
