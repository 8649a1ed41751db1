//! Error types for the deployment job runner

use std::path::PathBuf;

use thiserror::Error;

use crate::repository::RepositoryError;

/// Main error type for the deployment job runner
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),

    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Failed to launch script {script}: {source}")]
    SpawnError {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// A step failed, either by exit code or by classified output.
    /// `exit_code` is `None` when the process was terminated by a signal.
    #[error("Script {script} failed with exit code {}", .exit_code.map_or("none".to_string(), |c| c.to_string()))]
    ScriptFailed {
        script: String,
        exit_code: Option<i32>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
