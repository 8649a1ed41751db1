//! Deployment job models

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the repository at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The target a job deploys to. At most one live job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub project: String,
    pub service: String,
}

impl JobKey {
    pub fn new(project: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.service)
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created, no step started yet
    Pending,

    /// A step is running; re-stamped once per step
    InProgress,

    /// Every script ran to success
    Success,

    /// A step failed or a script was missing
    Fail,

    /// Cancelled by an external request
    Cancelled,
}

impl JobStatus {
    /// SUCCESS, FAIL and CANCELLED admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Fail | JobStatus::Cancelled
        )
    }

    /// Whether a write of `next` is allowed over `self`.
    ///
    /// The first terminal status recorded wins. That is what lets a cancel
    /// that lands while a step is running take precedence over the runner's
    /// later SUCCESS or FAIL, and what makes a second FAIL write a no-op.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (_, JobStatus::Pending) => false,
            (current, _) if current.is_terminal() => false,
            (JobStatus::Pending, _) => true,
            (JobStatus::InProgress, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Success => "SUCCESS",
            JobStatus::Fail => "FAIL",
            JobStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One script of a deployment, with its command-line argument string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentScript {
    /// Filesystem location of the executable or script
    pub path: PathBuf,

    /// Argument string, split on whitespace with double quotes grouping
    #[serde(default)]
    pub arguments: String,
}

impl DeploymentScript {
    pub fn new(path: impl Into<PathBuf>, arguments: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            arguments: arguments.into(),
        }
    }

    /// File name used in status messages and log fields
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A deployment job record as held by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentJob {
    pub id: JobId,

    #[serde(flatten)]
    pub key: JobKey,

    pub status: JobStatus,

    /// Last human-readable status detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Process id of the step currently running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentJob {
    /// A new PENDING job for `key`
    pub fn new(key: JobKey) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            key,
            status: JobStatus::Pending,
            message: None,
            pid: None,
            created_at: now,
            updated_at: now,
        }
    }
}
