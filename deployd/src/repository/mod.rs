//! Job repository interface
//!
//! The repository exclusively owns job state. Every operation must be atomic
//! per job: status writes are compare-and-set against
//! [`JobStatus::can_transition_to`], so concurrent writers (a running job and
//! an external cancel request) are reconciled here rather than by callers.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::job::{DeploymentJob, JobId, JobKey, JobStatus};

pub use memory::InMemoryJobRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Atomically return the live job for `key`, or create a PENDING one.
    ///
    /// The flag is `true` only when a new job was created.
    async fn try_create_if_vacant(
        &self,
        key: &JobKey,
    ) -> Result<(bool, DeploymentJob), RepositoryError>;

    async fn get(&self, id: &JobId) -> Result<Option<DeploymentJob>, RepositoryError>;

    async fn check_job_status(&self, id: &JobId, status: JobStatus)
        -> Result<bool, RepositoryError>;

    /// The write operations below return whether the transition was applied.
    async fn set_in_progress(
        &self,
        id: &JobId,
        message: &str,
        pid: Option<u32>,
    ) -> Result<bool, RepositoryError>;

    async fn set_success(&self, id: &JobId) -> Result<bool, RepositoryError>;

    async fn set_fail(&self, id: &JobId, message: &str) -> Result<bool, RepositoryError>;

    async fn cancel_job(&self, id: &JobId) -> Result<bool, RepositoryError>;
}
