//! In-memory job repository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::job::{DeploymentJob, JobId, JobKey, JobStatus};
use crate::repository::{JobRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<JobId, DeploymentJob>,
    /// Most recent job per key; vacant when that job is terminal
    latest: HashMap<JobKey, JobId>,
}

/// Repository backed by process memory.
///
/// A single lock over both tables makes every operation linearizable, which
/// is what the vacancy check and the status compare-and-set rely on.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of job records ever created
    pub async fn len(&self) -> usize {
        self.tables.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn transition(
        &self,
        id: &JobId,
        next: JobStatus,
        message: Option<&str>,
        pid: Option<u32>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        if !job.status.can_transition_to(next) {
            debug!(
                job_id = %id,
                current = %job.status,
                rejected = %next,
                "Status write rejected"
            );
            return Ok(false);
        }

        job.status = next;
        if let Some(message) = message {
            job.message = Some(message.to_string());
        }
        job.pid = pid;
        job.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn try_create_if_vacant(
        &self,
        key: &JobKey,
    ) -> Result<(bool, DeploymentJob), RepositoryError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .latest
            .get(key)
            .and_then(|id| tables.jobs.get(id))
            .filter(|job| !job.status.is_terminal())
        {
            return Ok((false, existing.clone()));
        }

        let job = DeploymentJob::new(key.clone());
        tables.latest.insert(key.clone(), job.id.clone());
        tables.jobs.insert(job.id.clone(), job.clone());
        Ok((true, job))
    }

    async fn get(&self, id: &JobId) -> Result<Option<DeploymentJob>, RepositoryError> {
        Ok(self.tables.read().await.jobs.get(id).cloned())
    }

    async fn check_job_status(
        &self,
        id: &JobId,
        status: JobStatus,
    ) -> Result<bool, RepositoryError> {
        let tables = self.tables.read().await;
        let job = tables
            .jobs
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        Ok(job.status == status)
    }

    async fn set_in_progress(
        &self,
        id: &JobId,
        message: &str,
        pid: Option<u32>,
    ) -> Result<bool, RepositoryError> {
        self.transition(id, JobStatus::InProgress, Some(message), pid)
            .await
    }

    async fn set_success(&self, id: &JobId) -> Result<bool, RepositoryError> {
        self.transition(id, JobStatus::Success, Some("Deployment completed"), None)
            .await
    }

    async fn set_fail(&self, id: &JobId, message: &str) -> Result<bool, RepositoryError> {
        self.transition(id, JobStatus::Fail, Some(message), None)
            .await
    }

    async fn cancel_job(&self, id: &JobId) -> Result<bool, RepositoryError> {
        self.transition(id, JobStatus::Cancelled, Some("Cancelled"), None)
            .await
    }
}
