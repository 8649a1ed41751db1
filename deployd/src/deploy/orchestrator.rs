//! Sequential run loop for one deployment job

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::deploy::script_runner::ScriptRunner;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::job::{DeploymentScript, JobId, JobStatus};
use crate::repository::JobRepository;

/// How a job's run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

/// Drives the scripts of one job in order
pub struct JobOrchestrator {
    repository: Arc<dyn JobRepository>,
    runner: ScriptRunner,
}

impl JobOrchestrator {
    pub fn new(repository: Arc<dyn JobRepository>, runner: ScriptRunner) -> Self {
        Self { repository, runner }
    }

    /// Run every script of `job_id` in order.
    ///
    /// Never returns an error: failures are logged and recorded as FAIL on the
    /// job, which is the only channel back to whoever started it.
    pub async fn run(&self, job_id: &JobId, scripts: &[DeploymentScript]) -> RunOutcome {
        info!(job_id = %job_id, scripts = scripts.len(), "Starting deployment job");

        match self.run_scripts(job_id, scripts).await {
            Ok(RunOutcome::Cancelled) => {
                info!(job_id = %job_id, "Deployment job cancelled");
                RunOutcome::Cancelled
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Deployment job failed");
                self.record_failure(job_id, &e).await;
                RunOutcome::Failed
            }
        }
    }

    async fn run_scripts(
        &self,
        job_id: &JobId,
        scripts: &[DeploymentScript],
    ) -> Result<RunOutcome, DeployError> {
        if self.is_cancelled(job_id).await? {
            debug!(job_id = %job_id, "Cancelled before the first step");
            return Ok(RunOutcome::Cancelled);
        }

        // Up-front pass so a missing file fails the job before anything launches
        for script in scripts {
            ensure_exists(script).await?;
        }

        for (index, script) in scripts.iter().enumerate() {
            ensure_exists(script).await?;

            // Cooperative checkpoint: a running step is never interrupted,
            // only the next one is skipped.
            if self.is_cancelled(job_id).await? {
                debug!(job_id = %job_id, skipped = scripts.len() - index, "Cancellation observed");
                return Ok(RunOutcome::Cancelled);
            }

            debug!(job_id = %job_id, step = index + 1, script = %script.name(), "Running step");
            self.runner.run(job_id, script).await?;
        }

        if self.repository.set_success(job_id).await? {
            info!(job_id = %job_id, "Deployment job succeeded");
            Ok(RunOutcome::Succeeded)
        } else {
            // A cancel landed while the last step was running
            warn!(job_id = %job_id, "Success not recorded, job already terminal");
            Ok(RunOutcome::Cancelled)
        }
    }

    async fn is_cancelled(&self, job_id: &JobId) -> Result<bool, DeployError> {
        Ok(self
            .repository
            .check_job_status(job_id, JobStatus::Cancelled)
            .await?)
    }

    async fn record_failure(&self, job_id: &JobId, err: &DeployError) {
        let message = err.to_string();

        match self
            .repository
            .check_job_status(job_id, JobStatus::Fail)
            .await
        {
            Ok(true) => {
                debug!(job_id = %job_id, "Job already marked failed");
                return;
            }
            Ok(false) => {}
            // The repository still rejects a write over a terminal status
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to read job status"),
        }

        match self.repository.set_fail(job_id, &message).await {
            Ok(true) => {}
            Ok(false) => debug!(job_id = %job_id, "Failure not recorded, job already terminal"),
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to record job failure"),
        }
    }
}

async fn ensure_exists(script: &DeploymentScript) -> Result<(), DeployError> {
    if File::new(script.path()).exists().await {
        Ok(())
    } else {
        Err(DeployError::ScriptNotFound(script.path.clone()))
    }
}
