//! Deployment service: start and cancel jobs

use std::sync::Arc;

use tracing::{error, info};

use crate::deploy::classifier::FailureClassifier;
use crate::deploy::log_sink::JobLogSink;
use crate::deploy::orchestrator::JobOrchestrator;
use crate::deploy::script_runner::ScriptRunner;
use crate::errors::DeployError;
use crate::models::job::{DeploymentJob, DeploymentScript, JobId, JobKey};
use crate::repository::JobRepository;

/// Entry point for deployment jobs.
///
/// A started job runs on its own detached tokio task; callers follow its
/// progress through the repository only.
#[derive(Clone)]
pub struct DeploymentService {
    repository: Arc<dyn JobRepository>,
    log_sink: Arc<dyn JobLogSink>,
    classifier: FailureClassifier,
}

impl DeploymentService {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        log_sink: Arc<dyn JobLogSink>,
        classifier: FailureClassifier,
    ) -> Self {
        Self {
            repository,
            log_sink,
            classifier,
        }
    }

    /// Start a job for `(project, service)` unless one is already live.
    ///
    /// Returns `(false, existing)` without side effects when the key is
    /// occupied. Otherwise the new PENDING job is returned with `true` while
    /// its scripts run in the background.
    pub async fn try_start_job(
        &self,
        project: &str,
        service: &str,
        scripts: Vec<DeploymentScript>,
    ) -> Result<(bool, DeploymentJob), DeployError> {
        let key = JobKey::new(project, service);
        let (created, job) = self.repository.try_create_if_vacant(&key).await?;

        if !created {
            info!(job_id = %job.id, key = %key, status = %job.status, "Job already active, not starting");
            return Ok((false, job));
        }

        info!(job_id = %job.id, key = %key, scripts = scripts.len(), "Job created");

        let orchestrator = JobOrchestrator::new(
            self.repository.clone(),
            ScriptRunner::new(
                self.repository.clone(),
                self.log_sink.clone(),
                self.classifier.clone(),
            ),
        );
        let job_id = job.id.clone();

        // Detached: the handle is dropped, nothing ever joins this task
        tokio::spawn(async move {
            orchestrator.run(&job_id, &scripts).await;
        });

        Ok((true, job))
    }

    /// Request cancellation. Takes effect at the job's next step boundary.
    ///
    /// `Ok(false)` means the job had already reached a terminal status.
    pub async fn cancel_job(&self, job_id: &JobId) -> Result<bool, DeployError> {
        match self.repository.cancel_job(job_id).await {
            Ok(cancelled) => {
                info!(job_id = %job_id, cancelled, "Cancellation requested");
                Ok(cancelled)
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to cancel job");
                Err(e.into())
            }
        }
    }

    pub async fn job(&self, job_id: &JobId) -> Result<Option<DeploymentJob>, DeployError> {
        Ok(self.repository.get(job_id).await?)
    }
}
