#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use deployd::deploy::classifier::FailureClassifier;
use deployd::deploy::log_sink::{JobLog, JobLogSink};
use deployd::deploy::orchestrator::JobOrchestrator;
use deployd::deploy::script_runner::ScriptRunner;
use deployd::deploy::service::DeploymentService;
use deployd::models::job::{DeploymentJob, JobId, JobKey, JobStatus};
use deployd::repository::{InMemoryJobRepository, JobRepository, RepositoryError};

/// Log sink that keeps every line for later assertions
#[derive(Debug, Default)]
pub struct RecordingLogSink {
    logs: Mutex<Vec<(JobId, JobLog)>>,
}

impl RecordingLogSink {
    pub async fn logs(&self) -> Vec<JobLog> {
        self.logs.lock().await.iter().map(|(_, l)| l.clone()).collect()
    }
}

#[async_trait]
impl JobLogSink for RecordingLogSink {
    async fn record(&self, job_id: &JobId, log: JobLog) {
        self.logs.lock().await.push((job_id.clone(), log));
    }
}

/// In-memory repository whose FAIL read and FAIL write can be made to error
#[derive(Debug, Default)]
pub struct FaultyRepository {
    pub inner: InMemoryJobRepository,
    pub fail_status_reads: AtomicBool,
    pub fail_fail_writes: AtomicBool,
}

impl FaultyRepository {
    fn backend_error() -> RepositoryError {
        RepositoryError::Backend("connection reset".to_string())
    }
}

#[async_trait]
impl JobRepository for FaultyRepository {
    async fn try_create_if_vacant(
        &self,
        key: &JobKey,
    ) -> Result<(bool, DeploymentJob), RepositoryError> {
        self.inner.try_create_if_vacant(key).await
    }

    async fn get(&self, id: &JobId) -> Result<Option<DeploymentJob>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn check_job_status(
        &self,
        id: &JobId,
        status: JobStatus,
    ) -> Result<bool, RepositoryError> {
        if status == JobStatus::Fail && self.fail_status_reads.load(Ordering::SeqCst) {
            return Err(Self::backend_error());
        }
        self.inner.check_job_status(id, status).await
    }

    async fn set_in_progress(
        &self,
        id: &JobId,
        message: &str,
        pid: Option<u32>,
    ) -> Result<bool, RepositoryError> {
        self.inner.set_in_progress(id, message, pid).await
    }

    async fn set_success(&self, id: &JobId) -> Result<bool, RepositoryError> {
        self.inner.set_success(id).await
    }

    async fn set_fail(&self, id: &JobId, message: &str) -> Result<bool, RepositoryError> {
        if self.fail_fail_writes.load(Ordering::SeqCst) {
            return Err(Self::backend_error());
        }
        self.inner.set_fail(id, message).await
    }

    async fn cancel_job(&self, id: &JobId) -> Result<bool, RepositoryError> {
        self.inner.cancel_job(id).await
    }
}

pub struct Harness {
    pub repo: Arc<InMemoryJobRepository>,
    pub sink: Arc<RecordingLogSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            repo: Arc::new(InMemoryJobRepository::new()),
            sink: Arc::new(RecordingLogSink::default()),
        }
    }

    pub fn service(&self) -> DeploymentService {
        DeploymentService::new(
            self.repo.clone(),
            self.sink.clone(),
            FailureClassifier::default(),
        )
    }

    pub fn orchestrator(&self) -> JobOrchestrator {
        JobOrchestrator::new(
            self.repo.clone(),
            ScriptRunner::new(
                self.repo.clone(),
                self.sink.clone(),
                FailureClassifier::default(),
            ),
        )
    }

    pub async fn job(&self, id: &JobId) -> DeploymentJob {
        self.repo.get(id).await.unwrap().expect("job exists")
    }

    /// Poll until the job reaches `status` or the deadline passes
    pub async fn wait_for_status(&self, id: &JobId, status: JobStatus) -> DeploymentJob {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.job(id).await;
            if job.status == status {
                return job;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {} stuck in {} waiting for {}", id, job.status, status);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn wait_for_terminal(&self, id: &JobId) -> DeploymentJob {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.job(id).await;
            if job.status.is_terminal() {
                return job;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {} never finished, last status {}", id, job.status);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Write an executable `/bin/sh` script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
