//! Destination for script output lines

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::models::job::JobId;

/// Which pipe of the child process a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Severity of a recorded output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobLogLevel {
    Info,
    Error,
}

impl From<OutputStream> for JobLogLevel {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => JobLogLevel::Info,
            OutputStream::Stderr => JobLogLevel::Error,
        }
    }
}

/// One line of script output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLog {
    pub level: JobLogLevel,
    pub script: String,
    pub stream: OutputStream,
    pub message: String,
}

#[async_trait]
pub trait JobLogSink: Send + Sync {
    async fn record(&self, job_id: &JobId, log: JobLog);
}

/// Forwards output lines to the `tracing` subscriber
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

#[async_trait]
impl JobLogSink for TracingLogSink {
    async fn record(&self, job_id: &JobId, log: JobLog) {
        match log.level {
            JobLogLevel::Info => {
                info!(job_id = %job_id, script = %log.script, stream = %log.stream, "{}", log.message)
            }
            JobLogLevel::Error => {
                error!(job_id = %job_id, script = %log.script, stream = %log.stream, "{}", log.message)
            }
        }
    }
}
