//! Runs one deployment script as a child process

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::deploy::classifier::FailureClassifier;
use crate::deploy::log_sink::{JobLog, JobLogSink, OutputStream};
use crate::errors::DeployError;
use crate::models::job::{DeploymentScript, JobId, JobStatus};
use crate::repository::JobRepository;

/// Status message written when the classifier flags a line. The matched
/// text itself only goes to the logs.
pub const CHECK_LOGS_MESSAGE: &str = "Deployment failed, check logs";

const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Longer output lines are delivered in chunks of at most this size
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Executes scripts and decides pass/fail from exit code and output
pub struct ScriptRunner {
    repository: Arc<dyn JobRepository>,
    log_sink: Arc<dyn JobLogSink>,
    classifier: FailureClassifier,
}

impl ScriptRunner {
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

    /// Run `script` to completion for `job_id`.
    ///
    /// Fails when the process exits non-zero, or when the job already reads
    /// FAIL once the process has exited (the classifier writes FAIL as soon
    /// as a failure phrase shows up in the output).
    pub async fn run(&self, job_id: &JobId, script: &DeploymentScript) -> Result<(), DeployError> {
        let name = script.name();
        let path = std::path::absolute(script.path())?;

        let mut cmd = Command::new(&path);
        cmd.args(split_arguments(&script.arguments))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = path.parent() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| DeployError::SpawnError {
            script: name.clone(),
            source,
        })?;
        let pid = child.id();

        self.repository
            .set_in_progress(job_id, &format!("Running script {}", name), pid)
            .await?;
        info!(job_id = %job_id, script = %name, ?pid, args = %script.arguments, "Script started");

        let (tx, mut rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, OutputStream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, OutputStream::Stderr, tx.clone());
        }
        drop(tx);

        // Both readers feed one channel; classification happens here only.
        let mut flagged = false;
        let mut write_error = None;
        while let Some((stream, line)) = rx.recv().await {
            if line.trim().is_empty() {
                continue;
            }

            if !flagged {
                if let Some(phrase) = self.classifier.classify(&line) {
                    flagged = true;
                    warn!(job_id = %job_id, script = %name, phrase, "Failure phrase detected in output");
                    // Output keeps draining after a failed write
                    if let Err(e) = self.repository.set_fail(job_id, CHECK_LOGS_MESSAGE).await {
                        error!(job_id = %job_id, error = %e, "Failed to record classified failure");
                        write_error = Some(e);
                    }
                }
            }

            self.log_sink
                .record(
                    job_id,
                    JobLog {
                        level: stream.into(),
                        script: name.clone(),
                        stream,
                        message: line,
                    },
                )
                .await;
        }

        let status = child.wait().await?;
        let exit_code = status.code();
        info!(job_id = %job_id, script = %name, ?exit_code, "Script exited");

        if let Some(e) = write_error {
            return Err(e.into());
        }

        let failed = self
            .repository
            .check_job_status(job_id, JobStatus::Fail)
            .await?;
        if !status.success() || failed {
            return Err(DeployError::ScriptFailed {
                script: name,
                exit_code,
            });
        }

        Ok(())
    }
}

fn spawn_line_reader<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::Sender<(OutputStream, String)>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match read_line_capped(&mut reader, &mut buf, MAX_LINE_BYTES).await {
                Ok(0) => break,
                Ok(_) => {
                    // Lossy so a stray non-UTF-8 byte never stops the pipe draining
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send((stream, line)).await.is_err() {
                        debug!(%stream, "Output receiver dropped");
                        break;
                    }
                }
                Err(e) => {
                    warn!(%stream, error = %e, "Failed to read script output");
                    break;
                }
            }
        }
    })
}

/// Read up to and including the next newline, stopping early after `max`
/// bytes. Returns the number of bytes read, zero at end of input.
async fn read_line_capped<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.take(max as u64).read_until(b'\n', buf).await
}

/// Split an argument string into argv entries.
///
/// Whitespace separates arguments; double quotes group text (including
/// whitespace) into one argument and are removed.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in arguments.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }

    args
}
