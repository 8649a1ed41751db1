//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::DeployError;
use crate::models::job::{DeploymentJob, DeploymentScript, JobId};
use crate::repository::RepositoryError;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deployd".to_string(),
        version: version_info().version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Error body for non-2xx responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeployError::RepositoryError(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Start job request
#[derive(Debug, Serialize, Deserialize)]
pub struct StartJobRequest {
    pub project: String,
    pub service: String,
    pub scripts: Vec<DeploymentScript>,
}

/// Start job response
#[derive(Debug, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub started: bool,
    pub job: DeploymentJob,
}

/// Start a job. 202 when a new job was started, 200 with the live job otherwise.
pub async fn start_job_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<StartJobRequest>,
) -> Result<impl IntoResponse, DeployError> {
    let (started, job) = state
        .service
        .try_start_job(&request.project, &request.service, request.scripts)
        .await?;

    let status = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(StartJobResponse { started, job })))
}

/// Job lookup handler
pub async fn job_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Response, DeployError> {
    let id = JobId::from(id);
    match state.service.job(&id).await? {
        Some(job) => Ok(Json(job).into_response()),
        None => Err(RepositoryError::NotFound(id).into()),
    }
}

/// Cancel job response
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub cancelled: bool,
}

/// Request cancellation; the job stops at its next step boundary
pub async fn cancel_job_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeployError> {
    let cancelled = state.service.cancel_job(&JobId::from(id)).await?;
    Ok((StatusCode::ACCEPTED, Json(CancelJobResponse { cancelled })))
}
