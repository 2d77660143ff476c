//! HTTP API for dashboard integration
//!
//! REST endpoints over the orchestrator: job CRUD, lifecycle control,
//! and metrics/logs/checkpoints retrieval.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use job_core::{Checkpoint, Error, Job, JobDraft, LogEntry};

use crate::service::JobOrchestrator;

/// Shared state for HTTP handlers
pub type AppState = Arc<JobOrchestrator>;

/// Job creation response
#[derive(Serialize)]
pub struct CreateJobResponse {
    pub status: String,
    pub message: String,
    pub job: Job,
}

/// Job listing response
#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

/// Job deletion response
#[derive(Serialize)]
pub struct DeleteJobResponse {
    pub status: String,
    pub message: String,
}

/// Per-job logs response
#[derive(Serialize)]
pub struct LogsResponse {
    pub job_id: String,
    pub logs: Vec<LogEntry>,
    pub total: usize,
}

/// Per-job checkpoints response
#[derive(Serialize)]
pub struct CheckpointsResponse {
    pub job_id: String,
    pub checkpoints: Vec<Checkpoint>,
    pub total: usize,
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Maps domain errors onto HTTP status codes
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.0.is_conflict() {
            StatusCode::CONFLICT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Create the HTTP API router
pub fn create_router(service: Arc<JobOrchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/jobs", post(create_job).get(list_jobs))
        .route("/api/jobs/:job_id", get(get_job).delete(delete_job))
        .route("/api/jobs/:job_id/start", post(start_job))
        .route("/api/jobs/:job_id/pause", post(pause_job))
        .route("/api/jobs/:job_id/resume", post(resume_job))
        .route("/api/jobs/:job_id/stop", post(stop_job))
        .route("/api/jobs/:job_id/metrics", get(get_job_metrics))
        .route("/api/jobs/:job_id/logs", get(get_job_logs))
        .route("/api/jobs/:job_id/checkpoints", get(get_job_checkpoints))
        .route(
            "/api/jobs/:job_id/checkpoints/:checkpoint_id/download",
            get(download_checkpoint),
        )
        .layer(cors)
        .with_state(service)
}

/// Health check endpoint
async fn health_check(State(service): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "uptime": service.uptime_secs(),
    }))
}

/// Create a new training job
async fn create_job(
    State(service): State<AppState>,
    Json(draft): Json<JobDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let job = service.create_job(draft).await?;
    Ok(Json(CreateJobResponse {
        status: "success".to_string(),
        message: "Training job created successfully".to_string(),
        job,
    }))
}

/// List all training jobs
async fn list_jobs(State(service): State<AppState>) -> impl IntoResponse {
    let jobs = service.list_jobs().await;
    let total = jobs.len();
    Json(JobListResponse { jobs, total })
}

/// Get a single job record
async fn get_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = service.get_job(&job_id).await?;
    Ok(Json(job))
}

/// Start a training job
async fn start_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service.start_job(&job_id).await?;
    Ok(Json(response))
}

/// Pause a training job
async fn pause_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(service.pause_job(&job_id).await)
}

/// Resume a paused training job
async fn resume_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(service.resume_job(&job_id).await)
}

/// Stop a training job
async fn stop_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(service.stop_job(&job_id).await)
}

/// Delete a training job and its artifacts
async fn delete_job(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    service.delete_job(&job_id).await?;
    Ok(Json(DeleteJobResponse {
        status: "success".to_string(),
        message: "Job deleted successfully".to_string(),
    }))
}

/// Get training metrics for a job
async fn get_job_metrics(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    Json(service.get_metrics(&job_id).await)
}

/// Get training logs for a job
async fn get_job_logs(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = service.get_logs(&job_id).await?;
    let total = logs.len();
    Ok(Json(LogsResponse {
        job_id,
        logs,
        total,
    }))
}

/// Get checkpoint records for a job
async fn get_job_checkpoints(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let checkpoints = service.get_checkpoints(&job_id).await?;
    let total = checkpoints.len();
    Ok(Json(CheckpointsResponse {
        job_id,
        checkpoints,
        total,
    }))
}

/// Download a checkpoint artifact
async fn download_checkpoint(
    State(service): State<AppState>,
    Path((job_id, checkpoint_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let download = service.download_checkpoint(&job_id, &checkpoint_id).await?;

    let data = tokio::fs::read(&download.path).await.map_err(Error::from)?;

    let headers = [
        (header::CONTENT_TYPE, download.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        ),
    ];
    Ok((headers, data).into_response())
}
