//! Job API Handlers
//!
//! HTTP endpoints for job creation, status and logs.

use axum::{
    Json,
    extract::{Path, State},
};
use tern_core::domain::job::Job;
use tern_core::domain::log::LogEntry;
use tern_core::dto::job::CreateJob;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::{job_service, log_service};

/// POST /job/create
/// Create a job and start its run in the background
///
/// Responds as soon as the `Pending` job is stored.
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJob>,
) -> ApiResult<Json<Job>> {
    tracing::info!(
        "Creating job for project: {} (branch {})",
        req.project_id,
        req.branch
    );

    let job = job_service::create_job(&state.pool, &state.runner, req).await?;

    Ok(Json(job))
}

/// GET /job/{id}
/// Get job details by ID
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(&state.pool, id).await?;

    Ok(Json(job))
}

/// GET /job/project/{project_id}
/// List all jobs of a project, newest first
pub async fn list_jobs_for_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing jobs for project: {}", project_id);

    let jobs = job_service::list_jobs_for_project(&state.pool, project_id).await?;

    Ok(Json(jobs))
}

/// GET /job/{id}/logs
/// Get all logs for a job
pub async fn get_job_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    tracing::debug!("Getting logs for job: {}", id);

    let logs = log_service::list_logs_for_job(&state.pool, id).await?;

    Ok(Json(logs))
}
