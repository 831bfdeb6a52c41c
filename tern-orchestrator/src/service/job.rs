//! Job Service
//!
//! Business logic for job creation and queries. Creating a job hands it to
//! the job runner; the request never waits for the run.

use sqlx::PgPool;
use std::sync::Arc;
use tern_core::domain::job::Job;
use tern_core::dto::job::CreateJob;
use tern_runner::JobRunner;
use uuid::Uuid;

use crate::repository::{job_repository, project_repository};

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    ProjectNotFound(Uuid),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::DatabaseError(err)
    }
}

/// Create a `Pending` job and dispatch its run
pub async fn create_job(
    pool: &PgPool,
    runner: &Arc<JobRunner>,
    req: CreateJob,
) -> Result<Job, JobError> {
    validate_branch(&req.branch)?;

    // Verify project exists
    let project = project_repository::find_by_id(pool, req.project_id)
        .await?
        .ok_or(JobError::ProjectNotFound(req.project_id))?;

    let job = job_repository::create(pool, req).await?;

    tracing::info!(
        "Job created: {} for project: {} (branch {})",
        job.id,
        project.name,
        job.branch
    );

    // The run reports through the store; its handle is not awaited
    let _ = runner.dispatch(job.clone(), project);

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Job, JobError> {
    job_repository::find_by_id(pool, id)
        .await?
        .ok_or(JobError::NotFound(id))
}

/// List jobs of a project, newest first
pub async fn list_jobs_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Job>, JobError> {
    // Verify project exists
    project_repository::find_by_id(pool, project_id)
        .await?
        .ok_or(JobError::ProjectNotFound(project_id))?;

    let jobs = job_repository::find_by_project(pool, project_id).await?;
    Ok(jobs)
}

// =============================================================================
// Validation
// =============================================================================

/// Branch names are handed to the fetch tool as a single argument
fn validate_branch(branch: &str) -> Result<(), JobError> {
    if branch.is_empty() {
        return Err(JobError::ValidationError(
            "Branch cannot be empty".to_string(),
        ));
    }

    if branch.chars().any(char::is_whitespace) {
        return Err(JobError::ValidationError(format!(
            "Branch '{}' cannot contain whitespace",
            branch
        )));
    }

    if branch.starts_with('-') {
        return Err(JobError::ValidationError(format!(
            "Branch '{}' cannot start with '-'",
            branch
        )));
    }

    Ok(())
}
