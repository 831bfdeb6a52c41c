//! Job Repository
//!
//! Handles all database operations related to jobs. Statuses are stored as
//! their integer code (`JobStatus::code`).

use sqlx::PgPool;
use tern_core::domain::job::{Job, JobStatus};
use tern_core::dto::job::CreateJob;
use uuid::Uuid;

/// Create a new `Pending` job in the database
pub async fn create(pool: &PgPool, req: CreateJob) -> Result<Job, sqlx::Error> {
    let job = Job {
        id: Uuid::new_v4(),
        project_id: req.project_id,
        branch: req.branch,
        status: JobStatus::Pending,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO jobs (id, project_id, branch, status, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(job.id)
    .bind(job.project_id)
    .bind(&job.branch)
    .bind(job.status.code())
    .bind(job.created_at)
    .execute(pool)
    .await?;

    Ok(job)
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, project_id, branch, status, created_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(JobRow::into_job).transpose()
}

/// Find jobs of a project, newest first
pub async fn find_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, project_id, branch, status, created_at
        FROM jobs
        WHERE project_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(JobRow::into_job).collect()
}

/// Move a job to `status` if it is currently in one of the allowed
/// predecessor states
///
/// # Returns
/// `true` if a row was updated
pub async fn transition_status(
    pool: &PgPool,
    job_id: Uuid,
    status: JobStatus,
) -> Result<bool, sqlx::Error> {
    let allowed: Vec<i16> = JobStatus::predecessors(status)
        .iter()
        .map(|s| s.code())
        .collect();

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = $1
        WHERE id = $2 AND status = ANY($3)
        "#,
    )
    .bind(status.code())
    .bind(job_id)
    .bind(allowed)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    project_id: Uuid,
    branch: String,
    status: i16,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<Job, sqlx::Error> {
        let status = JobStatus::from_code(self.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown job status code {}", self.status).into())
        })?;

        Ok(Job {
            id: self.id,
            project_id: self.project_id,
            branch: self.branch,
            status,
            created_at: self.created_at,
        })
    }
}
