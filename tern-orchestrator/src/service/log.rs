//! Log Service
//!
//! Read access to job logs.

use sqlx::PgPool;
use tern_core::domain::log::LogEntry;
use uuid::Uuid;

use crate::repository::{job_repository, log_repository};

/// Service error type
#[derive(Debug)]
pub enum LogError {
    JobNotFound(Uuid),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for LogError {
    fn from(err: sqlx::Error) -> Self {
        LogError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Get all log entries of a job in the order the run wrote them
///
/// Works on running jobs too; the result is whatever has been persisted so far.
pub async fn list_logs_for_job(pool: &PgPool, job_id: Uuid) -> Result<Vec<LogEntry>> {
    job_repository::find_by_id(pool, job_id)
        .await?
        .ok_or(LogError::JobNotFound(job_id))?;

    let logs = log_repository::find_by_job(pool, job_id).await?;

    tracing::debug!("Fetched {} log entries for job: {}", logs.len(), job_id);

    Ok(logs)
}
