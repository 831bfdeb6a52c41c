//! Log Repository
//!
//! Handles all database operations related to job logs. The `BIGSERIAL` id
//! is the only ordering key; timestamps can tie.

use sqlx::PgPool;
use tern_core::domain::log::{LogEntry, LogLevel};
use uuid::Uuid;

/// Append one log line to a job
pub async fn append(
    pool: &PgPool,
    job_id: Uuid,
    level: LogLevel,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO job_logs (job_id, timestamp, level, message)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(job_id)
    .bind(chrono::Utc::now())
    .bind(level.to_string())
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get all log entries for a job in write order
pub async fn find_by_job(pool: &PgPool, job_id: Uuid) -> Result<Vec<LogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT id, job_id, timestamp, level, message
        FROM job_logs
        WHERE job_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

fn string_to_level(s: &str) -> LogLevel {
    match s {
        "Warning" => LogLevel::Warning,
        "Error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    job_id: Uuid,
    timestamp: chrono::DateTime<chrono::Utc>,
    level: String,
    message: String,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            id: row.id,
            job_id: row.job_id,
            timestamp: row.timestamp,
            level: string_to_level(&row.level),
            message: row.message,
        }
    }
}
