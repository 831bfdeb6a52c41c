//! Logs repository
//!
//! Append-only log writes for a job. Every call persists exactly one line,
//! in call order.

use anyhow::Result;
use async_trait::async_trait;
use tern_core::domain::log::LogLevel;
use uuid::Uuid;

/// Repository trait for job log lines
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Appends one line to the job's log
    async fn append(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()>;
}
