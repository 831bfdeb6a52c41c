//! Jobs repository
//!
//! Status writes for the job a run owns.

use anyhow::Result;
use async_trait::async_trait;
use tern_core::domain::job::JobStatus;
use uuid::Uuid;

/// Repository trait for job status updates
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Moves a job to `status`
    ///
    /// The write only applies when the job currently is in one of
    /// [`JobStatus::predecessors`] of `status`.
    ///
    /// # Returns
    /// `true` if the transition was applied, `false` if it was refused
    async fn update_status(&self, job_id: Uuid, status: JobStatus) -> Result<bool>;
}
