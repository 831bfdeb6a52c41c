//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One execution of a project's pipeline for a specific branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub project_id: Uuid,
    pub branch: String,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Job execution status
///
/// Valid transitions: `Pending -> Running -> {Succeeded | Failed}`, plus
/// `Pending -> Failed` for a run that crashed before it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Integer code persisted by the store
    pub fn code(self) -> i16 {
        match self {
            JobStatus::Succeeded => 0,
            JobStatus::Failed => -1,
            JobStatus::Pending => 1,
            JobStatus::Running => 2,
        }
    }

    /// Inverse of [`JobStatus::code`]
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(JobStatus::Succeeded),
            -1 => Some(JobStatus::Failed),
            1 => Some(JobStatus::Pending),
            2 => Some(JobStatus::Running),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    /// States a job must be in for a transition to `next` to be accepted
    pub fn predecessors(next: JobStatus) -> &'static [JobStatus] {
        match next {
            JobStatus::Pending => &[],
            JobStatus::Running => &[JobStatus::Pending],
            JobStatus::Succeeded => &[JobStatus::Running],
            JobStatus::Failed => &[JobStatus::Pending, JobStatus::Running],
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Succeeded => write!(f, "Succeeded"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}
