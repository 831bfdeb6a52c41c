//! Run context for a single job
//!
//! Carries the job identity and the store handles a run writes through. Log
//! lines are persisted immediately, one store write per line, so readers see
//! a live job's progress while its steps are still running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tern_core::domain::job::JobStatus;
use tern_core::domain::log::LogLevel;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repository::{JobRepository, LogRepository};

/// Context shared by the job runner and the step executor during one run
pub struct RunContext {
    job_id: Uuid,
    jobs: Arc<dyn JobRepository>,
    logs: Arc<dyn LogRepository>,
    finished: AtomicBool,
}

impl RunContext {
    pub fn new(job_id: Uuid, jobs: Arc<dyn JobRepository>, logs: Arc<dyn LogRepository>) -> Self {
        Self {
            job_id,
            jobs,
            logs,
            finished: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Appends a line to the job log
    ///
    /// Store failures are reported through tracing and do not abort the run.
    pub async fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = message.as_ref();

        match level {
            LogLevel::Info => info!(job_id = %self.job_id, "{}", message),
            LogLevel::Warning => warn!(job_id = %self.job_id, "{}", message),
            LogLevel::Error => error!(job_id = %self.job_id, "{}", message),
        }

        if let Err(e) = self.logs.append(self.job_id, level, message).await {
            error!("Failed to persist log line for job {}: {:#}", self.job_id, e);
        }
    }

    pub async fn log_info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message).await;
    }

    pub async fn log_warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message).await;
    }

    pub async fn log_error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message).await;
    }

    /// Forwards one line of container output to the job log
    pub async fn log_output(&self, line: &str) {
        tracing::debug!(job_id = %self.job_id, "| {}", line);

        if let Err(e) = self.logs.append(self.job_id, LogLevel::Info, line).await {
            error!("Failed to persist output line for job {}: {:#}", self.job_id, e);
        }
    }

    /// Writes a status transition
    ///
    /// # Returns
    /// `true` if the store applied it, `false` if the job was not in a state
    /// the transition is allowed from
    pub async fn set_status(&self, status: JobStatus) -> anyhow::Result<bool> {
        let applied = self.jobs.update_status(self.job_id, status).await?;

        if applied {
            info!("Job {} is now {}", self.job_id, status);
            if status.is_terminal() {
                self.finished.store(true, Ordering::SeqCst);
            }
        } else {
            warn!("Store refused transition of job {} to {}", self.job_id, status);
        }

        Ok(applied)
    }

    /// Whether a terminal status has been written for this run
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}
