//! Job execution
//!
//! Runs one job's pipeline end to end:
//! - Moving the job to `Running`
//! - Fetching the branch into a fresh, run-scoped working directory
//! - Loading the pipeline manifest from the fetched tree
//! - Executing steps in manifest order, stopping at the first failure
//! - Writing the terminal status as the run's last store write
//!
//! Every failure is logged to the job before the job is marked `Failed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tern_core::domain::job::{Job, JobStatus};
use tern_core::domain::project::Project;
use tern_core::manifest::{MANIFEST_FILE_NAME, load_pipeline_config};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::context::RunContext;
use crate::repository::{JobRepository, LogRepository};
use crate::service::StepExecutor;
use crate::source::SourceFetcher;

/// Pipeline execution engine
///
/// One instance serves every run of the process. It holds only shared,
/// immutable collaborators; each run gets its own context and working
/// directory.
pub struct JobRunner {
    config: RunnerConfig,
    fetcher: Arc<dyn SourceFetcher>,
    steps: Arc<dyn StepExecutor>,
    jobs: Arc<dyn JobRepository>,
    logs: Arc<dyn LogRepository>,
}

impl JobRunner {
    pub fn new(
        config: RunnerConfig,
        fetcher: Arc<dyn SourceFetcher>,
        steps: Arc<dyn StepExecutor>,
        jobs: Arc<dyn JobRepository>,
        logs: Arc<dyn LogRepository>,
    ) -> Self {
        Self {
            config,
            fetcher,
            steps,
            jobs,
            logs,
        }
    }

    /// Spawns the run of a `Pending` job and returns immediately
    ///
    /// The returned handle may be dropped; the run continues on its own. A
    /// panic inside the run is contained in its task and the job is marked
    /// `Failed` unless it already reached a terminal state.
    pub fn dispatch(self: &Arc<Self>, job: Job, project: Project) -> JoinHandle<()> {
        let runner = Arc::clone(self);

        tokio::spawn(async move {
            let job_id = job.id;
            let workspace = runner.workspace_path(&job, &project);
            let ctx = Arc::new(runner.context(job_id));

            let run = tokio::spawn({
                let runner = Arc::clone(&runner);
                let ctx = Arc::clone(&ctx);
                async move { runner.execute(&ctx, &job, &project).await }
            });

            match run.await {
                Ok(Some(status)) => debug!("Run of job {} ended with {}", job_id, status),
                Ok(None) => {}
                Err(e) => {
                    error!("Run of job {} aborted: {}", job_id, e);

                    if !ctx.is_finished() {
                        ctx.log_error("Job aborted: internal runner error").await;
                        if let Err(e) = ctx.set_status(JobStatus::Failed).await {
                            error!("Failed to mark aborted job {} as failed: {:#}", job_id, e);
                        }
                    }

                    runner.cleanup_workspace(&workspace).await;
                }
            }
        })
    }

    /// Runs a `Pending` job to completion on the current task
    ///
    /// # Returns
    /// The terminal status, or `None` if the job could not be moved to
    /// `Running` (it is not `Pending`, so another run owns it)
    pub async fn run(&self, job: &Job, project: &Project) -> Option<JobStatus> {
        let ctx = self.context(job.id);
        self.execute(&ctx, job, project).await
    }

    fn context(&self, job_id: Uuid) -> RunContext {
        RunContext::new(job_id, Arc::clone(&self.jobs), Arc::clone(&self.logs))
    }

    async fn execute(&self, ctx: &RunContext, job: &Job, project: &Project) -> Option<JobStatus> {
        match ctx.set_status(JobStatus::Running).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Job {} is not pending, skipping run", job.id);
                return None;
            }
            Err(e) => {
                // Without Running the terminal Succeeded write would be refused
                error!("Failed to mark job {} as running: {:#}", job.id, e);
                ctx.log_error(format!("Failed to start job: {:#}", e)).await;
                if let Err(e) = ctx.set_status(JobStatus::Failed).await {
                    error!("Failed to record Failed for job {}: {:#}", job.id, e);
                }
                return Some(JobStatus::Failed);
            }
        }

        info!(
            "Starting run of job {} (project {}, branch {})",
            job.id, project.name, job.branch
        );
        ctx.log_info(format!("Starting job for project: {}", project.name))
            .await;

        let workspace = self.workspace_path(job, project);

        let status = match self.run_pipeline(ctx, job, project, &workspace).await {
            Ok(()) => {
                ctx.log_info("Job completed successfully").await;
                JobStatus::Succeeded
            }
            Err(message) => {
                ctx.log_error(message).await;
                JobStatus::Failed
            }
        };

        // Terminal status is the last store write of the run
        if let Err(e) = ctx.set_status(status).await {
            error!("Failed to record {} for job {}: {:#}", status, job.id, e);
        }

        self.cleanup_workspace(&workspace).await;

        info!("Job {} finished with status {}", job.id, status);
        Some(status)
    }

    /// Fetch, load, and execute every step; `Err` carries the log line to write
    async fn run_pipeline(
        &self,
        ctx: &RunContext,
        job: &Job,
        project: &Project,
        workspace: &Path,
    ) -> Result<(), String> {
        self.fetch_source(ctx, job, project, workspace)
            .await
            .map_err(|e| format!("Failed to fetch source: {:#}", e))?;

        let config = load_pipeline_config(workspace)
            .map_err(|e| format!("Failed to load pipeline config: {}", e))?;

        ctx.log_info(format!(
            "Loaded {} step(s) from {}",
            config.len(),
            MANIFEST_FILE_NAME
        ))
        .await;

        for (idx, step) in config.steps.iter().enumerate() {
            let number = idx + 1;

            ctx.log_info(format!("Starting step {}: {}", number, step.name))
                .await;

            if let Err(e) = self.steps.execute(ctx, number, step, workspace).await {
                warn!(
                    "Step {} of job {} failed ({}): {}",
                    number,
                    job.id,
                    e.reason(),
                    e
                );
                return Err(format!("Step {} failed: {}", number, e));
            }

            ctx.log_info(format!("Step {} completed successfully", number))
                .await;
        }

        Ok(())
    }

    async fn fetch_source(
        &self,
        ctx: &RunContext,
        job: &Job,
        project: &Project,
        workspace: &Path,
    ) -> anyhow::Result<()> {
        prepare_workspace(&self.config.workspace_base, workspace).await?;

        let output = self
            .fetcher
            .fetch_branch(&project.repo, &job.branch, workspace)
            .await?;

        if !output.is_empty() {
            ctx.log_info(output).await;
        }

        Ok(())
    }

    /// `<workspace_base>/<project-slug>-job-<job id>`
    fn workspace_path(&self, job: &Job, project: &Project) -> PathBuf {
        self.config
            .workspace_base
            .join(format!("{}-job-{}", project.slug(), job.id))
    }

    async fn cleanup_workspace(&self, workspace: &Path) {
        if self.config.keep_workspaces {
            debug!("Keeping workspace {}", workspace.display());
            return;
        }

        match tokio::fs::remove_dir_all(workspace).await {
            Ok(()) => debug!("Removed workspace {}", workspace.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", workspace.display(), e),
        }
    }
}

/// Makes sure `workspace` does not exist and its parent does
async fn prepare_workspace(base: &Path, workspace: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    tokio::fs::create_dir_all(base)
        .await
        .with_context(|| format!("failed to create {}", base.display()))?;

    match tokio::fs::remove_dir_all(workspace).await {
        Ok(()) => debug!("Removed stale workspace {}", workspace.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("failed to clear {}", workspace.display()));
        }
    }

    Ok(())
}
