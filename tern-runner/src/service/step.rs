//! Step execution
//!
//! Drives one pipeline step through its container lifecycle:
//! ensure image, start, stream output into the job log, wait for exit,
//! remove. Cleanup is attempted whenever a container was started, whatever
//! the step's outcome.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tern_core::domain::pipeline::Step;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::context::RunContext;
use crate::podman::{ContainerGateway, ContainerHandle, ContainerSpec, GatewayError};

/// Why a step did not succeed
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error("{0}")]
    Image(#[source] GatewayError),

    #[error("{0}")]
    Start(#[source] GatewayError),

    #[error("{0}")]
    Stream(#[source] GatewayError),

    #[error("{0}")]
    Wait(#[source] GatewayError),

    #[error("step failed with status code: {code}")]
    NonZeroExit { code: i64 },
}

impl StepFailure {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            StepFailure::Image(_) => "image",
            StepFailure::Start(_) => "start",
            StepFailure::Stream(_) => "stream",
            StepFailure::Wait(_) => "wait",
            StepFailure::NonZeroExit { .. } => "nonzero",
        }
    }
}

/// Service trait for running a single step
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Runs `step` against the fetched tree at `source_dir`
    ///
    /// # Arguments
    /// * `ctx` - The run's context; output lines are logged through it
    /// * `number` - 1-based position of the step in the pipeline
    /// * `step` - The step to run
    /// * `source_dir` - Fetched source tree, mounted into the container
    async fn execute(
        &self,
        ctx: &RunContext,
        number: usize,
        step: &Step,
        source_dir: &Path,
    ) -> Result<(), StepFailure>;
}

/// Runs each step in its own container through a [`ContainerGateway`]
pub struct ContainerStepExecutor {
    gateway: Arc<dyn ContainerGateway>,
    workdir: String,
}

impl ContainerStepExecutor {
    /// # Arguments
    /// * `gateway` - Container runtime, shared with other runs
    /// * `workdir` - Mount point of the source tree inside step containers
    pub fn new(gateway: Arc<dyn ContainerGateway>, workdir: impl Into<String>) -> Self {
        Self {
            gateway,
            workdir: workdir.into(),
        }
    }

    /// Streams the container's output into the log, then waits for its exit code
    async fn drive(&self, ctx: &RunContext, handle: &ContainerHandle) -> Result<i64, StepFailure> {
        let mut output = self
            .gateway
            .stream_output(handle)
            .await
            .map_err(StepFailure::Stream)?;

        while let Some(line) = output.next_line().await.map_err(StepFailure::Stream)? {
            ctx.log_output(&line).await;
        }

        self.gateway
            .wait_for_exit(handle)
            .await
            .map_err(StepFailure::Wait)
    }
}

#[async_trait]
impl StepExecutor for ContainerStepExecutor {
    async fn execute(
        &self,
        ctx: &RunContext,
        number: usize,
        step: &Step,
        source_dir: &Path,
    ) -> Result<(), StepFailure> {
        self.gateway
            .ensure_image(&step.image)
            .await
            .map_err(StepFailure::Image)?;

        let spec = ContainerSpec {
            name: container_name(ctx.job_id(), number),
            image: step.image.clone(),
            command: step.runs.clone(),
            source_dir: source_dir.to_path_buf(),
            workdir: self.workdir.clone(),
        };

        let handle = self
            .gateway
            .run_container(&spec)
            .await
            .map_err(StepFailure::Start)?;

        let outcome = self.drive(ctx, &handle).await;

        if let Err(e) = self.gateway.remove_container(&handle).await {
            ctx.log_warning(format!(
                "Warning: Failed to remove container {}: {}",
                handle.name, e
            ))
            .await;
        }

        match outcome? {
            0 => {
                debug!("Step '{}' exited cleanly", step.name);
                Ok(())
            }
            code => Err(StepFailure::NonZeroExit { code }),
        }
    }
}

fn container_name(job_id: Uuid, number: usize) -> String {
    format!("tern-{}-step-{}", job_id, number)
}
