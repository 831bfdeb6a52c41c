//! Tern Runner
//!
//! The pipeline execution engine. Given a `Pending` job and its project, the
//! runner fetches the source tree, loads the `tern.yml` manifest, and runs each
//! step in its own container, persisting every log line and the final status
//! through the repository traits.
//!
//! Architecture:
//! - Configuration: Workspace location and external tool selection
//! - Gateway: Container engine operations (`podman`)
//! - Source: Branch retrieval (`git`)
//! - Repositories: Store interfaces implemented by the orchestrator
//! - Services: Step execution and job orchestration

pub mod config;
pub mod context;
pub mod podman;
pub mod repository;
pub mod service;
pub mod source;

#[cfg(test)]
mod testing;

pub use config::RunnerConfig;
pub use podman::{ContainerGateway, PodmanGateway};
pub use repository::{JobRepository, LogRepository};
pub use service::{ContainerStepExecutor, JobRunner, StepExecutor, StepFailure};
pub use source::{GitFetcher, SourceFetcher};
