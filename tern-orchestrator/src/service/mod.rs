//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and the job runner.

pub mod job;
pub mod log;
pub mod project;

// Re-export for convenience
pub use job as job_service;
pub use log as log_service;
pub use project as project_service;
