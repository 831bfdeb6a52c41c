//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity;
//! `store` adapts them to the runner's repository traits.

pub mod job;
pub mod log;
pub mod project;
pub mod store;

// Re-export for convenience
pub use job as job_repository;
pub use log as log_repository;
pub use project as project_repository;
pub use store::PgStore;
