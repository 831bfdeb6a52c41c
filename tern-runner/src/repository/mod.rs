//! Repository layer
//!
//! Store interfaces the runner writes job progress through. The orchestrator
//! implements them on its database; the runner never reads them back.
//!
//! All repositories are trait-based to enable testing and mocking.

mod jobs;
mod logs;

pub use jobs::JobRepository;
pub use logs::LogRepository;
