//! Service layer
//!
//! Services contain the business logic of a run: driving a single step's
//! container to completion and orchestrating a whole job's pipeline.
//!
//! All services are trait-based to enable testing and dependency injection.

mod execution;
mod step;

// Re-export traits
pub use step::StepExecutor;

// Re-export implementations
pub use execution::JobRunner;
pub use step::{ContainerStepExecutor, StepFailure};
