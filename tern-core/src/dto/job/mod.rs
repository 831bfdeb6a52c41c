//! Job DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create and dispatch a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub project_id: Uuid,
    pub branch: String,
}
