//! Project DTOs

use serde::{Deserialize, Serialize};

/// Request to register a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    /// Source-repository locator handed to the source fetcher (e.g. a git URL)
    pub repo: String,
}
